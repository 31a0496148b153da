/// 考试引擎 API 客户端
///
/// 封装所有与考试引擎 HTTP API 相关的调用逻辑
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::api::validation::{
    validate_attempt_id, validate_count_and_time, validate_non_empty, validate_option_order,
    validate_test_id,
};
use crate::api::ExamApi;
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{
    AttemptState, Chapter, CreateTestResponse, QuestionQuery, StartAttemptResponse, Subject,
    TestType,
};

/// 考试引擎客户端
#[derive(Debug, Clone)]
pub struct ExamClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ExamClient {
    /// 创建新的考试引擎客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::api_request_failed("client", e))?;

        Ok(Self::with_http(
            http,
            &config.api_base_url,
            config.api_token.clone(),
        ))
    }

    /// 使用现成的 reqwest 客户端
    pub fn with_http(http: Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        debug!("GET {} 参数: {:?}", endpoint, query);
        let request = self.authorize(self.http.get(self.url(endpoint)).query(query));
        self.send(endpoint, request).await
    }

    async fn post<T: DeserializeOwned>(&self, endpoint: &str, body: &Value) -> AppResult<T> {
        debug!("POST {} Payload: {}", endpoint, body);
        let request = self.authorize(self.http.post(self.url(endpoint)).json(body));
        self.send(endpoint, request).await
    }

    /// 发送请求，非 2xx 统一转换为 BadResponse，响应体原样解析
    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> AppResult<T> {
        let response = request.send().await.map_err(|e| {
            warn!("API 请求失败 ({}): {}", endpoint, e);
            AppError::api_request_failed(endpoint, e)
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;

        if !status.is_success() {
            warn!("API 返回错误 ({}): status={}", endpoint, status);
            return Err(AppError::Api(ApiError::BadResponse {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            }));
        }

        debug!("{} 响应: {}", endpoint, body);

        // 空响应体按 null 处理（部分 ack 接口不返回内容）
        let raw = if body.trim().is_empty() { "null" } else { body.as_str() };
        Ok(serde_json::from_str(raw)?)
    }
}

#[async_trait]
impl ExamApi for ExamClient {
    async fn list_subjects(&self, standard: Option<&str>) -> AppResult<Vec<Subject>> {
        match standard {
            Some(standard) => self.get("/subjects", &[("standard", standard)]).await,
            None => self.get("/subjects", &[]).await,
        }
    }

    async fn list_chapters(&self, subject_id: &str) -> AppResult<Vec<Chapter>> {
        validate_non_empty("subjectId", subject_id)?;
        self.get("/chapters", &[("subjectId", subject_id)]).await
    }

    async fn list_questions(&self, query: &QuestionQuery) -> AppResult<Vec<Value>> {
        let limit = query.limit.map(|l| l.to_string());
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(subject_id) = query.subject_id.as_deref() {
            params.push(("subjectId", subject_id));
        }
        if let Some(chapter_id) = query.chapter_id.as_deref() {
            params.push(("chapterId", chapter_id));
        }
        if let Some(standard) = query.standard.as_deref() {
            params.push(("standard", standard));
        }
        if let Some(limit) = limit.as_deref() {
            params.push(("limit", limit));
        }
        self.get("/questions", &params).await
    }

    async fn create_full_test(&self, test_type: TestType) -> AppResult<String> {
        let created: CreateTestResponse = self
            .post("/tests/create", &json!({ "type": test_type }))
            .await?;
        Ok(created.test_id)
    }

    async fn create_subject_test(
        &self,
        subject_id: &str,
        count: u32,
        time: u32,
    ) -> AppResult<String> {
        validate_non_empty("subjectId", subject_id)?;
        validate_count_and_time(count, time)?;
        let created: CreateTestResponse = self
            .post(
                "/tests/create/subject",
                &json!({ "subjectId": subject_id, "count": count, "time": time }),
            )
            .await?;
        Ok(created.test_id)
    }

    async fn create_chapter_test(
        &self,
        chapter_id: &str,
        count: u32,
        time: u32,
    ) -> AppResult<String> {
        validate_non_empty("chapterId", chapter_id)?;
        validate_count_and_time(count, time)?;
        let created: CreateTestResponse = self
            .post(
                "/tests/create/chapter",
                &json!({ "chapterId": chapter_id, "count": count, "time": time }),
            )
            .await?;
        Ok(created.test_id)
    }

    async fn start_attempt(&self, test_id: &str, user_id: &str) -> AppResult<String> {
        validate_test_id(test_id)?;
        validate_non_empty("userId", user_id)?;
        let started: StartAttemptResponse = self
            .post("/tests/start", &json!({ "testId": test_id, "userId": user_id }))
            .await?;
        Ok(started.attempt_id)
    }

    async fn attempt_state(&self, attempt_id: &str) -> AppResult<AttemptState> {
        validate_attempt_id(attempt_id)?;
        self.get(&format!("/tests/state/{}", attempt_id), &[]).await
    }

    async fn submit_response(
        &self,
        attempt_id: &str,
        question_id: &str,
        option_order: u8,
    ) -> AppResult<Value> {
        validate_attempt_id(attempt_id)?;
        validate_non_empty("questionId", question_id)?;
        validate_option_order(option_order)?;
        self.post(
            "/tests/response",
            &json!({
                "attemptId": attempt_id,
                "questionId": question_id,
                "optionOrder": option_order
            }),
        )
        .await
    }

    async fn sync_answers(
        &self,
        attempt_id: &str,
        answers: &BTreeMap<String, u8>,
    ) -> AppResult<Value> {
        validate_attempt_id(attempt_id)?;
        for option_order in answers.values() {
            validate_option_order(*option_order)?;
        }
        self.post(
            "/tests/sync",
            &json!({ "attemptId": attempt_id, "answers": answers }),
        )
        .await
    }

    async fn submit_section(&self, attempt_id: &str) -> AppResult<Value> {
        validate_attempt_id(attempt_id)?;
        self.post("/tests/submit-section", &json!({ "attemptId": attempt_id }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = ExamClient::with_http(Client::new(), "https://api.mhtcet.app/", None);
        assert_eq!(client.base_url(), "https://api.mhtcet.app");
        assert_eq!(
            client.url("/tests/state/A1"),
            "https://api.mhtcet.app/tests/state/A1"
        );
    }

    #[tokio::test]
    async fn malformed_attempt_id_never_hits_network() {
        // 端口 9 不会有服务，若真的发请求会得到 RequestFailed 而不是格式错误
        let client = ExamClient::with_http(Client::new(), "http://127.0.0.1:9", None);
        let err = client.attempt_state("bad/id").await.unwrap_err();
        assert!(err.is_malformed_id());
    }
}
