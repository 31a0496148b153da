//! 单元测试用的内存考试引擎

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::api::ExamApi;
use crate::error::{AppError, AppResult, ApiError};
use crate::models::{
    AttemptState, AttemptStatus, Chapter, QuestionQuery, RemoteOption, RemoteQuestion, Subject,
    TestType,
};

pub const TEST_ID: &str = "11111111-1111-1111-1111-111111111111";
pub const USER_ID: &str = "user-1";

/// 记录下来的远端调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateFull(TestType),
    Start { test_id: String, user_id: String },
    State(String),
    Response {
        attempt_id: String,
        question_id: String,
        option: u8,
    },
    Sync {
        attempt_id: String,
        answers: BTreeMap<String, u8>,
    },
    SubmitSection(String),
}

#[derive(Debug, Default)]
struct Inner {
    next_attempt_id: String,
    states: HashMap<String, AttemptState>,
    calls: Vec<Call>,
    fail_start: bool,
    fail_response: bool,
    fail_submit: bool,
}

/// clone 后共享同一份记录，便于在控制器拿走所有权后继续断言
#[derive(Debug, Clone, Default)]
pub struct FakeExamApi {
    inner: Arc<Mutex<Inner>>,
}

/// 三道题，每题四个选项，options 故意乱序
pub fn sample_state(status: AttemptStatus, time_left: u64) -> AttemptState {
    let questions = (0..3)
        .map(|i| RemoteQuestion {
            id: format!("q{}", i),
            subject: (if i < 2 { "Physics" } else { "Chemistry" }).to_string(),
            text: format!("<p>Question {}</p>", i),
            options: [4, 2, 1, 3]
                .iter()
                .map(|order| RemoteOption {
                    text: format!("option {}", order),
                    order: *order,
                })
                .collect(),
        })
        .collect();
    AttemptState {
        status,
        time_left,
        questions,
        responses: BTreeMap::new(),
    }
}

impl FakeExamApi {
    /// `start` 返回 `attempt_id`，并且该 attempt 的状态为 `state`
    pub fn new(attempt_id: &str, state: AttemptState) -> Self {
        let api = Self::default();
        {
            let mut inner = api.lock();
            inner.next_attempt_id = attempt_id.to_string();
            inner.states.insert(attempt_id.to_string(), state);
        }
        api
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake api lock")
    }

    pub fn insert_state(&self, attempt_id: &str, state: AttemptState) {
        self.lock().states.insert(attempt_id.to_string(), state);
    }

    pub fn fail_start(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    pub fn fail_response(&self, fail: bool) {
        self.lock().fail_response = fail;
    }

    pub fn fail_submit(&self, fail: bool) {
        self.lock().fail_submit = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }
}

fn unavailable(endpoint: &str) -> AppError {
    AppError::Api(ApiError::BadResponse {
        endpoint: endpoint.to_string(),
        status: 503,
        body: "unavailable".to_string(),
    })
}

#[async_trait]
impl ExamApi for FakeExamApi {
    async fn list_subjects(&self, _standard: Option<&str>) -> AppResult<Vec<Subject>> {
        Ok(Vec::new())
    }

    async fn list_chapters(&self, _subject_id: &str) -> AppResult<Vec<Chapter>> {
        Ok(Vec::new())
    }

    async fn list_questions(&self, _query: &QuestionQuery) -> AppResult<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn create_full_test(&self, test_type: TestType) -> AppResult<String> {
        self.record(Call::CreateFull(test_type));
        Ok(TEST_ID.to_string())
    }

    async fn create_subject_test(&self, _: &str, _: u32, _: u32) -> AppResult<String> {
        Ok(TEST_ID.to_string())
    }

    async fn create_chapter_test(&self, _: &str, _: u32, _: u32) -> AppResult<String> {
        Ok(TEST_ID.to_string())
    }

    async fn start_attempt(&self, test_id: &str, user_id: &str) -> AppResult<String> {
        self.record(Call::Start {
            test_id: test_id.to_string(),
            user_id: user_id.to_string(),
        });
        let inner = self.lock();
        if inner.fail_start {
            return Err(unavailable("/tests/start"));
        }
        Ok(inner.next_attempt_id.clone())
    }

    async fn attempt_state(&self, attempt_id: &str) -> AppResult<AttemptState> {
        self.record(Call::State(attempt_id.to_string()));
        self.lock()
            .states
            .get(attempt_id)
            .cloned()
            .ok_or_else(|| unavailable("/tests/state"))
    }

    async fn submit_response(
        &self,
        attempt_id: &str,
        question_id: &str,
        option_order: u8,
    ) -> AppResult<Value> {
        self.record(Call::Response {
            attempt_id: attempt_id.to_string(),
            question_id: question_id.to_string(),
            option: option_order,
        });
        if self.lock().fail_response {
            return Err(unavailable("/tests/response"));
        }
        Ok(json!({ "ok": true }))
    }

    async fn sync_answers(
        &self,
        attempt_id: &str,
        answers: &BTreeMap<String, u8>,
    ) -> AppResult<Value> {
        self.record(Call::Sync {
            attempt_id: attempt_id.to_string(),
            answers: answers.clone(),
        });
        if self.lock().fail_response {
            return Err(unavailable("/tests/sync"));
        }
        Ok(json!({ "ok": true }))
    }

    async fn submit_section(&self, attempt_id: &str) -> AppResult<Value> {
        self.record(Call::SubmitSection(attempt_id.to_string()));
        if self.lock().fail_submit {
            return Err(unavailable("/tests/submit-section"));
        }
        Ok(json!({ "status": "SUBMITTED" }))
    }
}
