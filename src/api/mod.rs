//! API 模块
//!
//! 定义与远端考试引擎交互的契约。每个操作对应一次 HTTP 调用，
//! 不重试、不缓存、不做业务校验。

pub mod validation;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::AppResult;
use crate::models::{AttemptState, Chapter, QuestionQuery, Subject, TestType};

/// 考试引擎网关
///
/// 实现方：
/// - `clients::ExamClient` - 通过 reqwest 访问线上引擎
/// - 测试中的内存实现
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// `GET /subjects[?standard=]`
    async fn list_subjects(&self, standard: Option<&str>) -> AppResult<Vec<Subject>>;

    /// `GET /chapters?subjectId=`
    async fn list_chapters(&self, subject_id: &str) -> AppResult<Vec<Chapter>>;

    /// `GET /questions?...`，原样返回题目记录
    async fn list_questions(&self, query: &QuestionQuery) -> AppResult<Vec<Value>>;

    /// `POST /tests/create`，返回 testId
    async fn create_full_test(&self, test_type: TestType) -> AppResult<String>;

    /// `POST /tests/create/subject`，返回 testId
    async fn create_subject_test(&self, subject_id: &str, count: u32, time: u32)
        -> AppResult<String>;

    /// `POST /tests/create/chapter`，返回 testId
    async fn create_chapter_test(&self, chapter_id: &str, count: u32, time: u32)
        -> AppResult<String>;

    /// `POST /tests/start`，返回 attemptId
    async fn start_attempt(&self, test_id: &str, user_id: &str) -> AppResult<String>;

    /// `GET /tests/state/{attemptId}`
    async fn attempt_state(&self, attempt_id: &str) -> AppResult<AttemptState>;

    /// `POST /tests/response`
    async fn submit_response(
        &self,
        attempt_id: &str,
        question_id: &str,
        option_order: u8,
    ) -> AppResult<Value>;

    /// `POST /tests/sync`
    async fn sync_answers(
        &self,
        attempt_id: &str,
        answers: &BTreeMap<String, u8>,
    ) -> AppResult<Value>;

    /// `POST /tests/submit-section`
    async fn submit_section(&self, attempt_id: &str) -> AppResult<Value>;
}
