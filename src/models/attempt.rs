//! 作答状态与题目（客户端视图）

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 作答状态
///
/// `STARTING → IN_PROGRESS → SUBMITTED`，`ABANDONED` 只在恢复时由远端返回
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Starting,
    InProgress,
    Submitted,
    Abandoned,
    #[serde(other)]
    Unknown,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Starting => "STARTING",
            AttemptStatus::InProgress => "IN_PROGRESS",
            AttemptStatus::Submitted => "SUBMITTED",
            AttemptStatus::Abandoned => "ABANDONED",
            AttemptStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Submitted)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 远端选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOption {
    #[serde(alias = "content")]
    pub text: String,
    #[serde(default)]
    pub order: i32,
}

/// 远端题目记录（不含正确答案）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteQuestion {
    pub id: String,
    #[serde(default, alias = "subjectName")]
    pub subject: String,
    #[serde(default, alias = "content", alias = "prompt")]
    pub text: String,
    #[serde(default)]
    pub options: Vec<RemoteOption>,
}

/// `GET /tests/state/{attemptId}` 的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptState {
    pub status: AttemptStatus,
    /// 剩余秒数，以服务器为准
    #[serde(default)]
    pub time_left: u64,
    #[serde(default)]
    pub questions: Vec<RemoteQuestion>,
    /// questionId → 选项序号（从 1 开始）
    #[serde(default)]
    pub responses: BTreeMap<String, u8>,
}

/// 题目（客户端视图）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub subject: String,
    pub prompt: String,
    /// 按 order 排好序的选项，第 k 个选项的选择序号为 k（从 1 开始）
    pub options: Vec<String>,
}

impl Question {
    /// 可选的最大序号，线上协议最多 4 个选项
    pub fn max_option(&self) -> usize {
        self.options.len().min(4)
    }
}

impl From<RemoteQuestion> for Question {
    fn from(remote: RemoteQuestion) -> Self {
        let mut options = remote.options;
        // sort_by_key 是稳定排序，order 相同时保持原顺序
        options.sort_by_key(|o| o.order);
        Self {
            id: remote.id,
            subject: remote.subject,
            prompt: remote.text,
            options: options.into_iter().map(|o| o.text).collect(),
        }
    }
}
