//! 作答缓存
//!
//! 每个 (考试, 用户) 只缓存一个 attemptId，刷新/重启后据此恢复作答。
//! 未指定考试时新建的整卷，按 (类型, 用户) 记下 testId，交卷前一直复用。
//! 提交完成或远端判定作答已放弃时删除。

pub mod memory;
pub mod toml_file;

use std::fmt;

use crate::error::AppResult;
use crate::models::TestType;

pub use memory::MemoryAttemptStore;
pub use toml_file::TomlAttemptStore;

/// 缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttemptKey {
    /// 值为 attemptId
    Attempt { test_id: String, user_id: String },
    /// 值为自动新建的整卷 testId
    CurrentTest { test_type: TestType, user_id: String },
}

impl AttemptKey {
    pub fn new(test_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        AttemptKey::Attempt {
            test_id: test_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn current_test(test_type: TestType, user_id: impl Into<String>) -> Self {
        AttemptKey::CurrentTest {
            test_type,
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptKey::Attempt { test_id, user_id } => {
                write!(f, "attempt:{}:{}", test_id, user_id)
            }
            AttemptKey::CurrentTest { test_type, user_id } => {
                write!(f, "current_test:{}:{}", test_type.code(), user_id)
            }
        }
    }
}

/// 作答缓存
pub trait AttemptStore: Send + Sync {
    fn load(&self, key: &AttemptKey) -> AppResult<Option<String>>;

    /// 覆盖写入，同一个键只保留最新的值
    fn save(&self, key: &AttemptKey, value: &str) -> AppResult<()>;

    fn remove(&self, key: &AttemptKey) -> AppResult<()>;
}
