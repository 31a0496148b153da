use std::time::Duration;

use crate::error::ConfigError;
use crate::models::TestType;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- 考试引擎 API 配置 ---
    /// 考试引擎地址
    pub api_base_url: String,
    /// 登录令牌（可选，附加为 Bearer）
    pub api_token: Option<String>,
    /// 单次请求超时
    pub request_timeout: Duration,
    // --- 会话配置 ---
    /// 轮询远端状态的间隔
    pub poll_interval: Duration,
    /// 本地作答缓存文件
    pub attempt_store_path: String,
    /// 要参加的考试 ID，为空时新建整卷考试
    pub test_id: Option<String>,
    /// 新建整卷考试时的类型
    pub test_type: TestType,
    /// `TEST_TYPE` 无法解析时记下原值，由 `validate` 报错
    pub rejected_test_type: Option<String>,
    /// 当前登录用户
    pub user_id: String,
    /// 启动时打印科目与章节目录
    pub show_catalog: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.mhtcet.app".to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(30),
            attempt_store_path: "attempts.toml".to_string(),
            test_id: None,
            test_type: TestType::Pcm,
            rejected_test_type: None,
            user_id: String::new(),
            show_catalog: false,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        let raw_test_type = std::env::var("TEST_TYPE").ok().filter(|v| !v.is_empty());
        let parsed_test_type = raw_test_type.as_deref().map(str::parse::<TestType>);
        Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(default.api_base_url),
            api_token: std::env::var("API_TOKEN").ok().filter(|v| !v.is_empty()).or(default.api_token),
            request_timeout: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).map(Duration::from_secs).unwrap_or(default.request_timeout),
            poll_interval: std::env::var("POLL_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).filter(|secs| *secs > 0).map(Duration::from_secs).unwrap_or(default.poll_interval),
            attempt_store_path: std::env::var("ATTEMPT_STORE_PATH").unwrap_or(default.attempt_store_path),
            test_id: std::env::var("TEST_ID").ok().filter(|v| !v.is_empty()).or(default.test_id),
            test_type: parsed_test_type.as_ref().and_then(|r| r.as_ref().ok().copied()).unwrap_or(default.test_type),
            rejected_test_type: match parsed_test_type {
                Some(Err(_)) => raw_test_type,
                _ => default.rejected_test_type,
            },
            user_id: std::env::var("USER_ID").unwrap_or(default.user_id),
            show_catalog: std::env::var("SHOW_CATALOG").ok().and_then(|v| v.parse().ok()).unwrap_or(default.show_catalog),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 检查启动考试所必需的配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "USER_ID".to_string(),
            });
        }
        if let Some(raw) = &self.rejected_test_type {
            return Err(ConfigError::EnvVarParseFailed {
                var_name: "TEST_TYPE".to_string(),
                value: raw.clone(),
                expected_type: "PCM | PCB".to_string(),
            });
        }
        Ok(())
    }
}
