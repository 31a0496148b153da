use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 考试会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 本地缓存错误
    #[error("缓存错误: {0}")]
    Store(#[from] StoreError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 远端返回非 2xx
    #[error("API返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 请求参数格式不合法
    #[error("请求参数不合法 ({field}): {reason}")]
    InvalidInput { field: String, reason: String },
}

/// 考试会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 考试 ID 不是合法的 UUID
    #[error("考试ID格式错误: {test_id}")]
    MalformedTestId { test_id: String },
    /// 作答 ID 格式错误
    #[error("作答ID格式错误: {attempt_id}")]
    MalformedAttemptId { attempt_id: String },
    /// 会话尚未初始化
    #[error("会话尚未初始化")]
    NotInitialized,
    /// 当前状态不允许该操作
    #[error("当前状态 {status} 不允许执行 {action}")]
    InvalidState { status: String, action: String },
    /// 题目不存在
    #[error("题目不存在: {question_id}")]
    UnknownQuestion { question_id: String },
    /// 选项超出范围
    #[error("选项 {option} 超出范围 [1, {max}]")]
    OptionOutOfRange { option: u8, max: usize },
    /// 题目索引超出范围
    #[error("题目索引 {index} 超出范围 [0, {max_index}]")]
    IndexOutOfRange { index: usize, max_index: usize },
}

/// 本地缓存错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读取缓存文件失败
    #[error("读取缓存文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入缓存文件失败
    #[error("写入缓存文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Store(StoreError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Store(StoreError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err.url().map(|u| u.path().to_string()).unwrap_or_default();
        AppError::Api(ApiError::RequestFailed {
            endpoint,
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建参数不合法错误
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Api(ApiError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// 创建状态不允许错误
    pub fn invalid_state(status: impl ToString, action: impl Into<String>) -> Self {
        AppError::Session(SessionError::InvalidState {
            status: status.to_string(),
            action: action.into(),
        })
    }

    /// 创建缓存写入错误
    pub fn store_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Store(StoreError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 是否为作答 ID 格式错误（需要直接终止）
    pub fn is_malformed_id(&self) -> bool {
        matches!(
            self,
            AppError::Session(SessionError::MalformedAttemptId { .. })
                | AppError::Session(SessionError::MalformedTestId { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
