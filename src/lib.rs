//! # MHT-CET Session
//!
//! 考试作答客户端：对接远端考试引擎（`https://api.mhtcet.app`），
//! 负责开始/恢复作答、作答同步、状态轮询、倒计时与交卷。
//! 组卷、判分与计时权威都在远端引擎，这里只保留客户端状态机。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `clients/` - `ExamClient`，基于 reqwest 的 HTTP 客户端
//! - `store/` - 作答缓存（内存 / TOML 文件），每个 (考试, 用户) 一个 attemptId
//!
//! ### ② 能力层（API）
//! - `api/` - `ExamApi` 网关契约与请求参数格式校验
//!
//! ### ③ 流程层（Session）
//! - `session::controller` - 作答状态机 `STARTING → IN_PROGRESS → SUBMITTED`
//! - `session::sync_queue` - 待同步作答，失败后整批补发
//! - `session::runner` - 轮询 / 倒计时 / 用户指令的事件循环
//!
//! ### ④ 编排层（App）
//! - `app` - 命令行作答界面
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// 重新导出常用类型
pub use api::ExamApi;
pub use app::App;
pub use clients::ExamClient;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AttemptState, AttemptStatus, Question, Role, TestType};
pub use session::{SessionCommand, SessionController, SessionEvent, SessionRunner};
pub use store::{AttemptKey, AttemptStore, MemoryAttemptStore, TomlAttemptStore};
