//! 作答会话 - 流程层
//!
//! - `controller` - 单次作答的状态机（初始化 / 作答 / 轮询 / 倒计时 / 交卷）
//! - `sync_queue` - 待同步作答，失败后整批补发
//! - `runner` - 定时器与用户指令的事件循环

pub mod controller;
pub mod runner;
pub mod sync_queue;

pub use controller::{
    AttemptView, InitOutcome, PollOutcome, SessionController, SessionSummary, SubmitOutcome,
    TickOutcome,
};
pub use runner::{SessionCommand, SessionEvent, SessionRunner};
pub use sync_queue::SyncQueue;
