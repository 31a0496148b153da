//! 会话驱动器
//!
//! 在一个任务里同时驱动三件事：
//! - 固定间隔轮询远端状态
//! - 每秒一次的本地倒计时
//! - 用户指令（作答 / 标记 / 清除 / 导航 / 交卷）
//!
//! 作答离开 `IN_PROGRESS` 后循环结束，两个定时器随之释放，不会再有轮询请求。

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::ExamApi;
use crate::error::AppResult;
use crate::models::{AttemptStatus, Question};
use crate::session::controller::{PollOutcome, SessionController, SubmitOutcome, TickOutcome};
use crate::store::AttemptStore;

/// 用户指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Select { question_id: String, option: u8 },
    /// 按题目下标作答
    AnswerAt { index: usize, option: u8 },
    /// 对当前题目作答
    AnswerCurrent(u8),
    ToggleMark(String),
    MarkAt(usize),
    MarkCurrent,
    Clear(String),
    ClearAt(usize),
    ClearCurrent,
    GoTo(usize),
    Next,
    Prev,
    Submit,
    Quit,
}

/// 推送给界面的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Countdown { time_left: u64 },
    Polled { time_left: u64 },
    AnswerSaved { question_id: String, option: u8 },
    Marked { question_id: String, marked: bool },
    Cleared { question_id: String },
    Navigated {
        index: usize,
        question: Question,
        selected: Option<u8>,
        marked: bool,
    },
    /// 可恢复的错误，仅提示
    TransientError(String),
    Submitted,
    Stopped,
}

pub struct SessionRunner<A, S> {
    controller: SessionController<A, S>,
    poll_interval: Duration,
    tick_interval: Duration,
}

impl<A: ExamApi, S: AttemptStore> SessionRunner<A, S> {
    pub fn new(controller: SessionController<A, S>, poll_interval: Duration) -> Self {
        Self {
            controller,
            poll_interval,
            tick_interval: Duration::from_secs(1),
        }
    }

    /// 运行到交卷、收到 `Quit` 或指令通道关闭为止，返回控制器以便统计
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        events: mpsc::Sender<SessionEvent>,
    ) -> SessionController<A, S> {
        let start = Instant::now();
        let mut poll = interval_at(start + self.poll_interval, self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut countdown = interval_at(start + self.tick_interval, self.tick_interval);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "⏱️ 会话开始: 每 {} 秒同步一次远端状态",
            self.poll_interval.as_secs()
        );

        while self.controller.status() == AttemptStatus::InProgress {
            tokio::select! {
                _ = poll.tick() => {
                    match self.controller.poll().await {
                        Ok(PollOutcome::Updated { time_left }) => {
                            emit(&events, SessionEvent::Polled { time_left }).await;
                        }
                        Ok(PollOutcome::Submitted) => {
                            emit(&events, SessionEvent::Submitted).await;
                        }
                        Ok(PollOutcome::AutoSubmitted { unsynced }) => {
                            emit_auto_submitted(&events, unsynced).await;
                        }
                        Ok(PollOutcome::Stopped) => {}
                        Err(e) => {
                            emit(&events, SessionEvent::TransientError(format!("同步状态失败: {}", e))).await;
                        }
                    }
                }
                _ = countdown.tick() => {
                    match self.controller.tick().await {
                        Ok(TickOutcome::Counting { time_left }) => {
                            emit(&events, SessionEvent::Countdown { time_left }).await;
                        }
                        Ok(TickOutcome::AutoSubmitted { unsynced }) => {
                            emit_auto_submitted(&events, unsynced).await;
                        }
                        Ok(TickOutcome::Idle) | Ok(TickOutcome::Expired) => {}
                        Err(e) => {
                            emit(&events, SessionEvent::TransientError(format!("自动交卷失败: {}", e))).await;
                        }
                    }
                }
                command = commands.recv() => {
                    match command {
                        None | Some(SessionCommand::Quit) => {
                            info!("👋 退出会话，作答保留在缓存中，下次可继续");
                            break;
                        }
                        Some(command) => {
                            if let Err(e) = self.handle(command, &events).await {
                                emit(&events, SessionEvent::TransientError(e.to_string())).await;
                            }
                        }
                    }
                }
            }
        }

        emit(&events, SessionEvent::Stopped).await;
        self.controller
    }

    async fn handle(
        &mut self,
        command: SessionCommand,
        events: &mpsc::Sender<SessionEvent>,
    ) -> AppResult<()> {
        debug!("收到指令: {:?}", command);
        match command {
            SessionCommand::Select {
                question_id,
                option,
            } => {
                self.controller.select_answer(&question_id, option).await?;
                emit(events, SessionEvent::AnswerSaved { question_id, option }).await;
            }
            SessionCommand::AnswerAt { index, option } => {
                let question_id = self.controller.question_id_at(index)?;
                self.controller.select_answer(&question_id, option).await?;
                emit(events, SessionEvent::AnswerSaved { question_id, option }).await;
            }
            SessionCommand::AnswerCurrent(option) => {
                if let Some(question_id) = self.controller.current_question_id() {
                    self.controller.select_answer(&question_id, option).await?;
                    emit(events, SessionEvent::AnswerSaved { question_id, option }).await;
                }
            }
            SessionCommand::ToggleMark(question_id) => {
                let marked = self.controller.toggle_mark(&question_id)?;
                emit(events, SessionEvent::Marked { question_id, marked }).await;
            }
            SessionCommand::MarkAt(index) => {
                let question_id = self.controller.question_id_at(index)?;
                let marked = self.controller.toggle_mark(&question_id)?;
                emit(events, SessionEvent::Marked { question_id, marked }).await;
            }
            SessionCommand::MarkCurrent => {
                if let Some(question_id) = self.controller.current_question_id() {
                    let marked = self.controller.toggle_mark(&question_id)?;
                    emit(events, SessionEvent::Marked { question_id, marked }).await;
                }
            }
            SessionCommand::Clear(question_id) => {
                self.controller.clear_response(&question_id)?;
                emit(events, SessionEvent::Cleared { question_id }).await;
            }
            SessionCommand::ClearAt(index) => {
                let question_id = self.controller.question_id_at(index)?;
                self.controller.clear_response(&question_id)?;
                emit(events, SessionEvent::Cleared { question_id }).await;
            }
            SessionCommand::ClearCurrent => {
                if let Some(question_id) = self.controller.current_question_id() {
                    self.controller.clear_response(&question_id)?;
                    emit(events, SessionEvent::Cleared { question_id }).await;
                }
            }
            SessionCommand::GoTo(index) => {
                self.controller.go_to(index)?;
                self.emit_current(events).await;
            }
            SessionCommand::Next => {
                self.controller.next()?;
                self.emit_current(events).await;
            }
            SessionCommand::Prev => {
                self.controller.prev()?;
                self.emit_current(events).await;
            }
            SessionCommand::Submit => {
                if self.controller.submit().await? == SubmitOutcome::Submitted {
                    emit(events, SessionEvent::Submitted).await;
                }
            }
            SessionCommand::Quit => {}
        }
        Ok(())
    }

    async fn emit_current(&self, events: &mpsc::Sender<SessionEvent>) {
        if let Some(view) = self.controller.attempt() {
            if let Some(question) = view.current_question() {
                let event = SessionEvent::Navigated {
                    index: view.current,
                    question: question.clone(),
                    selected: view.answers.get(&question.id).copied(),
                    marked: view.marked.contains(&question.id),
                };
                emit(events, event).await;
            }
        }
    }
}

async fn emit_auto_submitted(events: &mpsc::Sender<SessionEvent>, unsynced: Vec<String>) {
    if !unsynced.is_empty() {
        let message = format!("时间已到，以下题目作答未能同步: {}", unsynced.join(", "));
        emit(events, SessionEvent::TransientError(message)).await;
    }
    emit(events, SessionEvent::Submitted).await;
}

async fn emit(events: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if events.send(event).await.is_err() {
        warn!("事件接收端已关闭");
    }
}
