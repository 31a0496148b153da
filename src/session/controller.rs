//! 作答会话控制器 - 流程层
//!
//! 负责一次考试作答的完整生命周期：
//! 1. 初始化：读取缓存的 attemptId → 恢复，或调用 start 新建
//! 2. 作答：本地先写（乐观更新）→ 立即同步到远端
//! 3. 轮询：以服务器剩余时间为准，检测服务器端自动交卷
//! 4. 倒计时：每秒递减，归零自动交卷
//! 5. 交卷：先补发待同步作答，成功后删除本地缓存
//!
//! 状态机：`STARTING → IN_PROGRESS → SUBMITTED`

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::api::validation::{validate_attempt_id, validate_non_empty, validate_test_id};
use crate::api::ExamApi;
use crate::error::{AppError, AppResult, SessionError};
use crate::models::{AttemptState, AttemptStatus, Question, TestType};
use crate::session::sync_queue::SyncQueue;
use crate::store::{AttemptKey, AttemptStore};

/// 当前作答的本地视图
#[derive(Debug, Clone)]
pub struct AttemptView {
    pub attempt_id: String,
    pub status: AttemptStatus,
    /// 剩余秒数，轮询时以服务器为准
    pub time_left: u64,
    pub questions: Vec<Question>,
    /// questionId → 选项序号（从 1 开始）
    pub answers: BTreeMap<String, u8>,
    pub visited: BTreeSet<String>,
    pub marked: BTreeSet<String>,
    /// 本地清除过的题目，轮询时不再用远端记录回填
    pub cleared: BTreeSet<String>,
    /// 当前题目下标
    pub current: usize,
}

impl AttemptView {
    fn new(attempt_id: String, state: AttemptState) -> Self {
        let questions: Vec<Question> = state.questions.into_iter().map(Question::from).collect();
        let mut visited = BTreeSet::new();
        if let Some(first) = questions.first() {
            visited.insert(first.id.clone());
        }
        Self {
            attempt_id,
            status: AttemptStatus::InProgress,
            time_left: state.time_left,
            questions,
            answers: state.responses,
            visited,
            marked: BTreeSet::new(),
            cleared: BTreeSet::new(),
            current: 0,
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }
}

/// 初始化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// 新建了作答
    Started,
    /// 恢复了缓存中的作答
    Resumed,
    /// 缓存中的作答在远端已交卷
    AlreadySubmitted,
}

/// 轮询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Updated { time_left: u64 },
    /// 服务器端已交卷（例如超时自动交卷）
    Submitted,
    /// 上次自动交卷失败，本次轮询重试成功
    AutoSubmitted { unsynced: Vec<String> },
    /// 不在作答中，未发请求
    Stopped,
}

/// 倒计时结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Counting { time_left: u64 },
    /// `unsynced` 为交卷时仍未同步到远端的题目
    AutoSubmitted { unsynced: Vec<String> },
    /// 时间已到但自动交卷失败，等下次轮询重试
    Expired,
}

/// 交卷结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    AlreadySubmitted,
}

/// 作答统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub total: usize,
    pub answered: usize,
    pub marked: usize,
    pub visited: usize,
    pub not_visited: usize,
    pub pending_sync: usize,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "已答 {}/{} | 标记 {} | 已看 {} | 未看 {} | 待同步 {}",
            self.answered, self.total, self.marked, self.visited, self.not_visited, self.pending_sync
        )
    }
}

/// 作答会话控制器
///
/// - 持有考试引擎网关与本地缓存
/// - 远端调用失败只上报，不回滚本地状态
/// - 失败的作答进入 `SyncQueue`，之后整批补发
pub struct SessionController<A, S> {
    api: A,
    store: S,
    key: Option<AttemptKey>,
    attempt: Option<AttemptView>,
    sync_queue: SyncQueue,
    auto_submit_failed: bool,
}

impl<A: ExamApi, S: AttemptStore> SessionController<A, S> {
    pub fn new(api: A, store: S) -> Self {
        Self {
            api,
            store,
            key: None,
            attempt: None,
            sync_queue: SyncQueue::new(),
            auto_submit_failed: false,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key(&self) -> Option<&AttemptKey> {
        self.key.as_ref()
    }

    pub fn attempt(&self) -> Option<&AttemptView> {
        self.attempt.as_ref()
    }

    /// 初始化之前为 `STARTING`
    pub fn status(&self) -> AttemptStatus {
        self.attempt
            .as_ref()
            .map(|a| a.status.clone())
            .unwrap_or(AttemptStatus::Starting)
    }

    pub fn time_left(&self) -> Option<u64> {
        self.attempt.as_ref().map(|a| a.time_left)
    }

    pub fn pending_sync(&self) -> BTreeMap<String, u8> {
        self.sync_queue.pending()
    }

    pub fn current_question_id(&self) -> Option<String> {
        self.attempt
            .as_ref()
            .and_then(|a| a.current_question())
            .map(|q| q.id.clone())
    }

    // ========== 初始化 ==========

    /// 开始或恢复一次作答
    ///
    /// 任何失败都直接返回，不做重试
    pub async fn initialize(&mut self, test_id: &str, user_id: &str) -> AppResult<InitOutcome> {
        validate_test_id(test_id)?;
        validate_non_empty("userId", user_id)?;

        let key = AttemptKey::new(test_id, user_id);
        self.key = Some(key.clone());
        self.attempt = None;
        self.sync_queue = SyncQueue::new();
        self.auto_submit_failed = false;

        if let Some(cached_id) = self.store.load(&key)? {
            if let Err(e) = validate_attempt_id(&cached_id) {
                error!("❌ 缓存中的作答ID格式错误: {}", cached_id);
                self.store.remove(&key)?;
                return Err(e);
            }

            info!("🔁 发现未完成的作答 {}，正在恢复...", cached_id);
            let state = self.api.attempt_state(&cached_id).await?;

            if state.status == AttemptStatus::Abandoned {
                warn!("⚠️ 作答 {} 已被放弃，丢弃缓存并重新开始", cached_id);
                self.store.remove(&key)?;
            } else {
                return self.adopt(cached_id, state, InitOutcome::Resumed);
            }
        }

        info!("🚀 开始新的作答: 考试 {}", test_id);
        let attempt_id = self.api.start_attempt(test_id, user_id).await?;
        validate_attempt_id(&attempt_id)?;
        self.store.save(&key, &attempt_id)?;

        let state = self.api.attempt_state(&attempt_id).await?;
        self.adopt(attempt_id, state, InitOutcome::Started)
    }

    /// 未指定考试时使用整卷
    ///
    /// 新建的 testId 按 (类型, 用户) 缓存，交卷前重复运行会继续同一场考试
    pub async fn initialize_full_test(
        &mut self,
        test_type: TestType,
        user_id: &str,
    ) -> AppResult<InitOutcome> {
        validate_non_empty("userId", user_id)?;
        let current = AttemptKey::current_test(test_type, user_id);

        if let Some(test_id) = self.store.load(&current)? {
            if validate_test_id(&test_id).is_err() {
                warn!("⚠️ 缓存中的整卷ID格式错误，丢弃: {}", test_id);
                self.store.remove(&current)?;
            } else {
                info!("🔁 继续上次创建的 {} 整卷 {}", test_type, test_id);
                match self.initialize(&test_id, user_id).await? {
                    InitOutcome::AlreadySubmitted => {
                        info!("上次的整卷已交卷，重新创建");
                    }
                    outcome => return Ok(outcome),
                }
            }
        }

        info!("📝 正在创建 {} 整卷...", test_type);
        let test_id = self.api.create_full_test(test_type).await?;
        validate_test_id(&test_id)?;
        self.store.save(&current, &test_id)?;
        info!("✓ 已创建考试 {}", test_id);

        self.initialize(&test_id, user_id).await
    }

    fn adopt(
        &mut self,
        attempt_id: String,
        state: AttemptState,
        outcome: InitOutcome,
    ) -> AppResult<InitOutcome> {
        match state.status {
            AttemptStatus::Abandoned => {
                return Err(AppError::invalid_state(&state.status, "开始作答"));
            }
            AttemptStatus::Submitted => {
                info!("✓ 作答 {} 在远端已交卷", attempt_id);
                let mut view = AttemptView::new(attempt_id, state);
                view.status = AttemptStatus::Submitted;
                self.attempt = Some(view);
                self.clear_cache();
                return Ok(InitOutcome::AlreadySubmitted);
            }
            _ => {}
        }

        let view = AttemptView::new(attempt_id, state);
        info!(
            "✓ 作答 {} 已就绪: {} 道题, 剩余 {} 秒, 已有作答 {} 道",
            view.attempt_id,
            view.questions.len(),
            view.time_left,
            view.answers.len()
        );
        self.attempt = Some(view);
        Ok(outcome)
    }

    // ========== 轮询 ==========

    /// 拉取远端状态进行对账
    ///
    /// 只在 `IN_PROGRESS` 时发请求。不会覆盖本地已有的作答。
    pub async fn poll(&mut self) -> AppResult<PollOutcome> {
        let attempt_id = match self.attempt.as_ref() {
            Some(view) if view.status == AttemptStatus::InProgress => view.attempt_id.clone(),
            _ => return Ok(PollOutcome::Stopped),
        };

        if !self.sync_queue.is_empty() {
            if let Err(e) = self.flush_pending().await {
                warn!("⚠️ 补发作答失败，等待下次轮询: {}", e);
            }
        }

        let state = match self.api.attempt_state(&attempt_id).await {
            Ok(state) => state,
            Err(e) => {
                warn!("⚠️ 轮询作答状态失败: {}", e);
                return Err(e);
            }
        };

        let outcome = self.apply_remote_state(state);
        match outcome {
            PollOutcome::Updated { time_left } if self.auto_submit_failed => {
                if time_left > 0 {
                    // 服务器仍有剩余时间，继续倒计时
                    self.auto_submit_failed = false;
                    return Ok(outcome);
                }
                info!("⏰ 重试自动交卷");
                let unsynced = self.auto_submit().await?;
                Ok(PollOutcome::AutoSubmitted { unsynced })
            }
            _ => Ok(outcome),
        }
    }

    fn apply_remote_state(&mut self, state: AttemptState) -> PollOutcome {
        let confirmed = self.sync_queue.reconcile(&state.responses);
        if confirmed > 0 {
            debug!("远端已确认 {} 条待同步作答", confirmed);
        }

        let Some(view) = self.attempt.as_mut() else {
            return PollOutcome::Stopped;
        };

        view.time_left = state.time_left;

        if view.questions.is_empty() && !state.questions.is_empty() {
            view.questions = state.questions.into_iter().map(Question::from).collect();
        }

        for (question_id, option) in state.responses {
            if view.cleared.contains(&question_id) {
                continue;
            }
            view.answers.entry(question_id).or_insert(option);
        }

        if state.status == AttemptStatus::Submitted {
            info!("📋 服务器端已交卷");
            self.mark_submitted();
            return PollOutcome::Submitted;
        }

        PollOutcome::Updated {
            time_left: state.time_left,
        }
    }

    // ========== 作答 ==========

    /// 选择答案：本地先写，再同步到远端
    ///
    /// 同步失败时保留本地选择并返回错误，该作答留在待同步队列里
    pub async fn select_answer(&mut self, question_id: &str, option: u8) -> AppResult<()> {
        let view = self.in_progress_mut("选择答案")?;
        let question = view.question(question_id).ok_or_else(|| {
            AppError::Session(SessionError::UnknownQuestion {
                question_id: question_id.to_string(),
            })
        })?;
        let max = question.max_option();
        if option == 0 || usize::from(option) > max {
            return Err(AppError::Session(SessionError::OptionOutOfRange { option, max }));
        }

        view.answers.insert(question_id.to_string(), option);
        view.visited.insert(question_id.to_string());
        view.cleared.remove(question_id);
        let attempt_id = view.attempt_id.clone();

        self.sync_queue.enqueue(question_id, option);
        self.sync_queue.record_attempt(question_id);

        match self
            .api
            .submit_response(&attempt_id, question_id, option)
            .await
        {
            Ok(_) => {
                self.sync_queue.acknowledge(question_id, option);
                debug!("✓ 题目 {} 作答 {} 已保存", question_id, option);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "⚠️ 题目 {} 作答保存失败，将在下次轮询时补发: {}",
                    question_id, e
                );
                Err(e)
            }
        }
    }

    /// 整批补发待同步作答，返回补发条数
    pub async fn flush_pending(&mut self) -> AppResult<usize> {
        if self.sync_queue.is_empty() {
            return Ok(0);
        }
        let attempt_id = match self.attempt.as_ref() {
            Some(view) => view.attempt_id.clone(),
            None => return Err(AppError::Session(SessionError::NotInitialized)),
        };

        let pending = self.sync_queue.pending();
        for question_id in pending.keys() {
            let attempts = self.sync_queue.record_attempt(question_id);
            debug!("补发题目 {} (第 {} 次)", question_id, attempts);
        }

        self.api.sync_answers(&attempt_id, &pending).await?;

        for (question_id, option) in &pending {
            self.sync_queue.acknowledge(question_id, *option);
        }
        info!("✓ 已补发 {} 条作答", pending.len());
        Ok(pending.len())
    }

    /// 标记/取消标记待复查，仅本地
    pub fn toggle_mark(&mut self, question_id: &str) -> AppResult<bool> {
        let view = self.in_progress_mut("标记题目")?;
        ensure_known(view, question_id)?;
        if view.marked.remove(question_id) {
            Ok(false)
        } else {
            view.marked.insert(question_id.to_string());
            Ok(true)
        }
    }

    /// 清除作答，仅本地（远端仍保留最后一次提交的选择）
    pub fn clear_response(&mut self, question_id: &str) -> AppResult<Option<u8>> {
        let view = self.in_progress_mut("清除作答")?;
        ensure_known(view, question_id)?;
        let previous = view.answers.remove(question_id);
        view.cleared.insert(question_id.to_string());
        self.sync_queue.discard(question_id);
        Ok(previous)
    }

    // ========== 题目导航 ==========

    pub fn go_to(&mut self, index: usize) -> AppResult<&Question> {
        let view = self
            .attempt
            .as_mut()
            .ok_or(AppError::Session(SessionError::NotInitialized))?;
        if index >= view.questions.len() {
            return Err(AppError::Session(SessionError::IndexOutOfRange {
                index,
                max_index: view.questions.len().saturating_sub(1),
            }));
        }
        view.current = index;
        let question = &view.questions[index];
        view.visited.insert(question.id.clone());
        Ok(question)
    }

    pub fn next(&mut self) -> AppResult<&Question> {
        let current = self.attempt.as_ref().map(|a| a.current).unwrap_or(0);
        self.go_to(current + 1)
    }

    pub fn prev(&mut self) -> AppResult<&Question> {
        let current = self.attempt.as_ref().map(|a| a.current).unwrap_or(0);
        self.go_to(current.saturating_sub(1))
    }

    // ========== 交卷与倒计时 ==========

    /// 交卷
    ///
    /// 已交卷时直接返回，不会重复调用远端。
    /// 待同步作答补发失败时不交卷，状态保持 `IN_PROGRESS`，可以再次提交。
    pub async fn submit(&mut self) -> AppResult<SubmitOutcome> {
        let Some(attempt_id) = self.submittable_attempt_id()? else {
            return Ok(SubmitOutcome::AlreadySubmitted);
        };

        if let Err(e) = self.flush_pending().await {
            warn!(
                "⚠️ 还有 {} 道题的作答未同步，暂不交卷: {}",
                self.sync_queue.len(),
                e
            );
            return Err(e);
        }

        self.submit_section(&attempt_id).await?;
        Ok(SubmitOutcome::Submitted)
    }

    /// 每秒调用一次。倒计时归零时自动交卷
    ///
    /// 自动交卷失败后不再逐秒重试，由下一次轮询重试
    pub async fn tick(&mut self) -> AppResult<TickOutcome> {
        let time_left = match self.attempt.as_mut() {
            Some(view) if view.status == AttemptStatus::InProgress => {
                view.time_left = view.time_left.saturating_sub(1);
                view.time_left
            }
            _ => return Ok(TickOutcome::Idle),
        };

        if time_left > 0 {
            return Ok(TickOutcome::Counting { time_left });
        }
        if self.auto_submit_failed {
            return Ok(TickOutcome::Expired);
        }

        info!("⏰ 时间到，自动交卷");
        let unsynced = self.auto_submit().await?;
        Ok(TickOutcome::AutoSubmitted { unsynced })
    }

    /// 时间到时无论补发是否成功都交卷，返回未能同步的题目
    async fn auto_submit(&mut self) -> AppResult<Vec<String>> {
        let Some(attempt_id) = self.submittable_attempt_id()? else {
            return Ok(Vec::new());
        };

        let unsynced = match self.flush_pending().await {
            Ok(_) => Vec::new(),
            Err(e) => {
                let unsynced: Vec<String> = self.sync_queue.pending().into_keys().collect();
                error!(
                    "❌ 时间已到，以下题目作答未能同步: {} ({})",
                    unsynced.join(", "),
                    e
                );
                unsynced
            }
        };

        match self.submit_section(&attempt_id).await {
            Ok(()) => {
                self.auto_submit_failed = false;
                Ok(unsynced)
            }
            Err(e) => {
                self.auto_submit_failed = true;
                Err(e)
            }
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let Some(view) = self.attempt.as_ref() else {
            return SessionSummary::default();
        };
        let total = view.questions.len();
        let visited = view
            .questions
            .iter()
            .filter(|q| view.visited.contains(&q.id))
            .count();
        let answered = view
            .questions
            .iter()
            .filter(|q| view.answers.contains_key(&q.id))
            .count();
        SessionSummary {
            total,
            answered,
            marked: view.marked.len(),
            visited,
            not_visited: total - visited,
            pending_sync: self.sync_queue.len(),
        }
    }

    /// 按题目下标取 questionId
    pub fn question_id_at(&self, index: usize) -> AppResult<String> {
        let view = self
            .attempt
            .as_ref()
            .ok_or(AppError::Session(SessionError::NotInitialized))?;
        view.questions
            .get(index)
            .map(|q| q.id.clone())
            .ok_or_else(|| {
                AppError::Session(SessionError::IndexOutOfRange {
                    index,
                    max_index: view.questions.len().saturating_sub(1),
                })
            })
    }

    // ========== 内部方法 ==========

    /// 已交卷返回 `None`
    fn submittable_attempt_id(&self) -> AppResult<Option<String>> {
        match self.attempt.as_ref() {
            Some(view) if view.status.is_terminal() => Ok(None),
            Some(view) if view.status == AttemptStatus::InProgress => {
                Ok(Some(view.attempt_id.clone()))
            }
            Some(view) => Err(AppError::invalid_state(&view.status, "交卷")),
            None => Err(AppError::Session(SessionError::NotInitialized)),
        }
    }

    async fn submit_section(&mut self, attempt_id: &str) -> AppResult<()> {
        info!("📋 提交作答 {}...", attempt_id);
        match self.api.submit_section(attempt_id).await {
            Ok(_) => {
                info!("✓ 交卷成功");
                self.mark_submitted();
                Ok(())
            }
            Err(e) => {
                error!("❌ 交卷失败，可以再次提交: {}", e);
                Err(e)
            }
        }
    }

    fn in_progress_mut(&mut self, action: &str) -> AppResult<&mut AttemptView> {
        match self.attempt.as_mut() {
            Some(view) if view.status == AttemptStatus::InProgress => Ok(view),
            Some(view) => Err(AppError::invalid_state(&view.status, action)),
            None => Err(AppError::Session(SessionError::NotInitialized)),
        }
    }

    fn mark_submitted(&mut self) {
        if let Some(view) = self.attempt.as_mut() {
            view.status = AttemptStatus::Submitted;
        }
        self.clear_cache();
    }

    fn clear_cache(&mut self) {
        let Some(key) = self.key.as_ref() else {
            return;
        };
        if let Err(e) = self.store.remove(key) {
            warn!("⚠️ 删除作答缓存失败 ({}): {}", key, e);
        }

        // 交卷的是自动新建的整卷时，一并忘掉它
        let AttemptKey::Attempt { test_id, user_id } = key else {
            return;
        };
        for test_type in [TestType::Pcm, TestType::Pcb] {
            let current = AttemptKey::current_test(test_type, user_id.as_str());
            match self.store.load(&current) {
                Ok(Some(cached)) if cached == *test_id => {
                    if let Err(e) = self.store.remove(&current) {
                        warn!("⚠️ 删除整卷缓存失败 ({}): {}", current, e);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("⚠️ 读取整卷缓存失败 ({}): {}", current, e),
            }
        }
    }
}

fn ensure_known(view: &AttemptView, question_id: &str) -> AppResult<()> {
    if view.question(question_id).is_some() {
        Ok(())
    } else {
        Err(AppError::Session(SessionError::UnknownQuestion {
            question_id: question_id.to_string(),
        }))
    }
}
