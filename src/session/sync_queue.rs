//! 待同步作答队列
//!
//! 本地先写、远端后确认。失败的作答留在队列里，下一次轮询或交卷前
//! 通过 `/tests/sync` 整批补发；同一道题只保留最新一次选择，重复发送无副作用。

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAnswer {
    option: u8,
    /// 已尝试发送的次数（仅用于日志）
    attempts: u32,
}

/// 待同步作答队列（单个 attempt）
#[derive(Debug, Clone, Default)]
pub struct SyncQueue {
    entries: BTreeMap<String, PendingAnswer>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入队列，同一道题以最新选择为准
    pub fn enqueue(&mut self, question_id: &str, option: u8) {
        self.entries.insert(
            question_id.to_string(),
            PendingAnswer { option, attempts: 0 },
        );
    }

    /// 记录一次发送尝试，返回累计次数
    pub fn record_attempt(&mut self, question_id: &str) -> u32 {
        match self.entries.get_mut(question_id) {
            Some(entry) => {
                entry.attempts += 1;
                entry.attempts
            }
            None => 0,
        }
    }

    /// 远端确认了 `option`。若期间用户又改了选择，保留新的待发值
    pub fn acknowledge(&mut self, question_id: &str, option: u8) -> bool {
        match self.entries.get(question_id) {
            Some(entry) if entry.option == option => {
                self.entries.remove(question_id);
                true
            }
            _ => false,
        }
    }

    /// 用户清除作答后不再补发
    pub fn discard(&mut self, question_id: &str) {
        self.entries.remove(question_id);
    }

    /// 用远端 responses 对账，返回被确认的条数
    pub fn reconcile(&mut self, responses: &BTreeMap<String, u8>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|question_id, entry| responses.get(question_id) != Some(&entry.option));
        before - self.entries.len()
    }

    /// 所有待发作答的快照
    pub fn pending(&self) -> BTreeMap<String, u8> {
        self.entries
            .iter()
            .map(|(question_id, entry)| (question_id.clone(), entry.option))
            .collect()
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.entries.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
