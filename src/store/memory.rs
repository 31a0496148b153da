use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{AppError, AppResult};
use crate::store::{AttemptKey, AttemptStore};

/// 内存缓存，clone 后共享同一份数据
#[derive(Debug, Clone, Default)]
pub struct MemoryAttemptStore {
    entries: Arc<Mutex<HashMap<AttemptKey, String>>>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> AppError {
    AppError::Other("内存缓存锁已损坏".to_string())
}

impl AttemptStore for MemoryAttemptStore {
    fn load(&self, key: &AttemptKey) -> AppResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &AttemptKey, value: &str) -> AppResult<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(key.clone(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &AttemptKey) -> AppResult<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }
}
