use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::error::{AppError, AppResult, StoreError};
use crate::store::{AttemptKey, AttemptStore};

/// 单条缓存记录
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedEntry {
    value: String,
    cached_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    entries: BTreeMap<String, CachedEntry>,
}

/// 基于 TOML 文件的作答缓存
///
/// 文件不存在视为空缓存；每次写入整体重写文件
#[derive(Debug)]
pub struct TomlAttemptStore {
    path: PathBuf,
    // 串行化同一进程内的读改写
    guard: Mutex<()>,
}

impl TomlAttemptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> AppResult<StoreFile> {
        if !self.path.exists() {
            return Ok(StoreFile::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            AppError::Store(StoreError::ReadFailed {
                path: self.path_str(),
                source: Box::new(e),
            })
        })?;
        toml::from_str(&content).map_err(|e| {
            AppError::Store(StoreError::TomlParseFailed {
                path: self.path_str(),
                source: Box::new(e),
            })
        })
    }

    fn write(&self, file: &StoreFile) -> AppResult<()> {
        let content =
            toml::to_string(file).map_err(|e| AppError::store_write_failed(self.path_str(), e))?;
        fs::write(&self.path, content)
            .map_err(|e| AppError::store_write_failed(self.path_str(), e))?;
        Ok(())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, ()>> {
        self.guard
            .lock()
            .map_err(|_| AppError::Other("缓存文件锁已损坏".to_string()))
    }
}

impl AttemptStore for TomlAttemptStore {
    fn load(&self, key: &AttemptKey) -> AppResult<Option<String>> {
        let _guard = self.lock()?;
        let file = self.read()?;
        Ok(file
            .entries
            .get(&key.to_string())
            .map(|cached| cached.value.clone()))
    }

    fn save(&self, key: &AttemptKey, value: &str) -> AppResult<()> {
        let _guard = self.lock()?;
        let mut file = self.read()?;
        file.entries.insert(
            key.to_string(),
            CachedEntry {
                value: value.to_string(),
                cached_at: chrono::Local::now().to_rfc3339(),
            },
        );
        self.write(&file)?;
        debug!("已缓存 {} → {}", key, value);
        Ok(())
    }

    fn remove(&self, key: &AttemptKey) -> AppResult<()> {
        let _guard = self.lock()?;
        let mut file = self.read()?;
        if file.entries.remove(&key.to_string()).is_some() {
            self.write(&file)?;
            debug!("已删除缓存 {}", key);
        }
        Ok(())
    }
}
