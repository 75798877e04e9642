use std::collections::HashMap;

use crate::error::StorageError;
use crate::traits::PersistenceAdapter;

/// In-process key/value map standing in for browser-style local storage.
///
/// Supports a byte quota and switchable read/write failures so callers can
/// exercise their degraded-durability paths.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    entries: HashMap<String, String>,
    quota: Option<usize>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Limit on the total size of all stored values, in bytes.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of write attempts, successful or not.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn used_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Unavailable(format!("read of `{key}` refused")));
        }
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes += 1;
        if self.fail_writes {
            return Err(StorageError::Unavailable(format!("write of `{key}` refused")));
        }
        if let Some(limit) = self.quota {
            let size = self.used_excluding(key) + key.len() + value.len();
            if size > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    size,
                    limit,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
