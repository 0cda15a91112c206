//! Running-task table
//!
//! Maps a running key to the live task instance occupying that slot. The key
//! is the job id, or `jobId-logId` in concurrent-execute mode, so block
//! strategies resolve against the right granularity. All operations are
//! atomic with respect to each other.

use std::collections::HashMap;
use std::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// One dispatch occurrence: created on admission, removed on completion.
///
/// Instances are never reused between dispatches; the cancel token is the
/// only channel through which a running instance is mutated from outside.
#[derive(Debug, Clone)]
pub struct TaskInstance {
    pub job_id: i64,
    pub log_id: i64,
    pub handler_name: String,
    pub cancel: CancellationToken,
}

/// Table of currently running tasks, keyed by running key.
pub struct RunningTable {
    tasks: RwLock<HashMap<String, TaskInstance>>,
}

impl RunningTable {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: String, instance: TaskInstance) {
        self.tasks.write().unwrap().insert(key, instance);
    }

    pub fn get(&self, key: &str) -> Option<TaskInstance> {
        self.tasks.read().unwrap().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tasks.read().unwrap().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<TaskInstance> {
        self.tasks.write().unwrap().remove(key)
    }

    /// Remove the entry under `key` only if it still belongs to the dispatch
    /// identified by `log_id`.
    ///
    /// The completion path uses this instead of a plain remove: a kill or a
    /// cover-early takeover may have already freed the slot and a fresh
    /// dispatch may occupy it, and that newer instance must not be lost.
    pub fn remove_if_log(&self, key: &str, log_id: i64) -> bool {
        let mut tasks = self.tasks.write().unwrap();
        match tasks.get(key) {
            Some(instance) if instance.log_id == log_id => {
                tasks.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().unwrap().is_empty()
    }

    /// Snapshot of the current entries, for logging and inspection.
    pub fn snapshot(&self) -> Vec<(String, TaskInstance)> {
        self.tasks
            .read()
            .unwrap()
            .iter()
            .map(|(key, instance)| (key.clone(), instance.clone()))
            .collect()
    }
}

impl Default for RunningTable {
    fn default() -> Self {
        Self::new()
    }
}
