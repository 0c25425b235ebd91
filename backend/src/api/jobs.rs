//! Recent refine results, kept so a preview can be downloaded.
//!
//! Bounded and in-memory only: the oldest job is dropped once the store is
//! full, and everything is lost on restart.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::models::Table;

/// Jobs kept before the oldest is evicted
pub const DEFAULT_JOB_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    /// Name of the uploaded file
    pub source_name: Option<String>,
    /// Sheet name for the exported workbook
    pub sheet_name: String,
    pub table: Table,
    pub created_at: DateTime<Utc>,
}

pub struct JobStore {
    capacity: usize,
    jobs: Mutex<VecDeque<Job>>,
}

impl JobStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    /// Store a result and return its id.
    pub fn insert(&self, table: Table, source_name: Option<String>, sheet_name: impl Into<String>) -> String {
        let job = Job {
            id: Uuid::new_v4().to_string(),
            source_name,
            sheet_name: sheet_name.into(),
            table,
            created_at: Utc::now(),
        };
        let id = job.id.clone();

        let mut jobs = self.lock();
        jobs.push_back(job);
        while jobs.len() > self.capacity {
            jobs.pop_front();
        }
        id
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.lock().iter().find(|j| j.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A panic while holding the lock leaves the queue itself intact.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::empty(vec!["a".into()])
    }

    #[test]
    fn test_insert_and_get() {
        let store = JobStore::default();
        let id = store.insert(table(), Some("data.csv".into()), "Sheet1");
        let job = store.get(&id).unwrap();
        assert_eq!(job.source_name.as_deref(), Some("data.csv"));
        assert_eq!(job.sheet_name, "Sheet1");
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_oldest_evicted() {
        let store = JobStore::new(2);
        let first = store.insert(table(), None, "s");
        let second = store.insert(table(), None, "s");
        let third = store.insert(table(), None, "s");

        assert_eq!(store.len(), 2);
        assert!(store.get(&first).is_none());
        assert!(store.get(&second).is_some());
        assert!(store.get(&third).is_some());
    }

    #[test]
    fn test_poisoned_lock_still_stores() {
        let store = std::sync::Arc::new(JobStore::default());
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.jobs.lock().unwrap();
            panic!("handler panicked while holding the job lock");
        })
        .join();
        assert!(store.jobs.is_poisoned());

        let id = store.insert(table(), None, "Sheet1");
        assert!(store.get(&id).is_some());
        assert_eq!(store.len(), 1);
    }
}
