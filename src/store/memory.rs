//! In-memory store

use super::{Snapshot, Store};
use crate::assistant::ChatMessage;
use crate::notify::NotificationSettings;
use crate::okr::Goal;
use crate::task::Task;
use crate::team::TeamMember;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Store keeping everything in process memory.
///
/// Writes can be switched to fail, which lets callers exercise their
/// persistence-error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Snapshot>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing data
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
            ..Self::default()
        }
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Current contents
    pub fn snapshot(&self) -> Snapshot {
        self.data.read().clone()
    }

    fn write(&self, apply: impl FnOnce(&mut Snapshot)) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            anyhow::bail!("memory store is read-only");
        }
        apply(&mut self.data.write());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot())
    }

    async fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.write(|data| data.tasks = tasks.to_vec())
    }

    async fn save_goals(&self, goals: &[Goal]) -> Result<()> {
        self.write(|data| data.goals = goals.to_vec())
    }

    async fn save_members(&self, members: &[TeamMember]) -> Result<()> {
        self.write(|data| data.members = members.to_vec())
    }

    async fn save_settings(&self, settings: &NotificationSettings) -> Result<()> {
        self.write(|data| data.settings = settings.clone())
    }

    async fn save_chat_history(&self, messages: &[ChatMessage]) -> Result<()> {
        self.write(|data| data.chat_history = messages.to_vec())
    }

    async fn save_strategy(&self, analysis: &str) -> Result<()> {
        self.write(|data| data.last_strategy = analysis.to_string())
    }

    async fn save_workflow(&self, analysis: &str) -> Result<()> {
        self.write(|data| data.last_workflow = analysis.to_string())
    }

    async fn clear(&self) -> Result<()> {
        self.write(|data| {
            *data = Snapshot {
                settings: data.settings.clone(),
                ..Snapshot::default()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_writes_leave_data_untouched() {
        let store = MemoryStore::new();
        store.save_tasks(&[Task::new("a")]).await.unwrap();
        store.set_fail_writes(true);
        assert!(store.save_tasks(&[]).await.is_err());
        assert_eq!(store.snapshot().tasks.len(), 1);
        assert_eq!(store.write_count(), 1);
    }
}
