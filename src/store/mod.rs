//! Persistence layer
//!
//! The workspace reads and writes whole collections through the [`Store`]
//! trait. Saves are independent: there is no transaction spanning two
//! collections, so a crash between two saves can leave them out of step.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::assistant::ChatMessage;
use crate::notify::NotificationSettings;
use crate::okr::Goal;
use crate::task::Task;
use crate::team::TeamMember;
use anyhow::Result;
use async_trait::async_trait;

/// Everything a store holds, as loaded at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub goals: Vec<Goal>,
    pub members: Vec<TeamMember>,
    pub settings: NotificationSettings,
    pub chat_history: Vec<ChatMessage>,
    /// Last successful strategy analysis, empty if none
    pub last_strategy: String,
    /// Last successful workflow analysis, empty if none
    pub last_workflow: String,
}

/// Key-value persistence for the workspace collections
#[async_trait]
pub trait Store: Send + Sync {
    /// Load every collection; missing collections come back empty/default
    async fn load(&self) -> Result<Snapshot>;

    async fn save_tasks(&self, tasks: &[Task]) -> Result<()>;

    async fn save_goals(&self, goals: &[Goal]) -> Result<()>;

    async fn save_members(&self, members: &[TeamMember]) -> Result<()>;

    async fn save_settings(&self, settings: &NotificationSettings) -> Result<()>;

    async fn save_chat_history(&self, messages: &[ChatMessage]) -> Result<()>;

    async fn save_strategy(&self, analysis: &str) -> Result<()>;

    async fn save_workflow(&self, analysis: &str) -> Result<()>;

    /// Remove all data except settings
    async fn clear(&self) -> Result<()>;
}
