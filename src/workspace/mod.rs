//! Workspace controller
//!
//! Owns the [`WorkspaceState`] and the [`Store`] behind it. A mutation is
//! committed to memory first and then only the collections it changed are
//! persisted. A failed save is logged and returned so the caller can show it,
//! but the in-memory state is never rolled back.

pub mod state;

pub use state::{Changes, WorkspaceState};

use crate::assistant::{Assistant, CHAT_ERROR_REPLY, ChatMessage};
use crate::backup::{self, BackupData, ImportSummary};
use crate::notify::NotificationSettings;
use crate::okr::Goal;
use crate::store::Store;
use crate::task::{Task, TaskStatus};
use crate::team::TeamMember;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Inline message when no AI provider is configured
pub const AI_UNAVAILABLE: &str = "AI is not configured. Set GOOGLE_API_KEY to enable it.";

/// Inline message when an analysis request fails
pub const ANALYSIS_FAILED: &str = "Analysis failed.";

pub struct Workspace {
    state: WorkspaceState,
    store: Arc<dyn Store>,
    assistant: Option<Assistant>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("tasks", &self.state.tasks.len())
            .field("goals", &self.state.goals.len())
            .field("members", &self.state.members.len())
            .field("assistant", &self.assistant)
            .finish()
    }
}

impl Workspace {
    /// Load the workspace from `store`
    pub async fn open(store: Arc<dyn Store>) -> Result<Self> {
        let snapshot = store.load().await.context("Failed to load workspace")?;
        tracing::info!(
            tasks = snapshot.tasks.len(),
            goals = snapshot.goals.len(),
            members = snapshot.members.len(),
            "Workspace opened"
        );
        Ok(Self {
            state: snapshot.into(),
            store,
            assistant: None,
        })
    }

    pub fn with_assistant(mut self, assistant: Assistant) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub fn assistant(&self) -> Option<&Assistant> {
        self.assistant.as_ref()
    }

    /// Save every changed collection, trying all of them and reporting the first failure
    async fn persist(&self, changes: Changes) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let state = &self.state;
        let mut first_error = None;
        let mut record = |name: &str, result: Result<()>| {
            if let Err(e) = result {
                tracing::warn!(collection = name, error = %e, "Failed to persist workspace data");
                first_error.get_or_insert(e.context(format!("Failed to save {name}")));
            }
        };

        if changes.tasks {
            record("tasks", self.store.save_tasks(&state.tasks).await);
        }
        if changes.goals {
            record("goals", self.store.save_goals(&state.goals).await);
        }
        if changes.members {
            record("members", self.store.save_members(&state.members).await);
        }
        if changes.settings {
            record("settings", self.store.save_settings(&state.settings).await);
        }
        if changes.chat {
            record("chat", self.store.save_chat_history(&state.chat_history).await);
        }
        if changes.strategy {
            record("strategy", self.store.save_strategy(&state.last_strategy).await);
        }
        if changes.workflow {
            record("workflow", self.store.save_workflow(&state.last_workflow).await);
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::debug!(collections = ?changes.names(), "Workspace data persisted");
                Ok(())
            }
        }
    }

    /// Create or replace a task
    pub async fn save_task(&mut self, task: Task) -> Result<Changes> {
        let changes = self.state.save_task(task)?;
        self.persist(changes).await?;
        Ok(changes)
    }

    /// Move a task to another column
    pub async fn move_task(&mut self, id: &str, status: TaskStatus) -> Result<Changes> {
        let changes = self.state.move_task(id, status)?;
        self.persist(changes).await?;
        Ok(changes)
    }

    pub async fn delete_task(&mut self, id: &str) -> Result<Changes> {
        let changes = self.state.delete_task(id);
        self.persist(changes).await?;
        Ok(changes)
    }

    pub async fn save_goal(&mut self, goal: Goal) -> Result<Changes> {
        let changes = self.state.save_goal(goal)?;
        self.persist(changes).await?;
        Ok(changes)
    }

    pub async fn delete_goal(&mut self, id: &str) -> Result<Changes> {
        let changes = self.state.delete_goal(id);
        self.persist(changes).await?;
        Ok(changes)
    }

    pub async fn save_member(&mut self, member: TeamMember) -> Result<Changes> {
        let changes = self.state.save_member(member)?;
        self.persist(changes).await?;
        Ok(changes)
    }

    pub async fn delete_member(&mut self, id: &str) -> Result<Changes> {
        let changes = self.state.delete_member(id);
        self.persist(changes).await?;
        Ok(changes)
    }

    pub async fn set_settings(&mut self, settings: NotificationSettings) -> Result<Changes> {
        let changes = self.state.set_settings(settings)?;
        self.persist(changes).await?;
        Ok(changes)
    }

    /// Accept a task list from the reminder check, which has already stored it
    pub fn adopt_checked_tasks(&mut self, tasks: Vec<Task>) -> Changes {
        let changes = self.state.replace_tasks(tasks);
        if !changes.is_empty() {
            tracing::debug!(tasks = self.state.tasks.len(), "Adopted reminder results");
        }
        changes
    }

    /// Re-read everything from the store
    pub async fn reload(&mut self) -> Result<()> {
        let snapshot = self.store.load().await.context("Failed to reload workspace")?;
        self.state = snapshot.into();
        Ok(())
    }

    /// Backup document of the current state
    pub fn export(&self, now: DateTime<Utc>) -> BackupData {
        backup::export(&self.state.to_snapshot(), now)
    }

    /// Import a backup document and reload.
    ///
    /// A document that fails to parse leaves both the store and the in-memory
    /// state untouched.
    pub async fn import(&mut self, json: &str) -> Result<ImportSummary> {
        let doc = backup::parse(json)?;
        let summary = backup::import(self.store.as_ref(), &doc).await?;
        self.reload().await?;
        Ok(summary)
    }

    /// Delete all data except settings
    pub async fn clear_data(&mut self) -> Result<()> {
        self.state.clear();
        self.store.clear().await.context("Failed to clear stored data")?;
        tracing::info!("Workspace cleared");
        Ok(())
    }

    /// Strategy analysis, cached on success; failures come back as inline text
    pub async fn run_strategy_analysis(&mut self) -> String {
        let Some(assistant) = &self.assistant else {
            return AI_UNAVAILABLE.to_string();
        };
        match assistant
            .analyze_strategy(&self.state.tasks, &self.state.goals)
            .await
        {
            Ok(analysis) => {
                let changes = self.state.set_last_strategy(analysis.clone());
                if let Err(e) = self.persist(changes).await {
                    tracing::warn!(error = %e, "Strategy analysis not cached");
                }
                analysis
            }
            Err(e) => {
                tracing::warn!(error = %e, "Strategy analysis failed");
                ANALYSIS_FAILED.to_string()
            }
        }
    }

    /// Workflow analysis, cached on success; failures come back as inline text
    pub async fn run_workflow_analysis(&mut self) -> String {
        let Some(assistant) = &self.assistant else {
            return AI_UNAVAILABLE.to_string();
        };
        match assistant.analyze_workflow(&self.state.tasks).await {
            Ok(analysis) => {
                let changes = self.state.set_last_workflow(analysis.clone());
                if let Err(e) = self.persist(changes).await {
                    tracing::warn!(error = %e, "Workflow analysis not cached");
                }
                analysis
            }
            Err(e) => {
                tracing::warn!(error = %e, "Workflow analysis failed");
                ANALYSIS_FAILED.to_string()
            }
        }
    }

    /// Send a chat message and record both turns.
    ///
    /// A failed request is recorded as a model turn carrying an error notice.
    pub async fn send_chat_message(&mut self, message: &str) -> ChatMessage {
        let history = self.state.chat_history.clone();
        let mut changes = self.state.push_chat(ChatMessage::user(message));

        let reply = match &self.assistant {
            Some(assistant) => match assistant.chat(&history, message, &self.state.tasks).await {
                Ok(text) => ChatMessage::model(text),
                Err(e) => {
                    tracing::warn!(error = %e, "Chat request failed");
                    ChatMessage::model(CHAT_ERROR_REPLY)
                }
            },
            None => ChatMessage::model(AI_UNAVAILABLE),
        };
        changes |= self.state.push_chat(reply.clone());

        if let Err(e) = self.persist(changes).await {
            tracing::warn!(error = %e, "Chat history not saved");
        }
        reply
    }

    pub async fn clear_chat(&mut self) -> Result<()> {
        let changes = self.state.clear_chat();
        self.persist(changes).await
    }
}
