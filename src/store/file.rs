//! File-backed store
//!
//! Each collection lives in its own JSON file under the data directory
//! (`Config::data_dir()` by default). Analyses are stored as plain text.

use super::{Snapshot, Store};
use crate::assistant::ChatMessage;
use crate::notify::NotificationSettings;
use crate::okr::Goal;
use crate::task::Task;
use crate::team::TeamMember;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const TASKS_FILE: &str = "tasks.json";
const GOALS_FILE: &str = "goals.json";
const MEMBERS_FILE: &str = "members.json";
const SETTINGS_FILE: &str = "settings.json";
const CHAT_FILE: &str = "chat.json";
const STRATEGY_FILE: &str = "strategy.md";
const WORKFLOW_FILE: &str = "workflow.md";

/// Store writing one file per collection
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base_path` (created lazily on first write)
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Create store from Config::data_dir() or fallback to temp
    pub async fn from_config(config: &crate::config::Config) -> Result<Self> {
        let base_path = config.resolved_data_dir();

        fs::create_dir_all(&base_path)
            .await
            .with_context(|| format!("Failed to create data directory {}", base_path.display()))?;

        tracing::info!(path = %base_path.display(), "File store initialized");

        Ok(Self::new(base_path))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    async fn read_json<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        match fs::read_to_string(&path).await {
            Ok(data) => serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn read_text(&self, name: &str) -> Result<String> {
        let path = self.path(name);
        match fs::read_to_string(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_atomic(name, json.as_bytes()).await
    }

    /// Write to a temp file and rename over the target
    async fn write_atomic(&self, name: &str, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        let path = self.path(name);
        // One temp file per write; concurrent saves must not share it
        let tmp_path = self.path(&format!("{name}.{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_path, data)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Store for FileStore {
    async fn load(&self) -> Result<Snapshot> {
        let snapshot = Snapshot {
            tasks: self.read_json(TASKS_FILE).await?,
            goals: self.read_json(GOALS_FILE).await?,
            members: self.read_json(MEMBERS_FILE).await?,
            settings: self.read_json(SETTINGS_FILE).await?,
            chat_history: self.read_json(CHAT_FILE).await?,
            last_strategy: self.read_text(STRATEGY_FILE).await?,
            last_workflow: self.read_text(WORKFLOW_FILE).await?,
        };
        tracing::debug!(
            path = %self.base_path.display(),
            tasks = snapshot.tasks.len(),
            goals = snapshot.goals.len(),
            members = snapshot.members.len(),
            "Loaded workspace data"
        );
        Ok(snapshot)
    }

    async fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.write_json(TASKS_FILE, tasks).await?;
        tracing::debug!(count = tasks.len(), "Tasks saved");
        Ok(())
    }

    async fn save_goals(&self, goals: &[Goal]) -> Result<()> {
        self.write_json(GOALS_FILE, goals).await?;
        tracing::debug!(count = goals.len(), "Goals saved");
        Ok(())
    }

    async fn save_members(&self, members: &[TeamMember]) -> Result<()> {
        self.write_json(MEMBERS_FILE, members).await
    }

    async fn save_settings(&self, settings: &NotificationSettings) -> Result<()> {
        self.write_json(SETTINGS_FILE, settings).await
    }

    async fn save_chat_history(&self, messages: &[ChatMessage]) -> Result<()> {
        self.write_json(CHAT_FILE, messages).await
    }

    async fn save_strategy(&self, analysis: &str) -> Result<()> {
        self.write_atomic(STRATEGY_FILE, analysis.as_bytes()).await
    }

    async fn save_workflow(&self, analysis: &str) -> Result<()> {
        self.write_atomic(WORKFLOW_FILE, analysis.as_bytes()).await
    }

    async fn clear(&self) -> Result<()> {
        for name in [
            TASKS_FILE,
            GOALS_FILE,
            MEMBERS_FILE,
            CHAT_FILE,
            STRATEGY_FILE,
            WORKFLOW_FILE,
        ] {
            self.remove(name).await?;
        }
        tracing::info!(path = %self.base_path.display(), "Workspace data cleared");
        Ok(())
    }
}
