//! Export / import of the whole workspace as one JSON document
//!
//! A document is fully parsed and checked before anything is written, so a
//! malformed or invalid file never leaves a partial import behind. Each top-level key
//! that is present replaces the matching collection; absent keys are left
//! alone.

use crate::assistant::ChatMessage;
use crate::error::ValidationError;
use crate::notify::NotificationSettings;
use crate::okr::Goal;
use crate::store::{Snapshot, Store};
use crate::task::Task;
use crate::team::TeamMember;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format version written by [`export`]
pub const BACKUP_VERSION: u32 = 1;

/// Why a document was rejected
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("backup is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("backup must be a JSON object")]
    NotAnObject,

    #[error("backup contains no data")]
    NoData,

    #[error("unsupported backup version {0} (newest supported is {BACKUP_VERSION})")]
    UnsupportedVersion(u32),

    #[error("backup contains invalid data: {0}")]
    Invalid(#[from] ValidationError),
}

/// The backup document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(
        with = "chrono::serde::ts_milliseconds_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<Goal>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<TeamMember>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<NotificationSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_history: Option<Vec<ChatMessage>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_strategy_analysis: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_workflow_analysis: Option<String>,
}

fn default_version() -> u32 {
    BACKUP_VERSION
}

impl BackupData {
    fn has_data(&self) -> bool {
        self.tasks.is_some()
            || self.goals.is_some()
            || self.members.is_some()
            || self.settings.is_some()
            || self.chat_history.is_some()
            || self.last_strategy_analysis.is_some()
            || self.last_workflow_analysis.is_some()
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize backup")
    }
}

/// Which collections an import replaced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub tasks: Option<usize>,
    pub goals: Option<usize>,
    pub members: Option<usize>,
    pub settings: bool,
    pub chat_messages: Option<usize>,
    pub strategy: bool,
    pub workflow: bool,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(n) = self.tasks {
            parts.push(format!("{n} tasks"));
        }
        if let Some(n) = self.goals {
            parts.push(format!("{n} goals"));
        }
        if let Some(n) = self.members {
            parts.push(format!("{n} members"));
        }
        if self.settings {
            parts.push("settings".to_string());
        }
        if let Some(n) = self.chat_messages {
            parts.push(format!("{n} chat messages"));
        }
        if self.strategy {
            parts.push("strategy analysis".to_string());
        }
        if self.workflow {
            parts.push("workflow analysis".to_string());
        }
        if parts.is_empty() {
            write!(f, "nothing")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Build a document from everything in `snapshot`
pub fn export(snapshot: &Snapshot, now: DateTime<Utc>) -> BackupData {
    BackupData {
        version: BACKUP_VERSION,
        timestamp: Some(now),
        tasks: Some(snapshot.tasks.clone()),
        goals: Some(snapshot.goals.clone()),
        members: Some(snapshot.members.clone()),
        settings: Some(snapshot.settings.clone()),
        chat_history: Some(snapshot.chat_history.clone()),
        last_strategy_analysis: Some(snapshot.last_strategy.clone()),
        last_workflow_analysis: Some(snapshot.last_workflow.clone()),
    }
}

/// Parse and check a document without touching any store.
///
/// Every record is validated and goal progress is re-derived from the key
/// results; a stored `progress` is never trusted.
pub fn parse(json: &str) -> Result<BackupData, ImportError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if !value.is_object() {
        return Err(ImportError::NotAnObject);
    }
    let mut doc: BackupData = serde_json::from_value(value)?;
    if doc.version > BACKUP_VERSION {
        return Err(ImportError::UnsupportedVersion(doc.version));
    }
    if !doc.has_data() {
        return Err(ImportError::NoData);
    }

    for task in doc.tasks.iter().flatten() {
        task.validate()?;
    }
    for member in doc.members.iter().flatten() {
        member.validate()?;
    }
    if let Some(settings) = &doc.settings {
        settings.validate()?;
    }
    for goal in doc.goals.iter_mut().flatten() {
        goal.validate()?;
        goal.recompute_progress();
    }
    Ok(doc)
}

/// Write every present collection of a parsed document to `store`.
///
/// Empty analysis strings are skipped.
pub async fn import(store: &dyn Store, doc: &BackupData) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    if let Some(tasks) = &doc.tasks {
        store.save_tasks(tasks).await.context("Failed to import tasks")?;
        summary.tasks = Some(tasks.len());
    }
    if let Some(goals) = &doc.goals {
        store.save_goals(goals).await.context("Failed to import goals")?;
        summary.goals = Some(goals.len());
    }
    if let Some(members) = &doc.members {
        store
            .save_members(members)
            .await
            .context("Failed to import members")?;
        summary.members = Some(members.len());
    }
    if let Some(settings) = &doc.settings {
        store
            .save_settings(settings)
            .await
            .context("Failed to import settings")?;
        summary.settings = true;
    }
    if let Some(chat) = &doc.chat_history {
        store
            .save_chat_history(chat)
            .await
            .context("Failed to import chat history")?;
        summary.chat_messages = Some(chat.len());
    }
    if let Some(analysis) = doc.last_strategy_analysis.as_deref().filter(|a| !a.is_empty()) {
        store.save_strategy(analysis).await?;
        summary.strategy = true;
    }
    if let Some(analysis) = doc.last_workflow_analysis.as_deref().filter(|a| !a.is_empty()) {
        store.save_workflow(analysis).await?;
        summary.workflow = true;
    }

    tracing::info!(version = doc.version, imported = %summary, "Backup imported");
    Ok(summary)
}
