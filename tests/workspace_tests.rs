//! Workspace behaviour against an in-memory store.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use planai::assistant::{Assistant, CHAT_ERROR_REPLY, ChatRole, GREETING};
use planai::config::ModelConfig;
use planai::okr::{Goal, KeyResult};
use planai::provider::{
    CompletionRequest, CompletionResponse, FinishReason, Message, Provider, Usage,
};
use planai::store::{MemoryStore, Snapshot};
use planai::task::{Task, TaskStatus};
use planai::workspace::{AI_UNAVAILABLE, ANALYSIS_FAILED, Workspace};
use std::sync::Arc;

// ============ Test Helpers ============

fn objective() -> Goal {
    Goal::new("Expand market", "", Utc::now())
        .with_key_result(KeyResult::new("Contracts", 20.0, "deals").with_id("kr-1").with_current(10.0))
        .with_key_result(KeyResult::new("Partners", 4.0, "").with_id("kr-2"))
}

async fn workspace_with_goal() -> (Arc<MemoryStore>, Workspace) {
    let store = Arc::new(MemoryStore::with_snapshot(Snapshot {
        goals: vec![objective()],
        ..Snapshot::default()
    }));
    let workspace = Workspace::open(store.clone()).await.unwrap();
    (store, workspace)
}

fn kr_value(workspace: &Workspace, id: &str) -> f64 {
    workspace.state().find_key_result(id).unwrap().1.current_value
}

/// Provider that always answers with the same text, or always fails
struct FixedProvider(Option<&'static str>);

#[async_trait]
impl Provider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
        let Some(text) = self.0 else {
            anyhow::bail!("connection refused");
        };
        Ok(CompletionResponse {
            message: Message::assistant(text),
            usage: Usage::default(),
            finish_reason: FinishReason::Stop,
        })
    }
}

fn assistant(reply: Option<&'static str>) -> Assistant {
    Assistant::new(Arc::new(FixedProvider(reply)), ModelConfig::default())
}

// ============ Task Linkage ============

#[tokio::test]
async fn task_created_done_contributes_and_persists_goals() {
    let (store, mut workspace) = workspace_with_goal().await;

    let task = Task::new("Sign deal")
        .with_status(TaskStatus::Done)
        .with_link("kr-1", 5.0);
    let changes = workspace.save_task(task).await.unwrap();

    assert!(changes.tasks && changes.goals);
    assert_eq!(kr_value(&workspace, "kr-1"), 15.0);
    // (75 + 0) / 2
    assert_eq!(workspace.state().goals[0].progress, 38);

    let stored = store.snapshot();
    assert_eq!(stored.tasks.len(), 1);
    assert_eq!(stored.goals, workspace.state().goals);
}

#[tokio::test]
async fn edit_while_done_applies_difference() {
    let (_store, mut workspace) = workspace_with_goal().await;
    let task = Task::new("Sign deal")
        .with_status(TaskStatus::Done)
        .with_link("kr-1", 2.0);
    workspace.save_task(task.clone()).await.unwrap();

    let edited = Task {
        contribution_value: Some(6.0),
        ..task
    };
    workspace.save_task(edited).await.unwrap();
    assert_eq!(kr_value(&workspace, "kr-1"), 16.0);
}

#[tokio::test]
async fn move_out_of_done_takes_back_contribution() {
    let (_store, mut workspace) = workspace_with_goal().await;
    let task = Task::new("Sign deal").with_link("kr-1", 3.0);
    let id = task.id.clone();
    workspace.save_task(task).await.unwrap();

    workspace.move_task(&id, TaskStatus::Done).await.unwrap();
    assert_eq!(kr_value(&workspace, "kr-1"), 13.0);

    let unchanged = workspace.move_task(&id, TaskStatus::Done).await.unwrap();
    assert!(unchanged.is_empty());
    assert_eq!(kr_value(&workspace, "kr-1"), 13.0);

    workspace.move_task(&id, TaskStatus::Review).await.unwrap();
    assert_eq!(kr_value(&workspace, "kr-1"), 10.0);
}

#[tokio::test]
async fn deleting_done_task_reverses_before_removal() {
    let (store, mut workspace) = workspace_with_goal().await;
    let task = Task::new("Sign deal")
        .with_status(TaskStatus::Done)
        .with_link("kr-1", 5.0);
    let id = task.id.clone();
    workspace.save_task(task).await.unwrap();

    let changes = workspace.delete_task(&id).await.unwrap();
    assert!(changes.goals);
    assert!(workspace.state().tasks.is_empty());
    assert_eq!(kr_value(&workspace, "kr-1"), 10.0);
    assert_eq!(store.snapshot().goals[0].key_results[0].current_value, 10.0);
}

#[tokio::test]
async fn dangling_link_leaves_goals_alone() {
    let (store, mut workspace) = workspace_with_goal().await;
    let goals_before = workspace.state().goals.clone();

    let task = Task::new("Orphan")
        .with_status(TaskStatus::Done)
        .with_link("kr-99", 4.0);
    let changes = workspace.save_task(task).await.unwrap();

    assert!(changes.tasks);
    assert!(!changes.goals);
    assert_eq!(workspace.state().goals, goals_before);
    // only the task collection was written
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn deleting_goal_keeps_task_links() {
    let (_store, mut workspace) = workspace_with_goal().await;
    let goal_id = workspace.state().goals[0].id.clone();
    let task = Task::new("Sign deal").with_link("kr-1", 1.0);
    let id = task.id.clone();
    workspace.save_task(task).await.unwrap();

    workspace.delete_goal(&goal_id).await.unwrap();
    assert!(workspace.state().goals.is_empty());
    assert_eq!(
        workspace.state().task(&id).unwrap().linked_key_result(),
        Some("kr-1")
    );

    // completing it later is a no-op for goals
    let changes = workspace.move_task(&id, TaskStatus::Done).await.unwrap();
    assert!(changes.tasks && !changes.goals);
}

#[tokio::test]
async fn invalid_task_is_rejected_without_changes() {
    let (store, mut workspace) = workspace_with_goal().await;
    let result = workspace.save_task(Task::new("   ")).await;
    assert!(result.is_err());
    assert!(workspace.state().tasks.is_empty());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn moving_invalid_stored_task_reports_error() {
    let mut blank = Task::new("").with_link("kr-1", 5.0);
    blank.id = "t-blank".to_string();
    let store = Arc::new(MemoryStore::with_snapshot(Snapshot {
        tasks: vec![blank],
        goals: vec![objective()],
        ..Snapshot::default()
    }));
    let mut workspace = Workspace::open(store.clone()).await.unwrap();

    let err = workspace.move_task("t-blank", TaskStatus::Done).await.unwrap_err();
    assert!(format!("{err:#}").contains("title"));
    assert_eq!(workspace.state().tasks[0].status, TaskStatus::Todo);
    assert_eq!(kr_value(&workspace, "kr-1"), 10.0);
    assert_eq!(store.write_count(), 0);
}

// ============ Persistence Failures ============

#[tokio::test]
async fn failed_save_keeps_state_and_reports_error() {
    let (store, mut workspace) = workspace_with_goal().await;
    store.set_fail_writes(true);

    let task = Task::new("Sign deal")
        .with_status(TaskStatus::Done)
        .with_link("kr-1", 5.0);
    let err = workspace.save_task(task).await.unwrap_err();
    assert!(format!("{err:#}").contains("read-only"));

    assert_eq!(workspace.state().tasks.len(), 1);
    assert_eq!(kr_value(&workspace, "kr-1"), 15.0);
    assert!(store.snapshot().tasks.is_empty());
}

// ============ Backup ============

#[tokio::test]
async fn malformed_import_changes_nothing() {
    let (store, mut workspace) = workspace_with_goal().await;
    workspace
        .save_task(Task::new("Keep me"))
        .await
        .unwrap();
    let before = store.snapshot();
    let writes = store.write_count();

    for doc in ["{not json", "[1, 2]", "{}", r#"{"version": 7, "tasks": []}"#] {
        assert!(workspace.import(doc).await.is_err(), "{doc}");
    }
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.write_count(), writes);
    assert_eq!(workspace.state().tasks.len(), 1);
}

#[tokio::test]
async fn import_with_duplicate_key_result_ids_is_rejected() {
    let (store, mut workspace) = workspace_with_goal().await;
    let before = store.snapshot();
    let writes = store.write_count();

    let doc = r#"{
        "tasks": [{"id": "t1", "title": "Sign deal", "status": "DONE",
                   "linkedKeyResultId": "kr-dup", "contributionValue": 1}],
        "goals": [{"id": "g1", "title": "Grow", "keyResults": [
            {"id": "kr-dup", "title": "Deals", "currentValue": 1, "targetValue": 10},
            {"id": "kr-dup", "title": "Leads", "currentValue": 1, "targetValue": 10}
        ]}]
    }"#;
    let err = workspace.import(doc).await.unwrap_err();
    assert!(format!("{err:#}").contains("kr-dup"));

    assert_eq!(store.snapshot(), before);
    assert_eq!(store.write_count(), writes);
    assert_eq!(workspace.state().goals, before.goals);
    assert!(workspace.state().tasks.is_empty());
}

#[tokio::test]
async fn import_recomputes_stale_goal_progress() {
    let (store, mut workspace) = workspace_with_goal().await;

    let doc = r#"{"goals": [{"id": "g1", "title": "Grow", "progress": 55, "keyResults": [
        {"id": "kr-a", "title": "Deals", "currentValue": 0, "targetValue": 10}
    ]}]}"#;
    workspace.import(doc).await.unwrap();

    assert_eq!(workspace.state().goals[0].progress, 0);
    assert_eq!(store.snapshot().goals[0].progress, 0);
}

#[tokio::test]
async fn export_then_import_into_fresh_workspace() {
    let (_store, mut workspace) = workspace_with_goal().await;
    workspace
        .save_task(Task::new("Sign deal").with_status(TaskStatus::Done).with_link("kr-1", 5.0))
        .await
        .unwrap();
    let json = workspace.export(Utc::now()).to_json().unwrap();

    let target = Arc::new(MemoryStore::new());
    let mut restored = Workspace::open(target.clone()).await.unwrap();
    let summary = restored.import(&json).await.unwrap();

    assert_eq!(summary.tasks, Some(1));
    assert_eq!(summary.goals, Some(1));
    assert_eq!(restored.state().tasks, workspace.state().tasks);
    assert_eq!(restored.state().goals, workspace.state().goals);
    assert_eq!(kr_value(&restored, "kr-1"), 15.0);
}

#[tokio::test]
async fn partial_import_keeps_other_collections() {
    let (store, mut workspace) = workspace_with_goal().await;
    workspace.save_task(Task::new("Old task")).await.unwrap();

    let summary = workspace
        .import(r#"{"tasks": [{"id": "t-new", "title": "Imported"}]}"#)
        .await
        .unwrap();
    assert_eq!(summary.tasks, Some(1));
    assert_eq!(summary.goals, None);

    assert_eq!(workspace.state().tasks.len(), 1);
    assert_eq!(workspace.state().tasks[0].title, "Imported");
    assert_eq!(workspace.state().goals.len(), 1);
    assert_eq!(store.snapshot().goals.len(), 1);
}

#[tokio::test]
async fn clear_keeps_settings() {
    let (store, mut workspace) = workspace_with_goal().await;
    let mut settings = workspace.state().settings.clone();
    settings.enabled = true;
    settings.check_interval = 15;
    workspace.set_settings(settings.clone()).await.unwrap();
    workspace.save_task(Task::new("t")).await.unwrap();

    workspace.clear_data().await.unwrap();
    assert!(workspace.state().tasks.is_empty());
    assert!(workspace.state().goals.is_empty());
    assert_eq!(workspace.state().settings, settings);
    assert_eq!(store.snapshot().settings, settings);
    assert!(store.snapshot().goals.is_empty());
}

// ============ Assistant ============

#[tokio::test]
async fn ai_operations_without_provider_answer_inline() {
    let (store, mut workspace) = workspace_with_goal().await;

    assert_eq!(workspace.run_strategy_analysis().await, AI_UNAVAILABLE);
    assert_eq!(workspace.run_workflow_analysis().await, AI_UNAVAILABLE);

    let reply = workspace.send_chat_message("hello").await;
    assert_eq!(reply.text, AI_UNAVAILABLE);
    let history = store.snapshot().chat_history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, ChatRole::User);
    assert_eq!(history[1].role, ChatRole::Model);
}

#[tokio::test]
async fn successful_analysis_is_cached() {
    let (store, workspace) = workspace_with_goal().await;
    let mut workspace = workspace.with_assistant(assistant(Some("Focus on partners.")));

    assert_eq!(workspace.run_strategy_analysis().await, "Focus on partners.");
    assert_eq!(workspace.state().last_strategy, "Focus on partners.");
    assert_eq!(store.snapshot().last_strategy, "Focus on partners.");
}

#[tokio::test]
async fn failed_analysis_keeps_previous_cache() {
    let store = Arc::new(MemoryStore::with_snapshot(Snapshot {
        last_workflow: "Earlier analysis".to_string(),
        ..Snapshot::default()
    }));
    let mut workspace = Workspace::open(store.clone())
        .await
        .unwrap()
        .with_assistant(assistant(None));

    assert_eq!(workspace.run_workflow_analysis().await, ANALYSIS_FAILED);
    assert_eq!(workspace.state().last_workflow, "Earlier analysis");
}

#[tokio::test]
async fn failed_chat_records_error_turn() {
    let (_store, workspace) = workspace_with_goal().await;
    let mut workspace = workspace.with_assistant(assistant(None));

    let reply = workspace.send_chat_message("status?").await;
    assert_eq!(reply.text, CHAT_ERROR_REPLY);
    assert_eq!(workspace.state().chat_history.len(), 2);

    workspace.clear_chat().await.unwrap();
    assert_eq!(workspace.state().chat_history.len(), 1);
    assert_eq!(workspace.state().chat_history[0].text, GREETING);
}
