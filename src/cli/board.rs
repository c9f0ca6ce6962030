//! Board, objective and roster commands

use super::{
    GoalCommand, KrCommand, MemberCommand, TaskAddArgs, TaskCommand, TaskEditArgs, TaskListArgs,
    day_start, resolve_id,
};
use crate::dashboard::{self, BoardStats};
use crate::okr::{Goal, KeyResult};
use crate::task::{Subtask, Task, TaskFilter};
use crate::team::TeamMember;
use crate::workspace::{AI_UNAVAILABLE, Changes, Workspace};
use anyhow::{Context, Result};
use chrono::Utc;

pub async fn task(workspace: &mut Workspace, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Add(args) => add_task(workspace, args).await,
        TaskCommand::List(args) => list_tasks(workspace, &args),
        TaskCommand::Move { id, status } => {
            let id = resolve_id(&workspace.state().tasks, &id, |t| t.id.as_str(), "task")?
                .id
                .clone();
            let changes = workspace.move_task(&id, status).await?;
            println!("Moved {} to {}", short(&id), status.label());
            report_goal_change(workspace, changes);
            Ok(())
        }
        TaskCommand::Edit(args) => edit_task(workspace, args).await,
        TaskCommand::Delete { id } => {
            let id = resolve_id(&workspace.state().tasks, &id, |t| t.id.as_str(), "task")?
                .id
                .clone();
            let changes = workspace.delete_task(&id).await?;
            println!("Deleted task {}", short(&id));
            report_goal_change(workspace, changes);
            Ok(())
        }
    }
}

async fn add_task(workspace: &mut Workspace, args: TaskAddArgs) -> Result<()> {
    let mut task = Task::new(args.title)
        .with_status(args.status)
        .with_priority(args.priority);
    task.description = args.description;
    task.assignee = args.assignee;
    task.due_date = args.due.map(day_start);
    task.start_date = args.start.map(day_start);
    task.tags = args.tags;
    task.subtasks = args.subtasks.into_iter().map(Subtask::new).collect();
    if let Some(kr) = args.kr {
        if workspace.state().find_key_result(&kr).is_none() {
            tracing::warn!(key_result_id = %kr, "Linking task to unknown key result");
        }
        task = task.with_link(kr, args.contribution.unwrap_or(0.0));
    }

    let id = task.id.clone();
    let changes = workspace.save_task(task).await?;
    println!("Created task {}", short(&id));
    report_goal_change(workspace, changes);
    Ok(())
}

async fn edit_task(workspace: &mut Workspace, args: TaskEditArgs) -> Result<()> {
    let mut task = resolve_id(&workspace.state().tasks, &args.id, |t| t.id.as_str(), "task")?
        .clone();

    if let Some(title) = args.title {
        task.title = title;
    }
    if let Some(description) = args.description {
        task.description = description;
    }
    if let Some(status) = args.status {
        task.status = status;
    }
    if let Some(priority) = args.priority {
        task.priority = priority;
    }
    if let Some(assignee) = args.assignee {
        task.assignee = Some(assignee).filter(|a| !a.trim().is_empty());
    }
    if let Some(due) = args.due {
        task.due_date = Some(day_start(due));
    }
    if let Some(kr) = args.kr {
        task.linked_key_result_id = Some(kr).filter(|k| !k.trim().is_empty());
    }
    if let Some(contribution) = args.contribution {
        task.contribution_value = Some(contribution);
    }
    if let Some(outcome) = args.outcome {
        task.outcome = Some(outcome);
    }
    if let Some(note) = args.note {
        task.quick_note = Some(note);
    }
    task.subtasks
        .extend(args.subtasks.into_iter().map(Subtask::new));
    if let Some(position) = args.complete_subtask {
        let subtask = position
            .checked_sub(1)
            .and_then(|i| task.subtasks.get_mut(i))
            .with_context(|| format!("Task has no subtask {position}"))?;
        subtask.completed = true;
    }
    if let Some(url) = args.image_url {
        task.image_url = Some(url).filter(|u| !u.trim().is_empty());
    }
    if let Some(prompt) = args.image_prompt {
        match workspace.assistant() {
            None => println!("{AI_UNAVAILABLE}"),
            Some(assistant) => match assistant.generate_task_image(&prompt).await {
                Some(url) => task.image_url = Some(url),
                None => {
                    println!("Could not generate an image. Try again later or change the prompt.")
                }
            },
        }
    }

    let id = task.id.clone();
    let changes = workspace.save_task(task).await?;
    println!("Updated task {}", short(&id));
    report_goal_change(workspace, changes);
    Ok(())
}

fn list_tasks(workspace: &Workspace, args: &TaskListArgs) -> Result<()> {
    let filter = TaskFilter {
        search: args.search.clone(),
        assignee: args.assignee.clone(),
        priority: args.priority,
        status: args.status,
        due_from: args.from.map(day_start),
        due_until: args.until.map(day_start),
    };
    let tasks = filter.apply(&workspace.state().tasks);

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if filter.active_count() > 0 {
        println!(
            "{} of {} tasks ({} filters)",
            tasks.len(),
            workspace.state().tasks.len(),
            filter.active_count()
        );
    }

    let now = Utc::now();
    for task in tasks {
        let mut line = format!(
            "{}  [{}] {:<6} {}",
            short(&task.id),
            task.status.as_str(),
            task.priority.as_str(),
            task.title
        );
        if let Some(assignee) = &task.assignee {
            line.push_str(&format!("  @{assignee}"));
        }
        if let Some(due) = task.due_date {
            line.push_str(&format!("  due {}", due.format("%Y-%m-%d")));
            if task.is_overdue(now) {
                line.push_str(" (overdue)");
            } else if task.is_due_soon(now) {
                line.push_str(" (due soon)");
            }
        }
        if let Some((done, total)) = task.subtask_progress() {
            line.push_str(&format!("  {done}/{total}"));
        }
        if let Some(kr) = task.linked_key_result() {
            line.push_str(&format!("  -> {kr} (+{})", task.contribution()));
        }
        println!("{line}");
    }
    Ok(())
}

pub async fn goal(workspace: &mut Workspace, command: GoalCommand) -> Result<()> {
    match command {
        GoalCommand::Add {
            title,
            description,
            deadline,
        } => {
            let goal = Goal::new(title, description, day_start(deadline));
            let id = goal.id.clone();
            workspace.save_goal(goal).await?;
            println!("Created objective {}", short(&id));
        }
        GoalCommand::List => {
            let now = Utc::now();
            for goal in &workspace.state().goals {
                let mut status = format!("{} days left", goal.days_left(now));
                if goal.is_achieved() {
                    status = "achieved".to_string();
                } else if goal.is_overdue(now) {
                    status = "overdue".to_string();
                }
                println!(
                    "{}  {:>3}%  {}  ({status})",
                    short(&goal.id),
                    goal.progress,
                    goal.title
                );
                for kr in &goal.key_results {
                    let linked = workspace.state().tasks_linked_to(&kr.id).count();
                    println!(
                        "      {}  {}  {}/{} {}  {:.0}%  ({linked} tasks)",
                        kr.id,
                        kr.title,
                        kr.current_value,
                        kr.target_value,
                        kr.unit,
                        kr.percent()
                    );
                }
            }
        }
        GoalCommand::Delete { id } => {
            let id = resolve_id(&workspace.state().goals, &id, |g| g.id.as_str(), "objective")?
                .id
                .clone();
            workspace.delete_goal(&id).await?;
            println!("Deleted objective {}", short(&id));
        }
    }
    Ok(())
}

pub async fn key_result(workspace: &mut Workspace, command: KrCommand) -> Result<()> {
    match command {
        KrCommand::Add {
            goal,
            title,
            target,
            unit,
            current,
        } => {
            let mut goal =
                resolve_id(&workspace.state().goals, &goal, |g| g.id.as_str(), "objective")?
                    .clone();
            let kr = KeyResult::new(title, target, unit).with_current(current);
            let kr_id = kr.id.clone();
            goal.add_key_result(kr);
            workspace.save_goal(goal).await?;
            println!("Added key result {kr_id}");
        }
        KrCommand::Set { id, value } => {
            let (goal, _) = workspace
                .state()
                .find_key_result(&id)
                .with_context(|| format!("No key result with id `{id}`"))?;
            let mut goal = goal.clone();
            if let Some(kr) = goal.key_results.iter_mut().find(|kr| kr.id == id) {
                kr.current_value = value;
            }
            workspace.save_goal(goal).await?;
            println!("Set {id} to {value}");
        }
    }
    Ok(())
}

pub async fn member(workspace: &mut Workspace, command: MemberCommand) -> Result<()> {
    match command {
        MemberCommand::Add { name, phone, role } => {
            let mut member = TeamMember::new(name);
            member.phone = phone;
            member.role = role;
            let id = member.id.clone();
            workspace.save_member(member).await?;
            println!("Added member {}", short(&id));
        }
        MemberCommand::List => {
            let state = workspace.state();
            for entry in dashboard::leaderboard(&state.tasks, &state.members, usize::MAX) {
                let member = entry.member;
                println!(
                    "{}  {:<2}  {}  {}{}  ({} done)",
                    short(&member.id),
                    member.initials,
                    member.name,
                    member.role.as_deref().unwrap_or("Member"),
                    if member.has_phone() { "" } else { "  (no phone)" },
                    entry.completed
                );
            }
        }
        MemberCommand::Delete { id } => {
            let id = resolve_id(&workspace.state().members, &id, |m| m.id.as_str(), "member")?
                .id
                .clone();
            workspace.delete_member(&id).await?;
            println!("Removed member {}", short(&id));
        }
    }
    Ok(())
}

pub fn stats(workspace: &Workspace) -> Result<()> {
    let state = workspace.state();
    let stats = BoardStats::compute(&state.tasks, Utc::now());

    println!("Tasks: {} ({} open, {} done)", stats.total, stats.open(), stats.done);
    for (status, count) in &stats.by_status {
        println!("  {status:<12} {count}");
    }
    println!("Completion: {}%", stats.completion_rate);
    println!(
        "High priority: {}  Urgent open: {}  Overdue: {}  Due soon: {}",
        stats.high_priority, stats.urgent_open, stats.overdue, stats.due_soon
    );
    println!(
        "Objectives: {} (overall {}%)",
        state.goals.len(),
        dashboard::overall_goal_progress(&state.goals)
    );

    let top = dashboard::leaderboard(&state.tasks, &state.members, 3);
    if !top.is_empty() {
        println!("Top performers:");
        for (rank, entry) in top.iter().enumerate() {
            println!("  {}. {} ({} done)", rank + 1, entry.member.name, entry.completed);
        }
    }
    let recent = dashboard::recent_completions(&state.tasks, 5);
    if !recent.is_empty() {
        println!("Recently completed:");
        for task in recent {
            println!("  - {}", task.title);
        }
    }
    Ok(())
}

fn report_goal_change(workspace: &Workspace, changes: Changes) {
    if !changes.goals {
        return;
    }
    for goal in &workspace.state().goals {
        tracing::debug!(goal_id = %goal.id, progress = goal.progress, "Goal progress");
    }
    println!("Objective progress updated");
}

/// First eight characters of an id
pub(crate) fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::Assistant;
    use crate::config::ModelConfig;
    use crate::provider::{
        CompletionRequest, CompletionResponse, GeneratedImage, ImageRequest, Provider,
    };
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Painter(Option<&'static str>);

    #[async_trait]
    impl Provider for Painter {
        fn name(&self) -> &str {
            "painter"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
            anyhow::bail!("text is not supported")
        }

        async fn generate_image(&self, _request: ImageRequest) -> Result<Option<GeneratedImage>> {
            Ok(self.0.map(|data| GeneratedImage {
                mime_type: "image/jpeg".to_string(),
                data: data.to_string(),
            }))
        }
    }

    async fn board_with_task(image: Option<&'static str>) -> (Workspace, String) {
        let mut workspace = Workspace::open(Arc::new(MemoryStore::new()))
            .await
            .unwrap()
            .with_assistant(Assistant::new(Arc::new(Painter(image)), ModelConfig::default()));
        let task = Task::new("Launch campaign");
        let id = task.id.clone();
        workspace.save_task(task).await.unwrap();
        (workspace, id)
    }

    fn edit(id: &str) -> TaskEditArgs {
        TaskEditArgs {
            id: id.to_string(),
            ..TaskEditArgs::default()
        }
    }

    #[tokio::test]
    async fn test_edit_generates_cover_image() {
        let (mut workspace, id) = board_with_task(Some("/9j/4AAQ")).await;
        let args = TaskEditArgs {
            image_prompt: Some("crowd at a launch party".to_string()),
            ..edit(&id)
        };
        edit_task(&mut workspace, args).await.unwrap();
        assert_eq!(
            workspace.state().task(&id).unwrap().image_url.as_deref(),
            Some("data:image/jpeg;base64,/9j/4AAQ")
        );
    }

    #[tokio::test]
    async fn test_failed_image_keeps_other_edits() {
        let (mut workspace, id) = board_with_task(None).await;
        let args = TaskEditArgs {
            title: Some("Launch campaign v2".to_string()),
            image_prompt: Some("anything".to_string()),
            ..edit(&id)
        };
        edit_task(&mut workspace, args).await.unwrap();
        let task = workspace.state().task(&id).unwrap();
        assert_eq!(task.title, "Launch campaign v2");
        assert_eq!(task.image_url, None);
    }

    #[tokio::test]
    async fn test_image_url_set_and_cleared() {
        let (mut workspace, id) = board_with_task(None).await;
        let set = TaskEditArgs {
            image_url: Some("https://example.com/cover.png".to_string()),
            ..edit(&id)
        };
        edit_task(&mut workspace, set).await.unwrap();
        assert!(workspace.state().task(&id).unwrap().image_url.is_some());

        let clear = TaskEditArgs {
            image_url: Some(String::new()),
            ..edit(&id)
        };
        edit_task(&mut workspace, clear).await.unwrap();
        assert_eq!(workspace.state().task(&id).unwrap().image_url, None);
    }
}
