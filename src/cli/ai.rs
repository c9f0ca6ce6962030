//! AI assistant commands

use super::{AiCommand, board::short, resolve_id};
use crate::task::Subtask;
use crate::workspace::{AI_UNAVAILABLE, Workspace};
use anyhow::Result;

pub async fn execute(mut workspace: Workspace, command: AiCommand) -> Result<()> {
    match command {
        AiCommand::Strategy => {
            println!("{}", workspace.run_strategy_analysis().await);
        }
        AiCommand::Workflow => {
            println!("{}", workspace.run_workflow_analysis().await);
        }
        AiCommand::Chat { message } => {
            let reply = workspace.send_chat_message(&message.join(" ")).await;
            println!("{}", reply.text);
        }
        AiCommand::ClearChat => {
            workspace.clear_chat().await?;
            println!("Chat history cleared");
        }
        AiCommand::Subtasks { id, apply } => {
            let Some(assistant) = workspace.assistant() else {
                println!("{AI_UNAVAILABLE}");
                return Ok(());
            };
            let mut task =
                resolve_id(&workspace.state().tasks, &id, |t| t.id.as_str(), "task")?.clone();
            let suggestions = assistant
                .suggest_subtasks(&task.title, &task.description)
                .await;
            if suggestions.is_empty() {
                println!("No suggestions");
                return Ok(());
            }
            for title in &suggestions {
                println!("- {title}");
            }
            if apply {
                task.subtasks
                    .extend(suggestions.into_iter().map(Subtask::new));
                let id = task.id.clone();
                workspace.save_task(task).await?;
                println!("Added to task {}", short(&id));
            }
        }
        AiCommand::Describe { id, apply } => {
            let Some(assistant) = workspace.assistant() else {
                println!("{AI_UNAVAILABLE}");
                return Ok(());
            };
            let mut task =
                resolve_id(&workspace.state().tasks, &id, |t| t.id.as_str(), "task")?.clone();
            let description = assistant.suggest_description(&task.title).await;
            if description.is_empty() {
                println!("No suggestion");
                return Ok(());
            }
            println!("{description}");
            if apply {
                task.description = description;
                let id = task.id.clone();
                workspace.save_task(task).await?;
                println!("Updated task {}", short(&id));
            }
        }
    }
    Ok(())
}
