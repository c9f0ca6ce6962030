//! Backup, clear and reminder commands

use super::{ClearArgs, ExportArgs, ImportArgs, NotifyCommand, NotifySettingsArgs};
use crate::notify::{LogNotifier, StoreNotificationCheck};
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

pub async fn export(workspace: &Workspace, args: ExportArgs) -> Result<()> {
    let now = Utc::now();
    let json = workspace.export(now).to_json()?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write backup to {}", path.display()))?;
            println!("Backup written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub async fn import(workspace: &mut Workspace, args: ImportArgs) -> Result<()> {
    let json = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let summary = workspace
        .import(&json)
        .await
        .with_context(|| format!("Failed to import {}", args.file.display()))?;
    println!("Imported {summary}");
    Ok(())
}

pub async fn clear(workspace: &mut Workspace, args: ClearArgs) -> Result<()> {
    if !args.yes {
        anyhow::bail!("This deletes all tasks, objectives, members and chat history. Re-run with --yes to confirm");
    }
    workspace.clear_data().await?;
    println!("All data cleared (reminder settings kept)");
    Ok(())
}

pub async fn notify(workspace: &mut Workspace, command: NotifyCommand) -> Result<()> {
    match command {
        NotifyCommand::Settings(args) => settings(workspace, args).await,
        NotifyCommand::Check => {
            let check = StoreNotificationCheck::new(workspace.store(), Arc::new(LogNotifier));
            match check.run_at(Utc::now()).await? {
                Some(tasks) => {
                    let reminded = tasks
                        .iter()
                        .filter(|t| t.last_notification_sent.is_some())
                        .count();
                    workspace.adopt_checked_tasks(tasks);
                    println!("Reminders sent; {reminded} tasks have been reminded so far");
                }
                None => println!("No reminders due"),
            }
            Ok(())
        }
    }
}

async fn settings(workspace: &mut Workspace, args: NotifySettingsArgs) -> Result<()> {
    let mut settings = workspace.state().settings.clone();
    let mut touched = false;

    if args.enable || args.disable {
        settings.enabled = args.enable;
        touched = true;
    }
    if let Some(oa_id) = args.oa_id {
        settings.oa_id = oa_id;
        touched = true;
    }
    if let Some(interval) = args.interval {
        settings.check_interval = interval;
        touched = true;
    }
    if let Some(upcoming) = args.upcoming {
        settings.notify_upcoming = upcoming;
        touched = true;
    }
    if let Some(overdue) = args.overdue {
        settings.notify_overdue = overdue;
        touched = true;
    }

    if touched {
        workspace.set_settings(settings).await?;
    }

    let settings = &workspace.state().settings;
    println!("enabled:          {}", settings.enabled);
    println!("oa id:            {}", settings.oa_id);
    println!("check interval:   {} min", settings.check_interval);
    println!("notify upcoming:  {}", settings.notify_upcoming);
    println!("notify overdue:   {}", settings.notify_overdue);
    Ok(())
}
