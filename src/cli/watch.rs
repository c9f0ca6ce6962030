//! Long-running reminder loop

use crate::notify::{LogNotifier, NotificationPoller, StoreNotificationCheck};
use crate::workspace::Workspace;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn execute(mut workspace: Workspace) -> Result<()> {
    let settings = workspace.state().settings.clone();
    let check = Arc::new(StoreNotificationCheck::new(
        workspace.store(),
        Arc::new(LogNotifier),
    ));
    let (tx, mut rx) = mpsc::channel(8);

    let Some(poller) = NotificationPoller::spawn(check, &settings, tx) else {
        println!("Reminders are disabled. Enable them with: planai notify settings --enable");
        return Ok(());
    };
    println!(
        "Checking for due tasks every {} min. Press Ctrl+C to stop.",
        settings.check_interval
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(tasks) = rx.recv() => {
                let changes = workspace.adopt_checked_tasks(tasks);
                tracing::debug!(collections = ?changes.names(), "Reminder results adopted");
            }
            _ = &mut shutdown => break,
        }
    }

    poller.stop();
    tracing::info!("Reminder watch stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
