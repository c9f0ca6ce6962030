//! Periodic reminder checks
//!
//! The poller only owns a timer. Each tick spawns a [`NotificationCheck`]
//! without waiting for the previous one to finish, and forwards updated task
//! lists over a channel for the workspace to adopt wholesale.

use super::{Notification, NotificationSettings, check_due_tasks};
use crate::store::Store;
use crate::task::Task;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Delay before the first check after the poller starts
pub const INITIAL_DELAY: Duration = Duration::from_secs(5);

/// One reminder pass
#[async_trait]
pub trait NotificationCheck: Send + Sync {
    /// Updated task list when at least one reminder went out, `None` otherwise
    async fn run(&self) -> Result<Option<Vec<Task>>>;
}

/// Delivery channel for reminders
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Writes reminders to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            task_id = %notification.task_id,
            member = %notification.member_name,
            kind = ?notification.kind,
            "{notification}"
        );
        Ok(())
    }
}

/// Check that reads from and writes back to a [`Store`]
pub struct StoreNotificationCheck {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl StoreNotificationCheck {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Run the check as of `now`
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<Option<Vec<Task>>> {
        let snapshot = self
            .store
            .load()
            .await
            .context("Failed to load data for reminder check")?;
        let outcome = check_due_tasks(&snapshot.tasks, &snapshot.members, &snapshot.settings, now);
        if !outcome.changed() {
            return Ok(None);
        }

        self.store
            .save_tasks(&outcome.tasks)
            .await
            .context("Failed to save reminder state")?;

        for notification in &outcome.notifications {
            if let Err(e) = self.notifier.send(notification).await {
                tracing::warn!(
                    task_id = %notification.task_id,
                    error = %e,
                    "Failed to deliver reminder"
                );
            }
        }

        tracing::info!(
            count = outcome.notifications.len(),
            "Reminder check sent notifications"
        );
        Ok(Some(outcome.tasks))
    }
}

#[async_trait]
impl NotificationCheck for StoreNotificationCheck {
    async fn run(&self) -> Result<Option<Vec<Task>>> {
        self.run_at(Utc::now()).await
    }
}

/// Background timer driving a [`NotificationCheck`]. Dropping it stops the timer.
#[derive(Debug)]
pub struct NotificationPoller {
    handle: JoinHandle<()>,
}

impl NotificationPoller {
    /// Start polling when `settings` are enabled
    pub fn spawn(
        check: Arc<dyn NotificationCheck>,
        settings: &NotificationSettings,
        tx: mpsc::Sender<Vec<Task>>,
    ) -> Option<Self> {
        if !settings.enabled {
            tracing::debug!("Reminders disabled, poller not started");
            return None;
        }
        Some(Self::spawn_with(check, INITIAL_DELAY, settings.period(), tx))
    }

    /// Start polling with an explicit schedule
    pub fn spawn_with(
        check: Arc<dyn NotificationCheck>,
        initial_delay: Duration,
        period: Duration,
        tx: mpsc::Sender<Vec<Task>>,
    ) -> Self {
        tracing::info!(
            initial_delay_secs = initial_delay.as_secs(),
            period_secs = period.as_secs(),
            "Starting reminder poller"
        );
        let handle = tokio::spawn(poll_loop(check, initial_delay, period, tx));
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the timer; checks already in flight run to completion
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn poll_loop(
    check: Arc<dyn NotificationCheck>,
    initial_delay: Duration,
    period: Duration,
    tx: mpsc::Sender<Vec<Task>>,
) {
    let start = Instant::now();
    let mut ticker = tokio::time::interval_at(start + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::time::sleep_until(start + initial_delay).await;
    spawn_check(&check, &tx);

    loop {
        ticker.tick().await;
        if tx.is_closed() {
            tracing::debug!("Reminder receiver dropped, stopping poller");
            break;
        }
        spawn_check(&check, &tx);
    }
}

fn spawn_check(check: &Arc<dyn NotificationCheck>, tx: &mpsc::Sender<Vec<Task>>) {
    let check = Arc::clone(check);
    let tx = tx.clone();
    tokio::spawn(async move {
        match check.run().await {
            Ok(Some(tasks)) => {
                if tx.send(tasks).await.is_err() {
                    tracing::debug!("Reminder result dropped, receiver closed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Reminder check failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;
    use crate::store::{MemoryStore, Snapshot};
    use crate::team::TeamMember;
    use chrono::Duration as ChronoDuration;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: &Notification) -> Result<()> {
            self.sent.lock().push(notification.clone());
            Ok(())
        }
    }

    /// Counts runs and always reports one changed task
    #[derive(Default)]
    struct CountingCheck {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl NotificationCheck for CountingCheck {
        async fn run(&self) -> Result<Option<Vec<Task>>> {
            let n = self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(Some(vec![Task::new(format!("run {n}"))]))
        }
    }

    fn enabled() -> NotificationSettings {
        NotificationSettings {
            enabled: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_store_check_saves_and_notifies() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::with_snapshot(Snapshot {
            tasks: vec![
                Task::new("late")
                    .with_assignee("Alice")
                    .with_due_date(now - ChronoDuration::hours(3)),
            ],
            members: vec![TeamMember::new("Alice").with_phone("0901")],
            settings: enabled(),
            ..Default::default()
        }));
        let notifier = Arc::new(RecordingNotifier::default());
        let check = StoreNotificationCheck::new(store.clone(), notifier.clone());

        let updated = check.run_at(now).await.unwrap().expect("tasks changed");
        assert_eq!(store.snapshot().tasks, updated);
        assert_eq!(notifier.sent.lock()[0].kind, NotificationKind::Overdue);

        // Nothing new on the second pass, and nothing is written
        let writes = store.write_count();
        assert!(check.run_at(now).await.unwrap().is_none());
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_store_check_surfaces_save_failure() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::with_snapshot(Snapshot {
            tasks: vec![
                Task::new("late")
                    .with_assignee("Alice")
                    .with_due_date(now - ChronoDuration::hours(3)),
            ],
            members: vec![TeamMember::new("Alice").with_phone("0901")],
            settings: enabled(),
            ..Default::default()
        }));
        store.set_fail_writes(true);
        let notifier = Arc::new(RecordingNotifier::default());
        let check = StoreNotificationCheck::new(store, notifier.clone());
        assert!(check.run_at(now).await.is_err());
        assert!(notifier.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_settings_do_not_start() {
        let (tx, _rx) = mpsc::channel(1);
        let check = Arc::new(CountingCheck::default());
        assert!(NotificationPoller::spawn(check, &NotificationSettings::default(), tx).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_check_after_delay_then_every_period() {
        let (tx, mut rx) = mpsc::channel(4);
        let check = Arc::new(CountingCheck::default());
        let start = Instant::now();
        let poller = NotificationPoller::spawn(check.clone(), &enabled(), tx).unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first[0].title, "run 0");
        assert_eq!(start.elapsed(), INITIAL_DELAY);

        let second = rx.recv().await.unwrap();
        assert_eq!(second[0].title, "run 1");
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_timer() {
        let (tx, _rx) = mpsc::channel(4);
        let check = Arc::new(CountingCheck::default());
        let poller = NotificationPoller::spawn_with(
            check.clone(),
            Duration::from_secs(5),
            Duration::from_secs(60),
            tx,
        );
        poller.stop();

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(check.runs.load(Ordering::SeqCst), 0);
    }
}
