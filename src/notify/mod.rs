//! Due-date reminders
//!
//! A periodic check marks tasks whose assignee should be reminded about an
//! upcoming or missed due date. The check itself is pure
//! ([`check_due_tasks`]); [`poller`] wires it to the store and a timer.

pub mod poller;

pub use poller::{
    LogNotifier, NotificationCheck, NotificationPoller, Notifier, StoreNotificationCheck,
};

use crate::error::ValidationError;
use crate::task::{NotificationStatus, Task};
use crate::team::TeamMember;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Persisted reminder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Official account id of the messaging channel
    #[serde(default)]
    pub oa_id: String,

    /// Minutes between checks
    #[serde(default = "default_check_interval")]
    pub check_interval: u32,

    #[serde(default = "default_true")]
    pub notify_upcoming: bool,

    #[serde(default = "default_true")]
    pub notify_overdue: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            oa_id: String::new(),
            check_interval: default_check_interval(),
            notify_upcoming: true,
            notify_overdue: true,
        }
    }
}

impl NotificationSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.check_interval == 0 {
            return Err(ValidationError::InvalidCheckInterval);
        }
        Ok(())
    }

    /// Check period as a std duration
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.check_interval.max(1)) * 60)
    }
}

fn default_check_interval() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Kind of reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Upcoming,
    Overdue,
}

/// One reminder produced by a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub task_id: String,
    pub task_title: String,
    pub member_name: String,
    pub phone: String,
    pub kind: NotificationKind,
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            NotificationKind::Overdue => write!(
                f,
                "[to {}] OVERDUE: \"{}\"",
                self.member_name, self.task_title
            ),
            NotificationKind::Upcoming => write!(
                f,
                "[to {}] REMINDER: \"{}\" is due soon",
                self.member_name, self.task_title
            ),
        }
    }
}

/// Result of one check
#[derive(Debug, Clone, Default)]
pub struct CheckOutcome {
    /// Full task list with reminder fields updated
    pub tasks: Vec<Task>,
    pub notifications: Vec<Notification>,
}

impl CheckOutcome {
    pub fn changed(&self) -> bool {
        !self.notifications.is_empty()
    }
}

/// Mark tasks that need a reminder at `now`.
///
/// Done tasks, tasks without a due date or assignee, and tasks whose assignee
/// has no phone number are skipped. Each reminder kind is sent once per task
/// until its status changes.
pub fn check_due_tasks(
    tasks: &[Task],
    members: &[TeamMember],
    settings: &NotificationSettings,
    now: DateTime<Utc>,
) -> CheckOutcome {
    if !settings.enabled {
        return CheckOutcome {
            tasks: tasks.to_vec(),
            notifications: Vec::new(),
        };
    }

    let mut notifications = Vec::new();
    let tasks = tasks
        .iter()
        .map(|task| {
            let (Some(due), Some(assignee)) = (task.due_date, task.assignee.as_deref()) else {
                return task.clone();
            };
            if task.is_done() {
                return task.clone();
            }
            let Some(member) = members
                .iter()
                .find(|m| m.name == assignee)
                .filter(|m| m.has_phone())
            else {
                return task.clone();
            };

            let remaining = due - now;
            let kind = if remaining < Duration::zero() {
                (settings.notify_overdue
                    && task.notification_status != Some(NotificationStatus::Overdue))
                .then_some(NotificationKind::Overdue)
            } else if remaining > Duration::zero()
                && remaining < Duration::hours(crate::task::DUE_SOON_HOURS)
            {
                (settings.notify_upcoming
                    && task.notification_status != Some(NotificationStatus::Upcoming))
                .then_some(NotificationKind::Upcoming)
            } else {
                None
            };

            let Some(kind) = kind else {
                return task.clone();
            };

            notifications.push(Notification {
                task_id: task.id.clone(),
                task_title: task.title.clone(),
                member_name: member.name.clone(),
                phone: member.phone.clone().unwrap_or_default(),
                kind,
            });
            Task {
                notification_status: Some(match kind {
                    NotificationKind::Upcoming => NotificationStatus::Upcoming,
                    NotificationKind::Overdue => NotificationStatus::Overdue,
                }),
                last_notification_sent: Some(now),
                ..task.clone()
            }
        })
        .collect();

    CheckOutcome {
        tasks,
        notifications,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    fn enabled() -> NotificationSettings {
        NotificationSettings {
            enabled: true,
            ..Default::default()
        }
    }

    fn roster() -> Vec<TeamMember> {
        vec![
            TeamMember::new("Alice").with_phone("0901000111"),
            TeamMember::new("Bob"),
        ]
    }

    #[test]
    fn test_disabled_settings_change_nothing() {
        let now = Utc::now();
        let tasks = vec![Task::new("late")
            .with_assignee("Alice")
            .with_due_date(now - Duration::hours(2))];
        let outcome = check_due_tasks(&tasks, &roster(), &NotificationSettings::default(), now);
        assert!(!outcome.changed());
        assert_eq!(outcome.tasks, tasks);
    }

    #[test]
    fn test_overdue_and_upcoming_are_marked_once() {
        let now = Utc::now();
        let tasks = vec![
            Task::new("late")
                .with_assignee("Alice")
                .with_due_date(now - Duration::hours(2)),
            Task::new("soon")
                .with_assignee("Alice")
                .with_due_date(now + Duration::hours(2)),
            Task::new("later")
                .with_assignee("Alice")
                .with_due_date(now + Duration::days(4)),
        ];

        let outcome = check_due_tasks(&tasks, &roster(), &enabled(), now);
        assert_eq!(outcome.notifications.len(), 2);
        assert_eq!(outcome.notifications[0].kind, NotificationKind::Overdue);
        assert_eq!(outcome.notifications[1].kind, NotificationKind::Upcoming);
        assert_eq!(
            outcome.tasks[0].notification_status,
            Some(NotificationStatus::Overdue)
        );
        assert_eq!(outcome.tasks[0].last_notification_sent, Some(now));
        assert_eq!(outcome.tasks[2], tasks[2]);

        // A second run with the marked tasks sends nothing new
        let again = check_due_tasks(&outcome.tasks, &roster(), &enabled(), now);
        assert!(!again.changed());
    }

    #[test]
    fn test_skips_done_unassigned_and_unreachable() {
        let now = Utc::now();
        let due = now - Duration::hours(1);
        let tasks = vec![
            Task::new("done")
                .with_assignee("Alice")
                .with_status(TaskStatus::Done)
                .with_due_date(due),
            Task::new("nobody").with_due_date(due),
            Task::new("no phone").with_assignee("Bob").with_due_date(due),
            Task::new("stranger").with_assignee("Carol").with_due_date(due),
            Task::new("no due date").with_assignee("Alice"),
        ];
        let outcome = check_due_tasks(&tasks, &roster(), &enabled(), now);
        assert!(!outcome.changed());
    }

    #[test]
    fn test_respects_kind_toggles() {
        let now = Utc::now();
        let tasks = vec![Task::new("late")
            .with_assignee("Alice")
            .with_due_date(now - Duration::hours(2))];
        let settings = NotificationSettings {
            notify_overdue: false,
            ..enabled()
        };
        assert!(!check_due_tasks(&tasks, &roster(), &settings, now).changed());
    }

    #[test]
    fn test_upcoming_task_that_becomes_overdue_is_notified_again() {
        let now = Utc::now();
        let mut task = Task::new("slipping")
            .with_assignee("Alice")
            .with_due_date(now - Duration::minutes(5));
        task.notification_status = Some(NotificationStatus::Upcoming);
        let outcome = check_due_tasks(&[task], &roster(), &enabled(), now);
        assert_eq!(outcome.notifications[0].kind, NotificationKind::Overdue);
    }

    #[test]
    fn test_settings_defaults_and_wire_format() {
        let settings: NotificationSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, NotificationSettings::default());
        assert_eq!(settings.period(), std::time::Duration::from_secs(60));

        let value = serde_json::to_value(enabled()).unwrap();
        assert_eq!(value["checkInterval"], 1);
        assert_eq!(value["oaId"], "");

        let bad = NotificationSettings {
            check_interval: 0,
            ..Default::default()
        };
        assert_eq!(bad.validate(), Err(ValidationError::InvalidCheckInterval));
    }
}
