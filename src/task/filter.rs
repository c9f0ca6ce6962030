//! Board search and filters

use super::{Priority, Task, TaskStatus};
use chrono::{DateTime, Duration, Utc};

/// Conjunctive task filter; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Case-insensitive substring over title, description, tags and assignee
    pub search: Option<String>,
    /// Exact assignee name
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    /// Excludes tasks without a due date or due before this instant
    pub due_from: Option<DateTime<Utc>>,
    /// Day bound: the whole day starting at this instant is included
    pub due_until: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let hit = task.title.to_lowercase().contains(&term)
                || task.description.to_lowercase().contains(&term)
                || task.tags.iter().any(|tag| tag.to_lowercase().contains(&term))
                || task
                    .assignee
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        if let Some(assignee) = self.assignee.as_deref().filter(|a| !a.is_empty())
            && task.assignee.as_deref() != Some(assignee)
        {
            return false;
        }

        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }

        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }

        if let Some(from) = self.due_from {
            match task.due_date {
                Some(due) if due >= from => {}
                _ => return false,
            }
        }

        if let Some(until) = self.due_until {
            let end = until + Duration::days(1);
            match task.due_date {
                Some(due) if due < end => {}
                _ => return false,
            }
        }

        true
    }

    /// Apply the filter, preserving board order
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }

    /// Number of filters currently set
    pub fn active_count(&self) -> usize {
        [
            self.search.as_deref().is_some_and(|s| !s.is_empty()),
            self.assignee.as_deref().is_some_and(|s| !s.is_empty()),
            self.priority.is_some(),
            self.status.is_some(),
            self.due_from.is_some(),
            self.due_until.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}
