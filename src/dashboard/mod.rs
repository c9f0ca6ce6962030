//! Board statistics and team overview

use crate::okr::Goal;
use crate::task::{Priority, Task, TaskStatus};
use crate::team::TeamMember;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardStats {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_priority: BTreeMap<&'static str, usize>,
    pub done: usize,
    pub in_progress: usize,
    /// HIGH or URGENT
    pub high_priority: usize,
    /// URGENT and not yet done
    pub urgent_open: usize,
    pub overdue: usize,
    pub due_soon: usize,
    /// Percent of tasks done, rounded
    pub completion_rate: u8,
}

impl BoardStats {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let mut stats = Self {
            total: tasks.len(),
            by_status: TaskStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect(),
            by_priority: Priority::ALL.iter().map(|p| (p.as_str(), 0)).collect(),
            ..Self::default()
        };

        for task in tasks {
            *stats.by_status.entry(task.status.as_str()).or_default() += 1;
            *stats.by_priority.entry(task.priority.as_str()).or_default() += 1;
            match task.status {
                TaskStatus::Done => stats.done += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Todo | TaskStatus::Review => {}
            }
            if task.priority.is_high() {
                stats.high_priority += 1;
            }
            if task.priority == Priority::Urgent && !task.is_done() {
                stats.urgent_open += 1;
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            } else if task.is_due_soon(now) {
                stats.due_soon += 1;
            }
        }

        stats.completion_rate = percent(stats.done, stats.total);
        stats
    }

    pub fn open(&self) -> usize {
        self.total - self.done
    }
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u8
}

/// Rounded mean of goal progress, 0 with no goals
pub fn overall_goal_progress(goals: &[Goal]) -> u8 {
    if goals.is_empty() {
        return 0;
    }
    let sum: u32 = goals.iter().map(|g| u32::from(g.progress)).sum();
    (f64::from(sum) / goals.len() as f64).round() as u8
}

/// A leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry<'a> {
    pub member: &'a TeamMember,
    pub completed: usize,
}

/// Members ranked by completed tasks, roster order on ties
pub fn leaderboard<'a>(
    tasks: &[Task],
    members: &'a [TeamMember],
    limit: usize,
) -> Vec<LeaderboardEntry<'a>> {
    let mut entries: Vec<_> = members
        .iter()
        .map(|member| LeaderboardEntry {
            member,
            completed: tasks
                .iter()
                .filter(|t| t.is_done() && t.assignee.as_deref() == Some(member.name.as_str()))
                .count(),
        })
        .collect();
    // sort_by is stable
    entries.sort_by(|a, b| b.completed.cmp(&a.completed));
    entries.truncate(limit);
    entries
}

/// Most recently due DONE tasks; tasks without a due date sort last
pub fn recent_completions(tasks: &[Task], limit: usize) -> Vec<&Task> {
    let mut done: Vec<&Task> = tasks.iter().filter(|t| t.is_done()).collect();
    done.sort_by(|a, b| b.due_date.cmp(&a.due_date));
    done.truncate(limit);
    done
}
