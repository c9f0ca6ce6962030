//! Task-to-key-result linkage
//!
//! A linked task adds its `contribution_value` to the key result's
//! `current_value` for as long as it is DONE. Every committed task mutation
//! is translated into one signed delta here. Calling [`apply_task_transition`]
//! twice for the same mutation double-counts; skipping it under-counts.

use super::Goal;
use crate::task::{Task, TaskStatus};
use std::borrow::Cow;

/// Signed change a task transition makes to its linked key result.
///
/// `old` is `None` for a task that did not exist before, which counts as
/// not-DONE.
pub fn contribution_delta(old: Option<&Task>, new: &Task) -> f64 {
    let was_done = old.is_some_and(Task::is_done);
    match (was_done, new.status) {
        (false, TaskStatus::Done) => new.contribution(),
        (true, TaskStatus::Done) => new.contribution() - old.map_or(0.0, Task::contribution),
        (true, TaskStatus::Todo | TaskStatus::InProgress | TaskStatus::Review) => {
            -new.contribution()
        }
        (false, TaskStatus::Todo | TaskStatus::InProgress | TaskStatus::Review) => 0.0,
    }
}

/// Apply one task transition to the goal collection.
///
/// Returns `Cow::Borrowed(goals)` when nothing changes: the task is unlinked,
/// the delta is zero, or the linked key result exists in no goal. Otherwise
/// returns a new collection in which only the goal owning the key result is
/// replaced, with that key result's value adjusted and progress recomputed.
pub fn apply_task_transition<'a>(
    old: Option<&Task>,
    new: &Task,
    goals: &'a [Goal],
) -> Cow<'a, [Goal]> {
    let Some(key_result_id) = new.linked_key_result() else {
        return Cow::Borrowed(goals);
    };

    let delta = contribution_delta(old, new);
    if delta == 0.0 {
        return Cow::Borrowed(goals);
    }
    if !delta.is_finite() {
        tracing::warn!(task_id = %new.id, delta, "Ignoring non-finite contribution delta");
        return Cow::Borrowed(goals);
    }

    let Some(index) = goals
        .iter()
        .position(|goal| goal.contains_key_result(key_result_id))
    else {
        tracing::debug!(
            task_id = %new.id,
            key_result_id = %key_result_id,
            "Linked key result not found, contribution skipped"
        );
        return Cow::Borrowed(goals);
    };

    let updated = goals[index].with_contribution(key_result_id, delta);
    tracing::debug!(
        task_id = %new.id,
        goal_id = %updated.id,
        key_result_id = %key_result_id,
        delta,
        progress = updated.progress,
        "Applied task contribution"
    );

    let mut next = goals.to_vec();
    next[index] = updated;
    Cow::Owned(next)
}

/// Take back a task's contribution before it is deleted.
///
/// A DONE linked task is run through a synthetic DONE -> TODO transition;
/// any other task leaves the goals as they are.
pub fn reverse_for_deletion<'a>(task: &Task, goals: &'a [Goal]) -> Cow<'a, [Goal]> {
    if !task.is_done() || task.linked_key_result().is_none() {
        return Cow::Borrowed(goals);
    }
    let reset = Task {
        status: TaskStatus::Todo,
        ..task.clone()
    };
    apply_task_transition(Some(task), &reset, goals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::okr::KeyResult;
    use chrono::Utc;

    fn goals() -> Vec<Goal> {
        vec![
            Goal::new("Sales", "", Utc::now())
                .with_key_result(KeyResult::new("Revenue", 5.0, "bn").with_id("kr1").with_current(2.0))
                .with_key_result(KeyResult::new("Agents", 20.0, "").with_id("kr2").with_current(12.0)),
            Goal::new("Ops", "", Utc::now())
                .with_key_result(KeyResult::new("Training", 100.0, "%").with_id("kr3").with_current(80.0)),
        ]
    }

    fn linked(status: TaskStatus, value: f64) -> Task {
        Task::new("Close deal").with_status(status).with_link("kr1", value)
    }

    #[test]
    fn test_delta_case_split() {
        let todo = linked(TaskStatus::Todo, 3.0);
        let done = linked(TaskStatus::Done, 3.0);
        let done_more = linked(TaskStatus::Done, 5.0);
        let review = linked(TaskStatus::Review, 9.0);

        assert_eq!(contribution_delta(Some(&todo), &done), 3.0);
        assert_eq!(contribution_delta(None, &done), 3.0);
        assert_eq!(contribution_delta(Some(&done), &todo), -3.0);
        assert_eq!(contribution_delta(Some(&done), &done_more), 2.0);
        assert_eq!(contribution_delta(Some(&todo), &review), 0.0);
        assert_eq!(contribution_delta(None, &todo), 0.0);
    }

    #[test]
    fn test_missing_contribution_counts_as_zero() {
        let mut task = linked(TaskStatus::Done, 0.0);
        task.contribution_value = None;
        assert_eq!(contribution_delta(None, &task), 0.0);
    }

    #[test]
    fn test_unlinked_task_is_noop() {
        let goals = goals();
        let task = Task::new("plain").with_status(TaskStatus::Done);
        let result = apply_task_transition(None, &task, &goals);
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_done_transition_updates_key_result_and_progress() {
        let goals = goals();
        let before = linked(TaskStatus::Todo, 1.0);
        let after = linked(TaskStatus::Done, 1.0);

        let result = apply_task_transition(Some(&before), &after, &goals);
        let goal = &result[0];
        assert_eq!(goal.key_result("kr1").unwrap().current_value, 3.0);
        // (60 + 60) / 2
        assert_eq!(goal.progress, 60);
        assert_eq!(result[1], goals[1]);
        assert_eq!(goal.key_results[1], goals[0].key_results[1]);
    }

    #[test]
    fn test_dangling_link_is_noop() {
        let goals = goals();
        let task = Task::new("orphan")
            .with_status(TaskStatus::Done)
            .with_link("kr-99", 4.0);
        let result = apply_task_transition(None, &task, &goals);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(&*result, goals.as_slice());
    }

    #[test]
    fn test_non_finite_contribution_is_ignored() {
        let goals = goals();
        let task = linked(TaskStatus::Done, f64::NAN);
        let result = apply_task_transition(None, &task, &goals);
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_reverse_for_deletion() {
        let goals = goals();
        let done = linked(TaskStatus::Done, 1.5);
        let result = reverse_for_deletion(&done, &goals);
        assert_eq!(result[0].key_result("kr1").unwrap().current_value, 0.5);

        let todo = linked(TaskStatus::Todo, 1.5);
        assert!(matches!(reverse_for_deletion(&todo, &goals), Cow::Borrowed(_)));
    }
}
