//! In-memory application state
//!
//! Every mutation is a method on [`WorkspaceState`] that returns which
//! collections it changed. Task mutations call the linkage engine exactly
//! once, with the task as it was before the mutation.

use crate::assistant::{ChatMessage, GREETING};
use crate::error::ValidationError;
use crate::notify::NotificationSettings;
use crate::okr::{Goal, KeyResult, apply_task_transition, reverse_for_deletion};
use crate::store::Snapshot;
use crate::task::{Task, TaskStatus};
use crate::team::TeamMember;
use std::borrow::Cow;
use std::ops::{BitOr, BitOrAssign};

/// Collections touched by a mutation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub tasks: bool,
    pub goals: bool,
    pub members: bool,
    pub settings: bool,
    pub chat: bool,
    pub strategy: bool,
    pub workflow: bool,
}

impl Changes {
    pub const NONE: Changes = Changes {
        tasks: false,
        goals: false,
        members: false,
        settings: false,
        chat: false,
        strategy: false,
        workflow: false,
    };

    pub const TASKS: Changes = Changes {
        tasks: true,
        ..Changes::NONE
    };

    pub const GOALS: Changes = Changes {
        goals: true,
        ..Changes::NONE
    };

    pub const MEMBERS: Changes = Changes {
        members: true,
        ..Changes::NONE
    };

    pub const SETTINGS: Changes = Changes {
        settings: true,
        ..Changes::NONE
    };

    pub const CHAT: Changes = Changes {
        chat: true,
        ..Changes::NONE
    };

    pub const STRATEGY: Changes = Changes {
        strategy: true,
        ..Changes::NONE
    };

    pub const WORKFLOW: Changes = Changes {
        workflow: true,
        ..Changes::NONE
    };

    pub fn is_empty(&self) -> bool {
        *self == Changes::NONE
    }

    /// Names of the changed collections, for logs and messages
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.tasks, "tasks"),
            (self.goals, "goals"),
            (self.members, "members"),
            (self.settings, "settings"),
            (self.chat, "chat"),
            (self.strategy, "strategy"),
            (self.workflow, "workflow"),
        ]
        .into_iter()
        .filter_map(|(changed, name)| changed.then_some(name))
        .collect()
    }
}

impl BitOr for Changes {
    type Output = Changes;

    fn bitor(self, rhs: Changes) -> Changes {
        Changes {
            tasks: self.tasks || rhs.tasks,
            goals: self.goals || rhs.goals,
            members: self.members || rhs.members,
            settings: self.settings || rhs.settings,
            chat: self.chat || rhs.chat,
            strategy: self.strategy || rhs.strategy,
            workflow: self.workflow || rhs.workflow,
        }
    }
}

impl BitOrAssign for Changes {
    fn bitor_assign(&mut self, rhs: Changes) {
        *self = *self | rhs;
    }
}

/// Explicitly owned application state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceState {
    pub tasks: Vec<Task>,
    pub goals: Vec<Goal>,
    pub members: Vec<TeamMember>,
    pub settings: NotificationSettings,
    pub chat_history: Vec<ChatMessage>,
    pub last_strategy: String,
    pub last_workflow: String,
}

impl From<Snapshot> for WorkspaceState {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            tasks: snapshot.tasks,
            goals: snapshot.goals,
            members: snapshot.members,
            settings: snapshot.settings,
            chat_history: snapshot.chat_history,
            last_strategy: snapshot.last_strategy,
            last_workflow: snapshot.last_workflow,
        }
    }
}

/// `Some(new goals)` when the engine produced a new collection
fn into_changed(goals: Cow<'_, [Goal]>) -> Option<Vec<Goal>> {
    match goals {
        Cow::Borrowed(_) => None,
        Cow::Owned(goals) => Some(goals),
    }
}

impl WorkspaceState {
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks.clone(),
            goals: self.goals.clone(),
            members: self.members.clone(),
            settings: self.settings.clone(),
            chat_history: self.chat_history.clone(),
            last_strategy: self.last_strategy.clone(),
            last_workflow: self.last_workflow.clone(),
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn goal(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn member(&self, id: &str) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.id == id)
    }

    /// The key result with `id` and the goal owning it (first match)
    pub fn find_key_result(&self, id: &str) -> Option<(&Goal, &KeyResult)> {
        self.goals
            .iter()
            .find_map(|goal| goal.key_result(id).map(|kr| (goal, kr)))
    }

    /// Tasks linked to a key result
    pub fn tasks_linked_to<'a>(&'a self, key_result_id: &'a str) -> impl Iterator<Item = &'a Task> {
        self.tasks
            .iter()
            .filter(move |t| t.linked_key_result() == Some(key_result_id))
    }

    /// Create or replace a task by id
    pub fn save_task(&mut self, task: Task) -> Result<Changes, ValidationError> {
        task.validate()?;

        let index = self.tasks.iter().position(|t| t.id == task.id);
        let old = index.map(|i| &self.tasks[i]);
        let goals = into_changed(apply_task_transition(old, &task, &self.goals));

        let mut changes = Changes::TASKS;
        if let Some(goals) = goals {
            self.goals = goals;
            changes |= Changes::GOALS;
        }

        tracing::debug!(
            task_id = %task.id,
            status = %task.status,
            created = index.is_none(),
            "Task saved"
        );
        match index {
            Some(i) => self.tasks[i] = task,
            None => self.tasks.push(task),
        }
        Ok(changes)
    }

    /// Move a task to another column; unknown ids change nothing
    pub fn move_task(&mut self, id: &str, status: TaskStatus) -> Result<Changes, ValidationError> {
        let Some(task) = self.task(id) else {
            return Ok(Changes::NONE);
        };
        if task.status == status {
            return Ok(Changes::NONE);
        }
        let moved = Task {
            status,
            ..task.clone()
        };
        self.save_task(moved)
    }

    /// Remove a task, first taking back its contribution if it is DONE
    pub fn delete_task(&mut self, id: &str) -> Changes {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            return Changes::NONE;
        };

        let mut changes = Changes::TASKS;
        if let Some(goals) = into_changed(reverse_for_deletion(&self.tasks[index], &self.goals)) {
            self.goals = goals;
            changes |= Changes::GOALS;
        }
        let removed = self.tasks.remove(index);
        tracing::debug!(task_id = %removed.id, "Task deleted");
        changes
    }

    /// Create or replace a goal; progress is always re-derived
    pub fn save_goal(&mut self, mut goal: Goal) -> Result<Changes, ValidationError> {
        goal.validate()?;
        goal.recompute_progress();
        match self.goals.iter().position(|g| g.id == goal.id) {
            Some(i) => self.goals[i] = goal,
            None => self.goals.push(goal),
        }
        Ok(Changes::GOALS)
    }

    /// Remove a goal; tasks linked to its key results keep their now dangling links
    pub fn delete_goal(&mut self, id: &str) -> Changes {
        let before = self.goals.len();
        self.goals.retain(|g| g.id != id);
        if self.goals.len() == before {
            Changes::NONE
        } else {
            Changes::GOALS
        }
    }

    /// Create or replace a member; initials are re-derived
    pub fn save_member(&mut self, member: TeamMember) -> Result<Changes, ValidationError> {
        member.validate()?;
        let member = member.normalize();
        match self.members.iter().position(|m| m.id == member.id) {
            Some(i) => self.members[i] = member,
            None => self.members.push(member),
        }
        Ok(Changes::MEMBERS)
    }

    /// Remove a member; tasks keep the assignee name
    pub fn delete_member(&mut self, id: &str) -> Changes {
        let before = self.members.len();
        self.members.retain(|m| m.id != id);
        if self.members.len() == before {
            Changes::NONE
        } else {
            Changes::MEMBERS
        }
    }

    pub fn set_settings(&mut self, settings: NotificationSettings) -> Result<Changes, ValidationError> {
        settings.validate()?;
        self.settings = settings;
        Ok(Changes::SETTINGS)
    }

    /// Adopt a task list produced elsewhere (the reminder check) as-is
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) -> Changes {
        if self.tasks == tasks {
            return Changes::NONE;
        }
        self.tasks = tasks;
        Changes::TASKS
    }

    pub fn push_chat(&mut self, message: ChatMessage) -> Changes {
        self.chat_history.push(message);
        Changes::CHAT
    }

    /// Reset the conversation to a greeting
    pub fn clear_chat(&mut self) -> Changes {
        self.chat_history = vec![ChatMessage::model(GREETING)];
        Changes::CHAT
    }

    pub fn set_last_strategy(&mut self, analysis: String) -> Changes {
        self.last_strategy = analysis;
        Changes::STRATEGY
    }

    pub fn set_last_workflow(&mut self, analysis: String) -> Changes {
        self.last_workflow = analysis;
        Changes::WORKFLOW
    }

    /// Drop all data except settings
    pub fn clear(&mut self) {
        *self = Self {
            settings: self.settings.clone(),
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn state() -> WorkspaceState {
        WorkspaceState {
            goals: vec![
                Goal::new("Revenue", "", Utc::now())
                    .with_key_result(KeyResult::new("Deals", 20.0, "deals").with_id("kr1").with_current(10.0)),
            ],
            ..Default::default()
        }
    }

    fn deals(state: &WorkspaceState) -> f64 {
        state.find_key_result("kr1").map(|(_, kr)| kr.current_value).unwrap()
    }

    #[test]
    fn test_create_done_task_counts_once() {
        let mut state = state();
        let changes = state
            .save_task(Task::new("Close").with_status(TaskStatus::Done).with_link("kr1", 2.0))
            .unwrap();
        assert_eq!(changes, Changes::TASKS | Changes::GOALS);
        assert_eq!(deals(&state), 12.0);
        assert_eq!(state.goals[0].progress, 60);
    }

    #[test]
    fn test_move_and_delete() {
        let mut state = state();
        let task = Task::new("Close").with_link("kr1", 5.0);
        let id = task.id.clone();
        state.save_task(task).unwrap();
        assert_eq!(deals(&state), 10.0);

        assert_eq!(state.move_task(&id, TaskStatus::Done), Ok(Changes::TASKS | Changes::GOALS));
        assert_eq!(deals(&state), 15.0);
        assert_eq!(state.move_task(&id, TaskStatus::Done), Ok(Changes::NONE));
        assert_eq!(state.move_task("missing", TaskStatus::Done), Ok(Changes::NONE));

        assert_eq!(state.delete_task(&id), Changes::TASKS | Changes::GOALS);
        assert_eq!(deals(&state), 10.0);
        assert!(state.tasks.is_empty());
        assert_eq!(state.delete_task(&id), Changes::NONE);
    }

    #[test]
    fn test_unlinked_task_touches_only_tasks() {
        let mut state = state();
        let goals = state.goals.clone();
        let changes = state
            .save_task(Task::new("Admin").with_status(TaskStatus::Done))
            .unwrap();
        assert_eq!(changes, Changes::TASKS);
        assert_eq!(state.goals, goals);
    }

    #[test]
    fn test_invalid_task_leaves_state() {
        let mut state = state();
        let before = state.clone();
        assert_eq!(
            state.save_task(Task::new(" ").with_status(TaskStatus::Done).with_link("kr1", 1.0)),
            Err(ValidationError::EmptyTaskTitle)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_move_reports_invalid_stored_task() {
        // A hand-edited data file can hold a task that no longer validates
        let mut blank = Task::new("").with_link("kr1", 3.0);
        blank.id = "t-blank".to_string();
        let mut state = WorkspaceState::from(Snapshot {
            tasks: vec![blank],
            goals: state().goals,
            ..Snapshot::default()
        });
        let before = state.clone();

        assert_eq!(
            state.move_task("t-blank", TaskStatus::Done),
            Err(ValidationError::EmptyTaskTitle)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_save_goal_recomputes_progress() {
        let mut state = WorkspaceState::default();
        let mut goal = Goal::new("G", "", Utc::now())
            .with_key_result(KeyResult::new("a", 4.0, "x").with_current(4.0));
        goal.progress = 3;
        state.save_goal(goal).unwrap();
        assert_eq!(state.goals[0].progress, 100);
    }

    #[test]
    fn test_delete_goal_leaves_dangling_links() {
        let mut state = state();
        let task = Task::new("Close").with_status(TaskStatus::Done).with_link("kr1", 2.0);
        let task_id = task.id.clone();
        state.save_task(task).unwrap();
        let goal_id = state.goals[0].id.clone();

        assert_eq!(state.delete_goal(&goal_id), Changes::GOALS);
        assert_eq!(state.task(&task_id).unwrap().linked_key_result(), Some("kr1"));
        // Deleting the task now is a goal no-op
        assert_eq!(state.delete_task(&task_id), Changes::TASKS);
    }

    #[test]
    fn test_member_and_chat() {
        let mut state = WorkspaceState::default();
        let mut member = TeamMember::new("Alice Smith");
        member.initials = "??".to_string();
        state.save_member(member.clone()).unwrap();
        assert_eq!(state.members[0].initials, "AS");
        assert_eq!(state.delete_member(&member.id), Changes::MEMBERS);

        state.push_chat(ChatMessage::user("hi"));
        state.clear_chat();
        assert_eq!(state.chat_history.len(), 1);
        assert_eq!(state.chat_history[0].text, GREETING);
    }

    #[test]
    fn test_changes_names() {
        assert!(Changes::NONE.is_empty());
        assert_eq!((Changes::TASKS | Changes::WORKFLOW).names(), vec!["tasks", "workflow"]);
    }
}
