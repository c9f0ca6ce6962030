//! Domain validation errors

use thiserror::Error;

/// Rejected input on a create/edit operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("objective title cannot be empty")]
    EmptyGoalTitle,

    #[error("key result title cannot be empty")]
    EmptyKeyResultTitle,

    #[error("duplicate key result id `{0}` in objective")]
    DuplicateKeyResult(String),

    #[error("task title cannot be empty")]
    EmptyTaskTitle,

    #[error("member name cannot be empty")]
    EmptyMemberName,

    #[error("check interval must be at least one minute")]
    InvalidCheckInterval,
}
