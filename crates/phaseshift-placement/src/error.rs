//! Planner error types.

use thiserror::Error;

/// Result type alias for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors that stop a plan from being produced. No partial plan is ever
/// returned alongside one of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error(
        "not enough private rooms available, need {needed} participant moves but only have {available} empty rooms"
    )]
    InsufficientCapacity { needed: usize, available: usize },

    #[error("could not find a room for every participant, planned {planned} of {needed} moves")]
    Inconsistent { planned: usize, needed: usize },
}
