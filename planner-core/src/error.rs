use thiserror::Error;

use crate::feasibility::Blocker;

/// Failures at the edges of the planner: loading data, reading a snapshot,
/// resolving names, replaying a plan. Infeasibility inside the search is a
/// [`Blocker`], not an error.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("entity type defined twice: {0}")]
    DuplicateEntity(String),

    #[error("invalid entity type {name}: {reason}")]
    InvalidEntity { name: String, reason: String },

    #[error("prerequisites of {0} form a cycle")]
    PrerequisiteCycle(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("plan step {step} ({unit}) cannot start: {reason}")]
    ReplayInfeasible {
        step: usize,
        unit: String,
        blocker: Blocker,
        reason: String,
    },

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}
