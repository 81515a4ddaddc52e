//! Error types for caseflow.
//!
//! Authorization, validation and capacity failures are all raised before
//! any mutation; callers never see partial state on these paths.

use thiserror::Error;

use crate::model::{CaseStatus, Role};

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: CaseStatus, to: CaseStatus },

    #[error("forbidden: role {role} may not {action}")]
    Forbidden { role: Role, action: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("capacity exceeded: {active} active of {max} allowed")]
    CapacityExceeded { active: i32, max: i32 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
