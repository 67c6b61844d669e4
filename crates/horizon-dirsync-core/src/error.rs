//! Error types for the Horizon DirSync runtime.

use std::fmt;

/// The main error type for runtime operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Scheduler-related error.
    Scheduler(SchedulerError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduler(err) => write!(f, "Scheduler error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Scheduler(err) => Some(err),
        }
    }
}

/// Scheduler-specific errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The task ID is invalid or the task has already completed or been cancelled.
    InvalidTaskId,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTaskId => write!(f, "Invalid, completed or cancelled task ID"),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<SchedulerError> for CoreError {
    fn from(err: SchedulerError) -> Self {
        Self::Scheduler(err)
    }
}

/// A specialized Result type for runtime operations.
pub type Result<T> = std::result::Result<T, CoreError>;
