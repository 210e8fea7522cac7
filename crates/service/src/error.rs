//! Error types for job generation.

use thiserror::Error;

/// Result type alias for job operations.
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors that can end a generation job.
#[derive(Error, Debug)]
pub enum JobError {
    /// A required input is absent: the job id of a request, or a required
    /// environment variable.
    #[error("{0}")]
    ConfigurationMissing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid jobid '{0}'")]
    InvalidJobId(String),

    #[error("No records found for the given jobid")]
    RecordNotFound,

    /// A record source or upload sink call failed or returned a non-success status.
    #[error("{operation} failed: {message}")]
    RemoteFetch {
        operation: &'static str,
        message: String,
    },

    #[error(transparent)]
    Template(#[from] deckgen_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    pub(crate) fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            operation,
            message: message.into(),
        }
    }

    /// How a caller should report this failure.
    pub fn outcome(&self) -> Outcome {
        match self {
            JobError::RecordNotFound => Outcome::NotFound,
            JobError::ConfigurationMissing(_) | JobError::InvalidJobId(_) => Outcome::Rejected,
            _ => Outcome::Failed,
        }
    }
}

/// Result classification of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Records found, file generated and uploaded.
    Accepted,
    /// The request itself was unusable (no job id).
    Rejected,
    /// No records for the job id.
    NotFound,
    /// Fetch, rendering or upload failed.
    Failed,
}

impl Outcome {
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Outcome::Accepted,
            Err(e) => e.outcome(),
        }
    }
}
