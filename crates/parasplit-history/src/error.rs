//! Error types for parasplit-history

use thiserror::Error;

/// Errors that can occur while reading or writing build history
#[derive(Error, Debug)]
pub enum StorageError {
    /// No job is registered under the given name
    #[error("job not found: {job}")]
    JobNotFound { job: String },

    /// The job exists but has no build with the given number
    #[error("build not found: {job} #{number}")]
    BuildNotFound { job: String, number: u64 },

    /// Job names are slash-separated paths of non-empty segments
    #[error("invalid job name: {name:?}")]
    InvalidJobName { name: String },

    /// An archived record or test report could not be decoded
    #[error("malformed record at {location}: {reason}")]
    MalformedReport { location: String, reason: String },

    /// Filesystem failure in an archive-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::MalformedReport {
            location: "<json>".to_string(),
            reason: err.to_string(),
        }
    }
}
