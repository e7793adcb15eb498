//! Error types for scoring runs and the record-store boundary
//!
//! Errors are classified by how the caller should react:
//! - Conflict: the run date was already scored (user-facing, 409-class)
//! - Retryable: the store was busy or locked
//! - NonRetryable: bad requests, configuration, store faults

use chrono::NaiveDate;
use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum EngineError {
    // Conflict
    #[error("COI scoring already ran for {0}")]
    AlreadyScored(NaiveDate),

    // Retryable errors
    #[error("Record store busy: {0}")]
    StoreBusy(String),

    // Non-retryable errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl EngineError {
    /// True for the "already scored" scheduling conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::AlreadyScored(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StoreBusy(_))
    }

    /// HTTP-equivalent status for the run envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::AlreadyScored(_) => 409,
            EngineError::InvalidRequest(_) => 400,
            EngineError::StoreBusy(_) => 503,
            _ => 500,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EngineError::AlreadyScored(_) => {
                "Today's COI queue already exists. Use a dry run to preview new scores."
            }
            EngineError::StoreBusy(_) => "Another run is writing. Try again in a moment.",
            EngineError::InvalidRequest(_) => "Check the request fields and try again.",
            EngineError::Store(_) => "Check the database file and its permissions.",
            EngineError::Configuration(_) => {
                "Check your configuration in ~/.leadqueue/config.json"
            }
            EngineError::IoError(_) => "Check file permissions and disk space.",
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                EngineError::StoreBusy(err.to_string())
            }
            _ => EngineError::Store(err.to_string()),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::IoError(err.to_string())
    }
}

/// Serializable error representation for callers of a run
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFailure {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Conflict,
    Retryable,
    NonRetryable,
}

impl From<&EngineError> for RunFailure {
    fn from(err: &EngineError) -> Self {
        let error_type = if err.is_conflict() {
            ErrorType::Conflict
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::NonRetryable
        };

        RunFailure {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
