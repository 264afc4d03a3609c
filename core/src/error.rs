use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoiError {
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Scenario store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Scenario store write failed: {0}")]
    StoreWriteFailed(String),

    #[error("Scenario store read failed: {0}")]
    StoreReadFailed(String),

    #[error("Report rendering failed: {0}")]
    RenderFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RoiError {
    pub fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        RoiError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify a SQLite failure raised while writing a record.
    /// Connectivity-type failures are `StoreUnavailable`; everything else
    /// (constraints, read-only medium, full disk) is a failed write.
    pub fn from_sqlite_write(err: rusqlite::Error) -> Self {
        if is_connectivity_failure(&err) {
            RoiError::StoreUnavailable(err.to_string())
        } else {
            RoiError::StoreWriteFailed(err.to_string())
        }
    }

    /// Classify a SQLite failure raised while reading records.
    pub fn from_sqlite_read(err: rusqlite::Error) -> Self {
        if is_connectivity_failure(&err) {
            RoiError::StoreUnavailable(err.to_string())
        } else {
            RoiError::StoreReadFailed(err.to_string())
        }
    }
}

fn is_connectivity_failure(err: &rusqlite::Error) -> bool {
    use rusqlite::ErrorCode;
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            ErrorCode::CannotOpen
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::NotADatabase
                | ErrorCode::SystemIoFailure
                | ErrorCode::PermissionDenied
                | ErrorCode::DatabaseCorrupt
        ),
        _ => false,
    }
}

pub type RoiResult<T> = Result<T, RoiError>;
