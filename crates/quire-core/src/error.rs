//! Error types and exit codes for quire
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure (storage, IO, serialization)
//! - 2: Usage error (bad flags/args, invalid values)
//! - 3: Data error (missing entity, constraint violation, corruption)

mod macros;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Exit codes for the quire CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Data error - not found, constraint, corruption (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum QuireError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("corruption detected: {0}")]
    CorruptionDetected(String),

    #[error("storage failure: {0}")]
    IoFailure(String),

    #[error("metadata extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("store schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    #[error("{0}")]
    UsageError(String),
}

impl From<rusqlite::Error> for QuireError {
    fn from(err: rusqlite::Error) -> Self {
        classify_sqlite(None, err)
    }
}

fn classify_sqlite(operation: Option<&str>, err: rusqlite::Error) -> QuireError {
    let message = match operation {
        Some(op) => format!("failed to {}: {}", op, err),
        None => err.to_string(),
    };
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => QuireError::ConstraintViolation(message),
        Some(ErrorCode::DatabaseCorrupt) | Some(ErrorCode::NotADatabase) => {
            QuireError::CorruptionDetected(message)
        }
        _ => QuireError::IoFailure(message),
    }
}

impl QuireError {
    /// Wrap a failed SQLite call with the operation that was attempted
    pub fn db(operation: &str, error: rusqlite::Error) -> Self {
        classify_sqlite(Some(operation), error)
    }

    /// Create an error for an entity that was not found
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        QuireError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl std::fmt::Display) -> Self {
        QuireError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QuireError::NotFound { .. })
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            QuireError::UsageError(_) | QuireError::InvalidValue { .. } => ExitCode::Usage,

            QuireError::NotFound { .. }
            | QuireError::ConstraintViolation(_)
            | QuireError::CorruptionDetected(_)
            | QuireError::UnsupportedSchema { .. } => ExitCode::Data,

            QuireError::IoFailure(_)
            | QuireError::ExtractionFailure(_)
            | QuireError::Io(_)
            | QuireError::Json(_)
            | QuireError::Toml(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            QuireError::NotFound { .. } => "not_found",
            QuireError::ConstraintViolation(_) => "constraint_violation",
            QuireError::CorruptionDetected(_) => "corruption_detected",
            QuireError::IoFailure(_) => "io_failure",
            QuireError::ExtractionFailure(_) => "extraction_failure",
            QuireError::UnsupportedSchema { .. } => "unsupported_schema",
            QuireError::Io(_) => "io_error",
            QuireError::Json(_) => "json_error",
            QuireError::Toml(_) => "toml_error",
            QuireError::InvalidValue { .. } => "invalid_value",
            QuireError::UsageError(_) => "usage_error",
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for quire operations
pub type Result<T> = std::result::Result<T, QuireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_taxonomy() {
        assert_eq!(
            QuireError::not_found("note", "n1").exit_code(),
            ExitCode::Data
        );
        assert_eq!(
            QuireError::ConstraintViolation("dup".into()).exit_code(),
            ExitCode::Data
        );
        assert_eq!(
            QuireError::UsageError("bad".into()).exit_code(),
            ExitCode::Usage
        );
        assert_eq!(
            QuireError::IoFailure("disk".into()).exit_code(),
            ExitCode::Failure
        );
    }

    #[test]
    fn test_sqlite_constraint_errors_are_classified() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (x TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .map_err(|e| QuireError::db("insert row", e))
            .unwrap_err();
        assert!(matches!(err, QuireError::ConstraintViolation(_)));
        assert!(err.to_string().contains("insert row"));
    }

    #[test]
    fn test_to_json_shape() {
        let json = QuireError::not_found("version", "v1").to_json();
        assert_eq!(json["error"]["code"], 3);
        assert_eq!(json["error"]["type"], "not_found");
        assert_eq!(json["error"]["message"], "version not found: v1");
    }
}
