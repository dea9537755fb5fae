//! Errors for riffbook.
//!
//! Two variants are notices rather than failures: [`Error::NoDataToExport`]
//! and [`Error::NoDataToSave`] carry the message shown to the user when an
//! action had nothing to act on. See [`Error::is_notice`].

use std::path::PathBuf;
use thiserror::Error;

use crate::identity::AuthFailureReason;

/// Everything that can go wrong in riffbook.
#[derive(Error, Debug)]
pub enum Error {
    // Input
    /// A metric input could not be parsed as a finite number.
    #[error("invalid value '{raw}' for {technique}/{metric}: expected a number")]
    InvalidMetricValue {
        /// Technique id.
        technique: String,
        /// Metric id.
        metric: String,
        /// What was typed.
        raw: String,
    },

    /// A date string was not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date '{raw}': expected YYYY-MM-DD")]
    InvalidDate {
        /// What was typed.
        raw: String,
    },

    /// No plan has this id or name.
    #[error("plan not found: {plan}")]
    PlanNotFound {
        /// The id or name looked up.
        plan: String,
    },

    /// The technique id is not in the catalog.
    #[error("unknown technique: {technique}")]
    UnknownTechnique {
        /// The id looked up.
        technique: String,
    },

    /// The technique has no metric with this id.
    #[error("unknown metric '{metric}' for technique '{technique}'")]
    UnknownMetric {
        /// Technique id.
        technique: String,
        /// The metric id looked up.
        metric: String,
    },

    // Notices
    /// Export was asked for with no progress recorded.
    #[error("No progress data to export.")]
    NoDataToExport,

    /// A save or import found no values.
    #[error("No data to save.")]
    NoDataToSave,

    // Identity
    /// The identity provider refused the user.
    #[error("{}", .0.message())]
    AuthFailure(AuthFailureReason),

    // Store
    /// A read or write against the progress store failed.
    #[error("progress store unavailable: {message}")]
    StoreUnavailable {
        /// What the store reported.
        message: String,
    },

    /// The database file could not be opened.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Database file.
        path: PathBuf,
        /// Cause.
        #[source]
        source: rusqlite::Error,
    },

    /// `SQLite` rejected a statement.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// The schema could not be brought up to date.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// What blocked the upgrade.
        message: String,
    },

    /// A stored document or imported file was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Setup
    /// A config source could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// The merged configuration is unusable.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// The offending key and why.
        message: String,
    },

    /// A file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database or export directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Directory that was being created.
        path: PathBuf,
        /// Cause.
        #[source]
        source: std::io::Error,
    },

    /// A broken internal invariant, such as a poisoned lock.
    #[error("internal error: {0}")]
    Internal(String),
}

/// `Result` with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Wrap a store failure.
    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this is a message for the user rather than a failure.
    #[must_use]
    pub fn is_notice(&self) -> bool {
        matches!(self, Self::NoDataToExport | Self::NoDataToSave)
    }

    /// Whether the store failed.
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_carry_user_messages() {
        assert!(Error::NoDataToExport.is_notice());
        assert!(Error::NoDataToSave.is_notice());
        assert_eq!(Error::NoDataToExport.to_string(), "No progress data to export.");
        assert_eq!(Error::NoDataToSave.to_string(), "No data to save.");
    }

    #[test]
    fn test_failures_are_not_notices() {
        let err = Error::store_unavailable("connection refused");
        assert!(!err.is_notice());
        assert!(err.is_store_unavailable());
        assert_eq!(
            err.to_string(),
            "progress store unavailable: connection refused"
        );
        assert!(!Error::NoDataToSave.is_store_unavailable());
    }

    #[test]
    fn test_auth_failure_shows_the_reason() {
        let err = Error::AuthFailure(AuthFailureReason::WrongPassword);
        assert_eq!(err.to_string(), "Incorrect password.");
    }

    #[test]
    fn test_input_errors_name_what_was_typed() {
        let err = Error::InvalidMetricValue {
            technique: "legato".to_string(),
            metric: "speed".to_string(),
            raw: "fast".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value 'fast' for legato/speed: expected a number"
        );

        let err = Error::UnknownMetric {
            technique: "divebombs".to_string(),
            metric: "speed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown metric 'speed' for technique 'divebombs'"
        );

        let err = Error::PlanNotFound {
            plan: "Morning".to_string(),
        };
        assert_eq!(err.to_string(), "plan not found: Morning");
    }

    #[test]
    fn test_converts_from_sources() {
        let err: Error = serde_json::from_str::<i32>("{").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));

        let err: Error = std::io::Error::other("disk full").into();
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_directory_create_names_the_path() {
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/exports/riffs"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("/exports/riffs"));
    }
}
