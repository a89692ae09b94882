//! Unified error type for the finance tracker.
//!
//! Store failures are classified into the variants callers actually branch on
//! (`NotFound`, `ConstraintViolation`); everything else from the database is
//! carried through as [`Error::Database`].

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// All errors surfaced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A single record was required but no row matched.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Collection the lookup ran against (e.g. `"transaction"`)
        entity: &'static str,
        /// Human-readable key that failed to match
        key: String,
    },

    /// Uniqueness or foreign-key conflict reported by the store.
    #[error("Constraint violation: {message}")]
    ConstraintViolation {
        /// Message reported by the store
        message: String,
    },

    /// Malformed user input (bad amount, bad date, missing category, ...).
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the rejected field
        message: String,
    },

    /// No acting user could be determined.
    #[error("No authenticated user")]
    Unauthenticated,

    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Catch-all for failures with no better classification.
    #[error("Unknown error: {message}")]
    Unknown {
        /// Free-form description
        message: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`] on `entity` keyed by `key`.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::RecordNotFound(key) => Self::NotFound {
                entity: "record",
                key,
            },
            other => match other.sql_err() {
                Some(
                    SqlErr::UniqueConstraintViolation(message)
                    | SqlErr::ForeignKeyConstraintViolation(message),
                ) => Self::ConstraintViolation { message },
                _ => Self::Database(other),
            },
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_found_maps_to_not_found() {
        let err: Error = DbErr::RecordNotFound("allocation 7".to_string()).into();
        assert!(matches!(err, Error::NotFound { key, .. } if key == "allocation 7"));
    }

    #[test]
    fn test_other_db_errors_stay_database() {
        let err: Error = DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::not_found("profile", "user-1").to_string(),
            "profile not found: user-1"
        );
        assert_eq!(
            Error::validation("Amount is required").to_string(),
            "Validation error: Amount is required"
        );
        assert_eq!(Error::Unauthenticated.to_string(), "No authenticated user");
    }
}
