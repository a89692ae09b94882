//! Acting user resolution.
//!
//! Authentication is delegated to the external auth provider; by the time the
//! core runs, the session has been reduced to a user ID. The binary reads it
//! from `FINANCE_USER_ID` (usually set in `.env`).

use crate::errors::{Error, Result};
use std::env::VarError;

/// Environment variable holding the acting user's ID.
pub const USER_ID_VAR: &str = "FINANCE_USER_ID";

/// Checks that a session user ID is present and non-blank.
///
/// # Errors
/// Returns [`Error::Unauthenticated`] when `user_id` is `None` or blank.
pub fn require_user(user_id: Option<&str>) -> Result<String> {
    match user_id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(Error::Unauthenticated),
    }
}

/// Gets the acting user ID from [`USER_ID_VAR`].
///
/// # Errors
/// Returns [`Error::Unauthenticated`] when the variable is unset or blank, and
/// [`Error::EnvVar`] when it is set but not valid unicode.
pub fn get_acting_user() -> Result<String> {
    user_from_env(std::env::var(USER_ID_VAR))
}

fn user_from_env(value: std::result::Result<String, VarError>) -> Result<String> {
    match value {
        Ok(id) => require_user(Some(&id)),
        Err(VarError::NotPresent) => Err(Error::Unauthenticated),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_require_user_accepts_id() {
        assert_eq!(require_user(Some(" user-42 ")).unwrap(), "user-42");
    }

    #[test]
    fn test_user_from_env() {
        assert_eq!(user_from_env(Ok("u1".to_string())).unwrap(), "u1");
        assert!(matches!(
            user_from_env(Err(VarError::NotPresent)),
            Err(Error::Unauthenticated)
        ));
        let garbled = VarError::NotUnicode(std::ffi::OsString::from("u1"));
        assert!(matches!(user_from_env(Err(garbled)), Err(Error::EnvVar(_))));
    }

    #[test]
    fn test_require_user_rejects_missing_or_blank() {
        assert!(matches!(require_user(None), Err(Error::Unauthenticated)));
        assert!(matches!(require_user(Some("   ")), Err(Error::Unauthenticated)));
    }
}
