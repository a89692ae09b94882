//! User profile operations.
//!
//! A profile is created the first time a user is seen, with the configured
//! default currency. Currency changes are limited to the supported list.

use crate::{
    config::settings::Settings,
    entities::profile,
    errors::{Error, Result},
    store::{BudgetStore, NewProfile, ProfilePatch},
};
use tracing::info;

/// Settings-page changes; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// New display name
    pub full_name: Option<String>,
    /// New avatar path or URL
    pub avatar: Option<String>,
    /// New currency code, checked against the supported list
    pub preferred_currency: Option<String>,
}

/// The user's profile.
///
/// # Errors
/// [`Error::NotFound`] if the user has never logged in.
pub async fn get_profile<S>(store: &S, user_id: &str) -> Result<profile::Model>
where
    S: BudgetStore,
{
    store
        .find_profile(user_id)
        .await?
        .ok_or_else(|| Error::not_found("profile", user_id))
}

/// Returns the user's profile, creating it on first login.
pub async fn ensure_profile<S>(
    store: &S,
    settings: &Settings,
    user_id: &str,
    full_name: Option<String>,
) -> Result<profile::Model>
where
    S: BudgetStore,
{
    if let Some(existing) = store.find_profile(user_id).await? {
        return Ok(existing);
    }

    let new = NewProfile {
        id: user_id.to_string(),
        full_name,
        avatar: None,
        preferred_currency: settings.default_currency.to_ascii_uppercase(),
    };

    match store.insert_profile(new).await {
        Ok(created) => {
            info!("Created profile for {user_id}");
            Ok(created)
        }
        // Another session created it first
        Err(Error::ConstraintViolation { .. }) => get_profile(store, user_id).await,
        Err(e) => Err(e),
    }
}

/// Applies settings-page changes to the user's profile.
///
/// # Errors
/// [`Error::Validation`] for an unsupported currency or a blank name, and
/// [`Error::NotFound`] when the profile does not exist.
pub async fn update_profile<S>(
    store: &S,
    settings: &Settings,
    user_id: &str,
    update: ProfileUpdate,
) -> Result<profile::Model>
where
    S: BudgetStore,
{
    let preferred_currency = update
        .preferred_currency
        .map(|code| {
            let code = code.trim().to_ascii_uppercase();
            if settings.supports_currency(&code) {
                Ok(code)
            } else {
                Err(Error::validation(format!("Unsupported currency '{code}'")))
            }
        })
        .transpose()?;

    let full_name = update.full_name.map(|name| name.trim().to_string());
    if full_name.as_deref().is_some_and(str::is_empty) {
        return Err(Error::validation("Name cannot be blank"));
    }

    let patch = ProfilePatch {
        full_name,
        avatar: update.avatar,
        preferred_currency,
    };

    store.update_profile(user_id, patch).await
}
