//! Application settings loading from config.toml
//!
//! Every field has a default, so a missing or partial config.toml is fine.
//! The database URL in the file is overridden by `DATABASE_URL` (see
//! [`crate::config::database::get_database_url`]).

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Database URL used when `DATABASE_URL` is not set
    pub database_url: Option<String>,
    /// Currency assigned to newly created profiles
    pub default_currency: String,
    /// Currencies a profile may select
    pub supported_currencies: Vec<String>,
    /// Number of recent transactions shown in dashboard summaries
    pub recent_transactions_limit: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            default_currency: "USD".to_string(),
            supported_currencies: ["USD", "EUR", "GBP", "INR", "JPY"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            recent_transactions_limit: 5,
        }
    }
}

impl Settings {
    /// Whether `code` is one of the supported currencies (case-insensitive).
    #[must_use]
    pub fn supports_currency(&self, code: &str) -> bool {
        self.supported_currencies
            .iter()
            .any(|c| c.eq_ignore_ascii_case(code.trim()))
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The default currency is not in the supported list
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_settings(&contents)
}

/// Loads settings from ./config.toml, falling back to defaults when the file
/// does not exist.
pub fn load_default_settings() -> Result<Settings> {
    let path = Path::new("config.toml");
    if !path.exists() {
        tracing::info!("No config.toml found, using default settings");
        return Ok(Settings::default());
    }
    load_settings(path)
}

fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if !settings.supports_currency(&settings.default_currency) {
        return Err(Error::Config {
            message: format!(
                "Default currency '{}' is not in supported_currencies",
                settings.default_currency
            ),
        });
    }

    Ok(settings)
}
