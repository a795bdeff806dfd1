//! Application configuration
//!
//! All configuration is read from environment variables at startup. A `.env` file in the working
//! directory is loaded by `main` before this runs.
use readlog_core::books_api::GoogleBooksConfig;
use readlog_core::books_api::client::{DEFAULT_BASE_URL, DEFAULT_MAX_RESULTS};
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "./.readlog";
pub const LIBRARY_DATABASE_NAME: &str = "library.db";
/// Upper bound the volumes endpoint accepts for `maxResults`
const MAX_RESULTS_LIMIT: u8 = 40;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the database and the session file
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub books_api: GoogleBooksConfig,
    /// Web API key of the Firebase project, sign-in is unavailable without it
    pub firebase_api_key: Option<String>,
    /// Identity Toolkit base URL, e.g. of the Firebase auth emulator. `None` uses the public API.
    pub firebase_endpoint: Option<String>,
}

impl Config {
    /// Loads the configuration from the process environment
    /// # Errors
    /// Fails if a variable is set to a value that cannot be used
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once per program run"
    )]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the configuration from an arbitrary variable source. Empty values count as unset.
    /// # Errors
    /// Fails if a variable is set to a value that cannot be used
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once per program run"
    )]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let data_dir = var("READLOG_DATA_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
        let database_path = var("READLOG_DATABASE")
            .map_or_else(|| data_dir.join(LIBRARY_DATABASE_NAME), PathBuf::from);

        let base_url = var("BOOKS_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let max_results = match var("BOOKS_MAX_RESULTS") {
            None => DEFAULT_MAX_RESULTS,
            Some(value) => parse_max_results(&value)?,
        };
        let lang_restrict = var("BOOKS_LANG_RESTRICT");

        Ok(Self {
            data_dir,
            database_path,
            books_api: GoogleBooksConfig::new(base_url, max_results, lang_restrict),
            firebase_api_key: var("FIREBASE_API_KEY"),
            firebase_endpoint: var("FIREBASE_AUTH_ENDPOINT"),
        })
    }
}

fn parse_max_results(value: &str) -> Result<u8, ConfigError> {
    let invalid = || {
        ConfigError::InvalidValue(
            "BOOKS_MAX_RESULTS".to_owned(),
            format!("'{value}' is not a number between 1 and {MAX_RESULTS_LIMIT}"),
        )
    };
    let parsed = value.trim().parse::<u8>().map_err(|_err| invalid())?;
    if (1..=MAX_RESULTS_LIMIT).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|&(name, value)| (name.to_owned(), value.to_owned()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./.readlog"));
        assert_eq!(config.database_path, PathBuf::from("./.readlog/library.db"));
        assert_eq!(config.books_api, GoogleBooksConfig::default());
        assert_eq!(config.firebase_api_key, None);
        assert_eq!(config.firebase_endpoint, None);
    }

    #[test]
    fn database_follows_data_dir_unless_set() {
        let config = config_from(&[("READLOG_DATA_DIR", "/var/lib/readlog")]).unwrap();
        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/readlog/library.db")
        );

        let config = config_from(&[
            ("READLOG_DATA_DIR", "/var/lib/readlog"),
            ("READLOG_DATABASE", "/tmp/books.db"),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/books.db"));
    }

    #[test]
    fn books_api_settings() {
        let config = config_from(&[
            ("BOOKS_API_BASE_URL", "http://localhost:8080/books/v1/"),
            ("BOOKS_MAX_RESULTS", "40"),
            ("BOOKS_LANG_RESTRICT", "ja"),
            ("FIREBASE_API_KEY", "AIza-test"),
            ("FIREBASE_AUTH_ENDPOINT", "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/"),
        ])
        .unwrap();
        assert_eq!(
            config.books_api,
            GoogleBooksConfig::new(
                "http://localhost:8080/books/v1/".to_owned(),
                40,
                Some("ja".to_owned())
            )
        );
        assert_eq!(config.firebase_api_key.as_deref(), Some("AIza-test"));
        assert_eq!(
            config.firebase_endpoint.as_deref(),
            Some("http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/")
        );
    }

    #[test]
    fn out_of_range_max_results_is_rejected() {
        for value in ["0", "41", "-3", "lots"] {
            assert!(matches!(
                config_from(&[("BOOKS_MAX_RESULTS", value)]),
                Err(ConfigError::InvalidValue(name, _)) if name == "BOOKS_MAX_RESULTS"
            ));
        }
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[("FIREBASE_API_KEY", ""), ("BOOKS_MAX_RESULTS", " ")]).unwrap();
        assert_eq!(config.firebase_api_key, None);
        assert_eq!(config.books_api.max_results, DEFAULT_MAX_RESULTS);
    }
}
