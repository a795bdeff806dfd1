use crate::config::Config;
use crate::errors::Error;
use readlog_core::auth::{FirebaseIdentityProvider, Session, SignedInUser};
use readlog_core::books_api::{BookSearch, GoogleBooksClient};
use readlog_core::database::{Db, RecordStore};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const APP_CONFIG_PATH: &str = "readlog-config.json";
const SESSION_KEY: &str = "session";

pub struct AppState {
    pub db: Arc<Db>,
    pub search: Arc<dyn BookSearch>,
    pub session: Arc<Session>,
    config_path: PathBuf,
}

impl AppState {
    /// Opens the library database and restores the session persisted by the previous run
    pub async fn new(config: &Config) -> Result<Self, Error> {
        fs::create_dir_all(&config.data_dir)?;
        if let Some(parent) = config.database_path.parent() {
            fs::create_dir_all(parent)?;
        }
        tracing::info!("Opening library database at {}", config.database_path.display());
        let db = Db::init(&config.database_path).await?;

        let config_path = config.data_dir.join(APP_CONFIG_PATH);
        let user = load_session(&config_path)?;
        match user.as_ref() {
            Some(user) => tracing::info!("Restored session of user {}", user.user_id),
            None => tracing::info!("No session in config, sign in to access your books"),
        }
        let mut provider =
            FirebaseIdentityProvider::new(config.firebase_api_key.clone())?.with_user(user);
        if let Some(endpoint) = config.firebase_endpoint.clone() {
            tracing::info!("Signing in through {endpoint}");
            provider = provider.with_endpoint(endpoint);
        }

        Ok(Self {
            db: Arc::new(db),
            search: Arc::new(GoogleBooksClient::new(config.books_api.clone())?),
            session: Arc::new(Session::new(Arc::new(provider))),
            config_path,
        })
    }

    /// The database as the record store the view-state holders work on
    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::<Db>::clone(&self.db)
    }

    /// Writes the current user of the session to the config file
    pub fn persist_session(&self) -> Result<(), Error> {
        store_session(&self.config_path, self.session.current_user().as_ref())
    }
}

/// Reads the persisted user from the JSON config at `path`. A missing file means no session.
pub fn load_session(path: &Path) -> Result<Option<SignedInUser>, Error> {
    if !path.exists() {
        return Ok(None);
    }
    let config: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    match config.get(SESSION_KEY).and_then(|entry| entry.get("value")) {
        None | Some(Value::Null) => Ok(None),
        Some(user) => Ok(Some(serde_json::from_value(user.clone())?)),
    }
}

/// Replaces the session entry of the JSON config at `path`, keeping all other entries
pub fn store_session(path: &Path, user: Option<&SignedInUser>) -> Result<(), Error> {
    let mut config = if path.exists() {
        match serde_json::from_str::<Value>(&fs::read_to_string(path)?)? {
            Value::Object(entries) => entries,
            _ => Map::new(),
        }
    } else {
        Map::new()
    };
    config.insert(SESSION_KEY.to_owned(), json!({ "value": user }));
    fs::write(path, serde_json::to_string_pretty(&config)?)?;
    tracing::info!("Updated session in {}", path.display());
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reader() -> SignedInUser {
        SignedInUser::new(
            "uid-42".to_owned(),
            Some("reader@example.com".to_owned()),
            None,
        )
    }

    #[test]
    fn missing_config_means_no_session() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_session(&dir.path().join(APP_CONFIG_PATH)).unwrap(), None);
    }

    #[test]
    fn session_survives_restart_and_sign_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_CONFIG_PATH);

        store_session(&path, Some(&reader())).unwrap();
        assert_eq!(load_session(&path).unwrap(), Some(reader()));

        store_session(&path, None).unwrap();
        assert_eq!(load_session(&path).unwrap(), None);
    }

    #[test]
    fn other_config_entries_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_CONFIG_PATH);
        fs::write(&path, r#"{"theme": {"value": "dark"}}"#).unwrap();

        store_session(&path, Some(&reader())).unwrap();
        let config: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config["theme"]["value"], "dark");
        assert_eq!(config["session"]["value"]["user_id"], "uid-42");
    }

    #[test]
    fn corrupt_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_CONFIG_PATH);
        fs::write(&path, "not json").unwrap();
        assert!(matches!(load_session(&path), Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn state_opens_database_and_restores_user() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let config = Config::from_lookup(|name| {
            (name == "READLOG_DATA_DIR").then(|| data_dir.display().to_string())
        })
        .unwrap();

        fs::create_dir_all(&data_dir).unwrap();
        store_session(&data_dir.join(APP_CONFIG_PATH), Some(&reader())).unwrap();

        let state = AppState::new(&config).await.unwrap();
        assert_eq!(state.session.current_user_id().as_deref(), Some("uid-42"));
        assert!(data_dir.join("library.db").exists());
        assert!(state.store().list_records("uid-42").await.unwrap().is_empty());

        state.session.sign_out().await;
        state.persist_session().unwrap();
        assert_eq!(load_session(&data_dir.join(APP_CONFIG_PATH)).unwrap(), None);
        state.db.close().await;
    }
}
