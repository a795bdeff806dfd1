use crate::config::ConfigError;
use readlog_core::auth::AuthError;
use readlog_core::books_api::BooksApiError;

/// The readlog application error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// Error variant arising from opening or migrating the database
    #[error("Failed to open library database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Book search error: {0}")]
    Api(#[from] BooksApiError),
    #[error("Sign-in error: {0}")]
    Auth(#[from] AuthError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Error variant arising from reading or writing the JSON config file
    #[error("Failed to read key-value config: {0}")]
    Json(#[from] serde_json::Error),
    /// Wildcard error for everything else
    #[error("{0}")]
    Other(String),
}
