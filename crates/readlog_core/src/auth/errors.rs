#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no API key configured for the identity provider")]
    MissingApiKey,

    /// The identity provider refused the credential, carries the provider's message
    #[error("identity provider rejected the credential: {0}")]
    Rejected(String),

    /// The provider accepted the request but returned no user
    #[error("identity provider returned no user")]
    NoUser,

    #[error("request to the identity provider failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("failed to decode identity provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Client(String),
}
