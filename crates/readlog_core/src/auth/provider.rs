use crate::auth::errors::AuthError;
use serde::{Deserialize, Serialize};

/// A credential obtained from Google Sign-In, handed to the identity provider for exchange
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCredential {
    GoogleIdToken(String),
    GoogleAccessToken(String),
}

/// The user the identity provider signed in
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInUser {
    /// Stable provider-assigned ID, the owner key of every record
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl SignedInUser {
    #[inline]
    #[must_use]
    pub const fn new(user_id: String, email: Option<String>, display_name: Option<String>) -> Self {
        Self {
            user_id,
            email,
            display_name,
        }
    }
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in user, if any
    fn current_user(&self) -> Option<SignedInUser>;

    /// Exchanges a provider credential for a signed-in user
    async fn sign_in(&self, credential: &ProviderCredential) -> Result<SignedInUser, AuthError>;

    /// Forgets the signed-in user
    async fn sign_out(&self) -> Result<(), AuthError>;
}
