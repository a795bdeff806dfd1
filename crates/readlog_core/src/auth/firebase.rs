use crate::auth::errors::AuthError;
use crate::auth::provider::{IdentityProvider, ProviderCredential, SignedInUser};
use core::time::Duration;
use log::{info, warn};
use reqwest::ClientBuilder;
use serde::Deserialize;
use serde_json::json;
use urlencoding::encode;

pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1/";

/// Signs users in through Firebase Authentication, exchanging a Google credential via the
/// Identity Toolkit `accounts:signInWithIdp` endpoint.
pub struct FirebaseIdentityProvider {
    http_client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    user: parking_lot::RwLock<Option<SignedInUser>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseIdentityProvider {
    /// # Errors
    /// Fails in case the HTTP client cannot be constructed
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once per program run"
    )]
    pub fn new(api_key: Option<String>) -> Result<Self, AuthError> {
        let http_client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(25))
            .build()
            .map_err(|err| {
                AuthError::Client(format!(
                    "Failed to create HTTP request client for sign-in: {err}"
                ))
            })?;

        Ok(Self {
            http_client,
            api_key,
            endpoint: IDENTITY_TOOLKIT_URL.to_owned(),
            user: parking_lot::RwLock::new(None),
        })
    }

    /// Restores a user persisted by a previous run
    #[inline]
    #[must_use]
    pub fn with_user(self, user: Option<SignedInUser>) -> Self {
        *self.user.write() = user;
        self
    }

    /// Points the provider at a different Identity Toolkit deployment, e.g. the local emulator
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    fn sign_in_url(&self, api_key: &str) -> String {
        format!(
            "{}accounts:signInWithIdp?key={}",
            self.endpoint,
            encode(api_key)
        )
    }
}

/// Builds the `postBody` parameter of a `signInWithIdp` request
#[inline]
#[must_use]
pub fn post_body(credential: &ProviderCredential) -> String {
    match *credential {
        ProviderCredential::GoogleIdToken(ref token) => {
            format!("id_token={}&providerId=google.com", encode(token))
        }
        ProviderCredential::GoogleAccessToken(ref token) => {
            format!("access_token={}&providerId=google.com", encode(token))
        }
    }
}

/// Interprets a `signInWithIdp` response body
/// # Errors
/// Returns `AuthError::Rejected` for error responses, `AuthError::NoUser` if the response
/// carries no user ID and `AuthError::Decode` for bodies that are not JSON of either shape
#[inline]
pub fn parse_sign_in_response(success: bool, body: &str) -> Result<SignedInUser, AuthError> {
    if !success {
        let error: ErrorResponse = serde_json::from_str(body)?;
        return Err(AuthError::Rejected(error.error.message));
    }
    let response: SignInResponse = serde_json::from_str(body)?;
    let user_id = response
        .local_id
        .filter(|id| !id.is_empty())
        .ok_or(AuthError::NoUser)?;
    Ok(SignedInUser::new(
        user_id,
        response.email,
        response.display_name,
    ))
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    fn current_user(&self) -> Option<SignedInUser> {
        self.user.read().clone()
    }

    async fn sign_in(&self, credential: &ProviderCredential) -> Result<SignedInUser, AuthError> {
        let api_key = self.api_key.as_deref().ok_or(AuthError::MissingApiKey)?;
        let url = self.sign_in_url(api_key);
        let request = json!({
            "postBody": post_body(credential),
            "requestUri": "http://localhost",
            "returnIdpCredential": true,
            "returnSecureToken": true,
        });

        let response = self.http_client.post(&url).json(&request).send().await?;
        let success = response.status().is_success();
        let body = response.text().await?;
        let user = parse_sign_in_response(success, &body).inspect_err(|err| {
            warn!("Sign-in with identity provider failed: {err}");
        })?;

        info!("Signed in user {}", user.user_id);
        *self.user.write() = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(user) = self.user.write().take() {
            info!("Signed out user {}", user.user_id);
        }
        Ok(())
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

    #[test]
    fn post_body_names_google_provider() {
        assert_eq!(
            post_body(&ProviderCredential::GoogleIdToken("a.b.c".to_owned())),
            "id_token=a.b.c&providerId=google.com"
        );
        assert_eq!(
            post_body(&ProviderCredential::GoogleAccessToken("ya29/x".to_owned())),
            "access_token=ya29%2Fx&providerId=google.com"
        );
    }

    #[test]
    fn successful_response_yields_user() {
        let body = r#"{"kind":"identitytoolkit#VerifyAssertionResponse","localId":"uid-42",
            "email":"reader@example.com","displayName":"Reader","idToken":"t","refreshToken":"r"}"#;
        assert_eq!(
            parse_sign_in_response(true, body).unwrap(),
            SignedInUser::new(
                "uid-42".to_owned(),
                Some("reader@example.com".to_owned()),
                Some("Reader".to_owned())
            )
        );
    }

    #[test]
    fn error_response_is_rejected() {
        let body = r#"{"error":{"code":400,"message":"INVALID_IDP_RESPONSE","errors":[]}}"#;
        let result = parse_sign_in_response(false, body);
        assert!(matches!(result, Err(AuthError::Rejected(message)) if message == "INVALID_IDP_RESPONSE"));
    }

    #[test]
    fn response_without_user_id() {
        assert!(matches!(
            parse_sign_in_response(true, r#"{"email":"reader@example.com"}"#),
            Err(AuthError::NoUser)
        ));
    }

    #[test]
    fn sign_in_url_follows_endpoint() {
        let provider = FirebaseIdentityProvider::new(None).unwrap();
        assert_eq!(
            provider.sign_in_url("AIza key"),
            "https://identitytoolkit.googleapis.com/v1/accounts:signInWithIdp?key=AIza%20key"
        );

        let emulator = provider
            .with_endpoint("http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/".to_owned());
        assert_eq!(
            emulator.sign_in_url("fake"),
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/accounts:signInWithIdp?key=fake"
        );
    }

    #[tokio::test]
    async fn sign_in_without_api_key_fails_and_keeps_user() {
        let persisted = SignedInUser::new("uid-1".to_owned(), None, None);
        let provider = FirebaseIdentityProvider::new(None)
            .unwrap()
            .with_user(Some(persisted.clone()));
        let result = provider
            .sign_in(&ProviderCredential::GoogleIdToken("token".to_owned()))
            .await;
        assert!(matches!(result, Err(AuthError::MissingApiKey)));
        assert_eq!(provider.current_user(), Some(persisted));
    }

    #[tokio::test]
    async fn sign_out_forgets_user() {
        let provider = FirebaseIdentityProvider::new(None)
            .unwrap()
            .with_user(Some(SignedInUser::new("uid-1".to_owned(), None, None)));
        provider.sign_out().await.unwrap();
        assert_eq!(provider.current_user(), None);
    }
}
