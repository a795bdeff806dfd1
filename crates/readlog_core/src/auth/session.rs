use crate::auth::provider::{IdentityProvider, ProviderCredential, SignedInUser};
use log::{error, info};
use std::sync::Arc;
use tokio::sync::watch;

/// Observable authentication state, `error` holds the status string of the last failed attempt
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user_id: Option<String>,
    pub error: Option<String>,
}

impl AuthState {
    fn signed_in(user: &SignedInUser) -> Self {
        Self {
            is_authenticated: true,
            user_id: Some(user.user_id.clone()),
            error: None,
        }
    }
}

/// The process-wide session. It is the only writer of its `AuthState`.
pub struct Session {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<AuthState>,
}

impl Session {
    /// Creates the session, picking up a user the provider already knows about
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once per program run"
    )]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let initial = provider.current_user().map_or_else(
            || {
                info!("No current user");
                AuthState::default()
            },
            |user| {
                info!("Current user found: {}", user.user_id);
                AuthState::signed_in(&user)
            },
        );
        let (state, _) = watch::channel(initial);
        Self { provider, state }
    }

    #[inline]
    #[must_use]
    pub fn current_user_id(&self) -> Option<String> {
        self.state.borrow().user_id.clone()
    }

    /// The full signed-in user as the identity provider reports it
    #[inline]
    #[must_use]
    pub fn current_user(&self) -> Option<SignedInUser> {
        self.provider.current_user()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Signs in with the given credential. On failure the previous session stays in place and
    /// only `error` is updated.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn sign_in(&self, credential: &ProviderCredential) -> Option<String> {
        info!("Starting sign in with credential");
        match self.provider.sign_in(credential).await {
            Ok(user) => {
                info!("Sign in successful: {}", user.user_id);
                let signed_in = AuthState::signed_in(&user);
                self.state.send_modify(|state| *state = signed_in);
                Some(user.user_id)
            }
            Err(err) => {
                error!("Sign in error: {err}");
                self.state
                    .send_modify(|state| state.error = Some(format!("Sign-in failed: {err}")));
                None
            }
        }
    }

    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub async fn sign_out(&self) {
        match self.provider.sign_out().await {
            Ok(()) => {
                info!("Sign out successful");
                self.state.send_modify(|state| *state = AuthState::default());
            }
            Err(err) => {
                error!("Sign out error: {err}");
                self.state
                    .send_modify(|state| state.error = Some(format!("Sign-out failed: {err}")));
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::errors::AuthError;
    use pretty_assertions::assert_eq;

    /// Accepts ID tokens of the form `uid:<user id>` and rejects everything else
    pub(crate) struct StubProvider {
        user: parking_lot::RwLock<Option<SignedInUser>>,
    }

    impl StubProvider {
        pub(crate) fn signed_in_as(user_id: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                user: parking_lot::RwLock::new(
                    user_id.map(|id| SignedInUser::new(id.to_owned(), None, None)),
                ),
            })
        }
    }

    #[async_trait::async_trait]
    impl IdentityProvider for StubProvider {
        fn current_user(&self) -> Option<SignedInUser> {
            self.user.read().clone()
        }

        async fn sign_in(
            &self,
            credential: &ProviderCredential,
        ) -> Result<SignedInUser, AuthError> {
            let ProviderCredential::GoogleIdToken(token) = credential else {
                return Err(AuthError::Rejected("unsupported credential".to_owned()));
            };
            let user_id = token
                .strip_prefix("uid:")
                .ok_or_else(|| AuthError::Rejected("INVALID_ID_TOKEN".to_owned()))?;
            let user = SignedInUser::new(user_id.to_owned(), None, None);
            *self.user.write() = Some(user.clone());
            Ok(user)
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            *self.user.write() = None;
            Ok(())
        }
    }

    #[test]
    fn starts_from_provider_user() {
        let session = Session::new(StubProvider::signed_in_as(Some("alice")));
        assert_eq!(session.current_user_id().as_deref(), Some("alice"));
        assert!(session.state().is_authenticated);

        let anonymous = Session::new(StubProvider::signed_in_as(None));
        assert_eq!(anonymous.state(), AuthState::default());
    }

    #[tokio::test]
    async fn sign_in_sets_user() {
        let session = Session::new(StubProvider::signed_in_as(None));
        let user_id = session
            .sign_in(&ProviderCredential::GoogleIdToken("uid:bob".to_owned()))
            .await;
        assert_eq!(user_id.as_deref(), Some("bob"));
        assert_eq!(
            session.state(),
            AuthState {
                is_authenticated: true,
                user_id: Some("bob".to_owned()),
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn failed_sign_in_keeps_previous_session() {
        let session = Session::new(StubProvider::signed_in_as(Some("alice")));
        let result = session
            .sign_in(&ProviderCredential::GoogleIdToken("garbage".to_owned()))
            .await;
        assert_eq!(result, None);

        let state = session.state();
        assert_eq!(state.user_id.as_deref(), Some("alice"));
        assert!(state.is_authenticated);
        assert!(state.error.unwrap().starts_with("Sign-in failed"));
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let session = Session::new(StubProvider::signed_in_as(Some("alice")));
        let mut changes = session.subscribe();
        session.sign_out().await;
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), AuthState::default());
        assert_eq!(session.current_user_id(), None);
        assert_eq!(session.current_user(), None);
    }
}
