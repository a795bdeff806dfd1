//! Identity and session
//!
//! Sign-in is delegated to an external identity provider; this module only holds the result.
//! `Session` is the process-wide holder of the signed-in user that every record operation is
//! scoped to.
pub mod errors;
pub mod firebase;
pub mod provider;
pub mod session;

pub use errors::AuthError;
pub use firebase::FirebaseIdentityProvider;
pub use provider::{IdentityProvider, ProviderCredential, SignedInUser};
pub use session::{AuthState, Session};
