//! Optional identity gate: who is signed in, and the bearer token sent with
//! generation requests.

pub mod firebase;
pub mod session;

use crate::{
    error::Result,
    models::{Credential, SignedIn, User},
};
use async_trait::async_trait;

pub use firebase::FirebaseIdentity;
pub use session::{IdentitySubscription, Session};

/// Remote identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SignedIn>;

    /// Exchanges a credential obtained interactively (e.g. a Google id token
    /// from an OAuth popup) for a session.
    async fn sign_in_with_idp(&self, provider_id: &str, id_token: &str) -> Result<SignedIn>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignedIn>;

    async fn refresh(&self, credential: &Credential) -> Result<Credential>;

    /// Resolves an id token to its account. Used by the relay to verify callers.
    async fn lookup(&self, id_token: &str) -> Result<User>;
}

/// Supplies the bearer token for an outgoing request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Result<String>;
}
