use crate::{
    auth::{IdentityProvider, TokenSource},
    error::{AuthError, Result},
    models::{SignedIn, User},
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Tokens expiring within this window are refreshed before use.
const REFRESH_SKEW_SECS: i64 = 300;

/// Identity context shared by everything that needs to know who is signed in.
///
/// Cloning shares the same state. Subscribers are notified on sign-in and
/// sign-out, not on silent token refreshes.
#[derive(Clone)]
pub struct Session {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<Option<SignedIn>>>,
}

impl Session {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            provider,
            state: Arc::new(state),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().as_ref().map(|signed_in| signed_in.user.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<User> {
        let signed_in = self.provider.sign_in_with_password(email, password).await?;
        Ok(self.publish(signed_in))
    }

    pub async fn sign_in_with_idp(&self, provider_id: &str, id_token: &str) -> Result<User> {
        let signed_in = self.provider.sign_in_with_idp(provider_id, id_token).await?;
        Ok(self.publish(signed_in))
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
        let signed_in = self.provider.sign_up(email, password).await?;
        Ok(self.publish(signed_in))
    }

    pub fn sign_out(&self) {
        let was_signed_in = self.state.send_replace(None).is_some();
        if was_signed_in {
            log::info!("Signed out");
        }
    }

    /// Starts listening for identity changes. Dropping the subscription
    /// unsubscribes.
    pub fn subscribe(&self) -> IdentitySubscription {
        IdentitySubscription {
            receiver: self.state.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    fn publish(&self, signed_in: SignedIn) -> User {
        let user = signed_in.user.clone();
        log::info!("Signed in as {}", user.email.as_deref().unwrap_or(&user.uid));
        self.state.send_replace(Some(signed_in));
        user
    }
}

#[async_trait]
impl TokenSource for Session {
    async fn bearer_token(&self) -> Result<String> {
        let credential = self
            .state
            .borrow()
            .as_ref()
            .map(|signed_in| signed_in.credential.clone())
            .ok_or(AuthError::Unauthenticated)?;

        if !credential.expires_within(Utc::now(), Duration::seconds(REFRESH_SKEW_SECS)) {
            return Ok(credential.id_token);
        }

        let fresh = self.provider.refresh(&credential).await?;
        let token = fresh.id_token.clone();
        self.state.send_if_modified(|state| {
            // Only replace the credential we refreshed; a concurrent sign-out wins.
            if let Some(signed_in) = state {
                if signed_in.credential.refresh_token == credential.refresh_token {
                    signed_in.credential = fresh;
                }
            }
            false
        });
        Ok(token)
    }
}

/// Receiver side of [`Session::subscribe`].
pub struct IdentitySubscription {
    receiver: watch::Receiver<Option<SignedIn>>,
}

impl IdentitySubscription {
    pub fn current(&self) -> Option<User> {
        self.receiver
            .borrow()
            .as_ref()
            .map(|signed_in| signed_in.user.clone())
    }

    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Marks the current identity as seen and returns it.
    pub fn acknowledge(&mut self) -> Option<User> {
        self.receiver
            .borrow_and_update()
            .as_ref()
            .map(|signed_in| signed_in.user.clone())
    }

    /// Waits for the next sign-in or sign-out. `None` once the session is gone.
    pub async fn changed(&mut self) -> Option<Option<User>> {
        self.receiver.changed().await.ok()?;
        Some(self.current())
    }

    /// Stream of identities, starting with the current one.
    pub fn into_stream(self) -> impl Stream<Item = Option<User>> {
        WatchStream::new(self.receiver)
            .map(|state| state.map(|signed_in| signed_in.user))
    }

    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credential;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeProvider {
        refreshes: AtomicUsize,
        expires_in: i64,
    }

    impl FakeProvider {
        fn signed_in(&self, email: &str) -> SignedIn {
            SignedIn {
                user: User {
                    uid: format!("uid-{}", email),
                    email: Some(email.to_string()),
                    display_name: None,
                },
                credential: Credential::new("id-0", "refresh-0", self.expires_in),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SignedIn> {
            if password == "wrong" {
                return Err(AuthError::WrongPassword.into());
            }
            Ok(self.signed_in(email))
        }

        async fn sign_in_with_idp(&self, _provider_id: &str, _id_token: &str) -> Result<SignedIn> {
            Ok(self.signed_in("google@atelier.sn"))
        }

        async fn sign_up(&self, email: &str, _password: &str) -> Result<SignedIn> {
            Ok(self.signed_in(email))
        }

        async fn refresh(&self, _credential: &Credential) -> Result<Credential> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Credential::new(format!("id-{}", n), "refresh-0", 3600))
        }

        async fn lookup(&self, _id_token: &str) -> Result<User> {
            Err(AuthError::InvalidToken("unused".into()).into())
        }
    }

    fn session(expires_in: i64) -> (Session, Arc<FakeProvider>) {
        let provider = Arc::new(FakeProvider {
            expires_in,
            ..Default::default()
        });
        (Session::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn test_sign_in_and_out_notifies_subscribers() {
        let (session, _) = session(3600);
        let mut sub = session.subscribe();
        assert_eq!(sub.current(), None);

        session.sign_in_with_password("awa@atelier.sn", "pw").await.unwrap();
        let user = sub.changed().await.unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("awa@atelier.sn"));

        session.sign_out();
        assert_eq!(sub.changed().await, Some(None));
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn test_failed_sign_in_keeps_state() {
        let (session, _) = session(3600);
        let err = session
            .sign_in_with_password("awa@atelier.sn", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::StudioError::Auth(AuthError::WrongPassword)));
        assert_eq!(session.current_user(), None);
    }

    #[tokio::test]
    async fn test_unsubscribe_on_drop() {
        let (session, _) = session(3600);
        let first = session.subscribe();
        let second = session.subscribe();
        assert_eq!(session.subscriber_count(), 2);

        first.unsubscribe();
        drop(second);
        assert_eq!(session.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_bearer_token_requires_sign_in() {
        let (session, _) = session(3600);
        let err = session.bearer_token().await.unwrap_err();
        assert!(matches!(err, crate::error::StudioError::Auth(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_fresh_token_is_not_refreshed() {
        let (session, provider) = session(3600);
        session.sign_in_with_idp("google.com", "g-token").await.unwrap();
        assert_eq!(session.bearer_token().await.unwrap(), "id-0");
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed_silently() {
        let (session, provider) = session(60);
        session.sign_up("new@atelier.sn", "longpassword").await.unwrap();
        let sub = session.subscribe();

        assert_eq!(session.bearer_token().await.unwrap(), "id-1");
        assert_eq!(session.bearer_token().await.unwrap(), "id-1");
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
        assert!(!sub.has_changed());
    }

    #[tokio::test]
    async fn test_stream_yields_current_then_changes() {
        let (session, _) = session(3600);
        let mut stream = Box::pin(session.subscribe().into_stream());
        assert_eq!(stream.next().await, Some(None));

        session.sign_in_with_password("awa@atelier.sn", "pw").await.unwrap();
        let next = stream.next().await.unwrap();
        assert_eq!(next.unwrap().uid, "uid-awa@atelier.sn");
    }
}
