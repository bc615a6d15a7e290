use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Signed-in account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Identity token with its refresh token and expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Builds a credential from the provider's `expiresIn` seconds.
    pub fn new(
        id_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: i64,
    ) -> Self {
        Credential {
            id_token: id_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    /// True when the token expires within `skew` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expires_at - skew <= now
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub user: User,
    pub credential: Credential,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_window() {
        let credential = Credential::new("id", "refresh", 3600);
        let now = Utc::now();
        assert!(!credential.expires_within(now, Duration::minutes(5)));
        assert!(credential.expires_within(now + Duration::minutes(56), Duration::minutes(5)));
    }
}
