use crate::{
    auth::IdentityProvider,
    config::IdentityConfig,
    error::{AuthError, Result, StudioError},
    models::{Credential, SignedIn, User},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

/// Firebase Identity Toolkit over REST.
#[derive(Clone)]
pub struct FirebaseIdentity {
    client: Client,
    config: IdentityConfig,
}

impl FirebaseIdentity {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn accounts_url(&self, action: &str) -> String {
        format!(
            "{}/v1/accounts:{}?key={}",
            self.config.identity_base_url.trim_end_matches('/'),
            action,
            self.config.api_key
        )
    }

    async fn post_accounts<T: DeserializeOwned>(&self, action: &str, body: Value) -> Result<T> {
        let response = self
            .client
            .post(self.accounts_url(action))
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Other(format!("identity request failed: {}", e)))?;
        read_response(response).await
    }

    async fn session_from(&self, action: &str, body: Value) -> Result<SignedIn> {
        let account: AccountResponse = self.post_accounts(action, body).await?;
        log::info!("Identity {} succeeded for {}", action, account.local_id);
        Ok(account.into_signed_in())
    }
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let code = serde_json::from_str::<ProviderError>(&text)
            .map(|err| err.error.message)
            .unwrap_or_else(|_| format!("status {}", status.as_u16()));
        log::warn!("Identity provider rejected request: {}", code);
        return Err(AuthError::from_provider_code(&code).into());
    }
    response
        .json()
        .await
        .map_err(|e| StudioError::Auth(AuthError::Other(format!("invalid identity response: {}", e))))
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SignedIn> {
        self.session_from(
            "signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    async fn sign_in_with_idp(&self, provider_id: &str, id_token: &str) -> Result<SignedIn> {
        self.session_from(
            "signInWithIdp",
            json!({
                "postBody": format!("id_token={}&providerId={}", id_token, provider_id),
                "requestUri": "http://localhost",
                "returnIdpCredential": true,
                "returnSecureToken": true
            }),
        )
        .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignedIn> {
        self.session_from(
            "signUp",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let url = format!(
            "{}/v1/token?key={}",
            self.config.token_base_url.trim_end_matches('/'),
            self.config.api_key
        );
        let response = self
            .client
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credential.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Other(format!("token refresh failed: {}", e)))?;

        let refreshed: RefreshResponse = read_response(response).await?;
        log::debug!("Refreshed id token for {}", refreshed.user_id);
        Ok(Credential::new(
            refreshed.id_token,
            refreshed.refresh_token,
            parse_expiry(&refreshed.expires_in),
        ))
    }

    async fn lookup(&self, id_token: &str) -> Result<User> {
        let found: LookupResponse = self
            .post_accounts("lookup", json!({ "idToken": id_token }))
            .await?;
        found
            .users
            .into_iter()
            .next()
            .map(|account| User {
                uid: account.local_id,
                email: account.email,
                display_name: account.display_name,
            })
            .ok_or_else(|| AuthError::InvalidToken("no account for token".into()).into())
    }
}

fn parse_expiry(expires_in: &str) -> i64 {
    expires_in.parse().unwrap_or(3600)
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
}

impl AccountResponse {
    fn into_signed_in(self) -> SignedIn {
        let expires_in = parse_expiry(&self.expires_in);
        SignedIn {
            user: User {
                uid: self.local_id,
                email: self.email.filter(|email| !email.is_empty()),
                display_name: self.display_name.filter(|name| !name.is_empty()),
            },
            credential: Credential::new(self.id_token, self.refresh_token, expires_in),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: String,
    #[serde(default)]
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupAccount {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}
