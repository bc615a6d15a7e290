use crate::{
    auth::TokenSource,
    config::RelayConfig,
    error::{AuthError, Result, StudioError},
    models::{ErrorBody, GenerationRequest, GenerationResult, PresentationResponse},
    presentation::PresentationClient,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;

pub const RELAY_PATH: &str = "/api/generateFashionPresentation";

/// Posts requests to the relay server. The Gemini key stays on the server.
#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    config: RelayConfig,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl RelayClient {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            token_source: None,
        }
    }

    /// Attaches `Authorization: Bearer` from the identity gate on every call.
    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), RELAY_PATH)
    }
}

#[async_trait]
impl PresentationClient for RelayClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        request.validate()?;

        let mut builder = self.client.post(self.endpoint()).json(&request.to_payload());
        if let Some(source) = &self.token_source {
            let token = source.bearer_token().await?;
            builder = builder.bearer_auth(token);
        }

        log::debug!("Posting generation request to {}", self.endpoint());

        let response = builder
            .send()
            .await
            .map_err(|e| StudioError::Service(format!("relay request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("request failed with status {}", status.as_u16()),
            };
            log::error!("Relay answered {}: {}", status, message);
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(AuthError::InvalidToken(message).into());
            }
            return Err(StudioError::Service(message));
        }

        let body: PresentationResponse = response
            .json()
            .await
            .map_err(|e| StudioError::Service(format!("invalid relay response: {}", e)))?;

        body.base64_image
            .filter(|image| !image.is_empty())
            .map(|encoded_image| GenerationResult { encoded_image })
            .ok_or_else(|| StudioError::Service("No image was returned by the service.".into()))
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}
