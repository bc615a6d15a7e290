pub mod gemini_client;
pub mod relay_client;

use crate::{
    auth::TokenSource,
    config::{Config, PresentationBackend},
    error::Result,
    models::{GenerationRequest, GenerationResult},
};
use async_trait::async_trait;
use std::sync::Arc;

pub use gemini_client::GeminiClient;
pub use relay_client::{RelayClient, RELAY_PATH};

/// Sends one generation request to a remote service.
///
/// Implementations validate the request before touching the network and make
/// exactly one attempt per call.
#[async_trait]
pub trait PresentationClient: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;

    fn name(&self) -> &'static str;
}

/// Picks the implementation named by `config.backend`.
pub fn build_client(
    config: &Config,
    token_source: Option<Arc<dyn TokenSource>>,
) -> Arc<dyn PresentationClient> {
    match config.backend {
        PresentationBackend::Gemini => Arc::new(GeminiClient::new(config.gemini.clone())),
        PresentationBackend::Relay => {
            let client = RelayClient::new(config.relay.clone());
            match token_source {
                Some(source) => Arc::new(client.with_token_source(source)),
                None => Arc::new(client),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfig;

    #[test]
    fn test_build_client_follows_config() {
        let relay = build_client(&Config::new(), None);
        assert_eq!(relay.name(), "relay");

        let gemini = build_client(
            &Config::new()
                .with_backend(PresentationBackend::Gemini)
                .with_gemini(GeminiConfig::new().with_api_key("key")),
            None,
        );
        assert_eq!(gemini.name(), "gemini");
    }
}
