use crate::{
    config::GeminiConfig,
    error::{Result, StudioError},
    logger,
    models::{GenerationRequest, GenerationResult},
    presentation::PresentationClient,
    prompt,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Calls Gemini `generateContent` with the server-held key.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl PresentationClient for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        request.validate()?;

        // Checked per call so a server without the key still boots and answers 500.
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            log::error!("GEMINI_KEY environment variable not set.");
            StudioError::Config("API key is not configured on the server.".into())
        })?;

        let body = GeminiRequest::from_generation_request(request);
        let _timer = logger::timer("gemini generateContent");
        log::info!(
            "Generating presentation with model: {} (style: {}, ratio: {})",
            self.config.model,
            request.style,
            request.aspect_ratio
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StudioError::Service(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::error!("Error calling Gemini API: {} - {}", status, text);
            return Err(StudioError::Service(format!(
                "Gemini returned status {}",
                status.as_u16()
            )));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| StudioError::Service(format!("invalid Gemini response: {}", e)))?;

        gemini_response
            .first_image()
            .map(|encoded_image| GenerationResult { encoded_image })
            .ok_or_else(|| StudioError::Service("No image data found in the API response.".into()))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_generation_request(request: &GenerationRequest) -> Self {
        let garment = RequestPart::InlineData {
            inline_data: InlineData {
                mime_type: request.content_type.clone(),
                data: request.encoded_image.clone(),
            },
        };
        let instruction = RequestPart::Text {
            text: prompt::build_prompt(request.style, &request.brand_name, request.aspect_ratio),
        };

        Self {
            contents: vec![GeminiContent {
                parts: vec![garment, instruction],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

impl GeminiResponse {
    fn first_image(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|part| part.inline_data)
            .map(|inline| inline.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AspectRatio, PresentationStyle};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerationRequest {
        GenerationRequest {
            encoded_image: "Z2FybWVudA==".into(),
            content_type: "image/jpeg".into(),
            brand_name: "Adama Paris".into(),
            style: PresentationStyle::LuxuryBoutique,
            aspect_ratio: AspectRatio::Portrait,
        }
    }

    fn client(server: &MockServer, key: Option<&str>) -> GeminiClient {
        let mut config = GeminiConfig::new().with_base_url(server.uri());
        config.api_key = key.map(String::from);
        GeminiClient::new(config)
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(GeminiRequest::from_generation_request(&request())).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "Z2FybWVudA==");
        assert!(parts[1]["text"].as_str().unwrap().contains("luxurious boutique"));
        assert_eq!(body["generationConfig"]["responseModalities"], json!(["IMAGE"]));
    }

    #[test]
    fn test_first_image_skips_text_parts() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here is your image" },
                    { "inlineData": { "mimeType": "image/png", "data": "UE5H" } }
                ]}
            }]
        }))
        .unwrap();
        assert_eq!(response.first_image().as_deref(), Some("UE5H"));
    }

    #[tokio::test]
    async fn test_generate_returns_inline_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
            .and(header("x-goog-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "R0VO" } }
                ]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server, Some("secret")).generate(&request()).await.unwrap();
        assert_eq!(result.encoded_image, "R0VO");
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, None).generate(&request()).await.unwrap_err();
        assert!(matches!(err, StudioError::Config(_)));
    }

    #[tokio::test]
    async fn test_no_image_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "sorry" }] } }]
            })))
            .mount(&server)
            .await;

        let err = client(&server, Some("k")).generate(&request()).await.unwrap_err();
        assert!(matches!(err, StudioError::Service(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, Some("k")).generate(&request()).await.unwrap_err();
        assert!(matches!(err, StudioError::Service(msg) if msg.contains("503")));
    }
}
