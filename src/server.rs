//! Relay endpoint that keeps the Gemini key on the server.

use crate::{
    auth::{FirebaseIdentity, IdentityProvider},
    config::{Config, DEFAULT_MAX_BODY_BYTES},
    error::{AuthError, Result, StudioError},
    logger,
    models::{ErrorBody, PresentationPayload, PresentationResponse},
    presentation::{GeminiClient, PresentationClient, RELAY_PATH},
};
use actix_web::{
    error::JsonPayloadError,
    http::{header, StatusCode},
    web, App, HttpRequest, HttpResponse, HttpServer, ResponseError,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    generator: Arc<dyn PresentationClient>,
    verifier: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    pub fn new(generator: Arc<dyn PresentationClient>) -> Self {
        Self {
            generator,
            verifier: None,
        }
    }

    /// Every request must carry a bearer token this provider accepts.
    pub fn with_verifier(mut self, verifier: Arc<dyn IdentityProvider>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let state = Self::new(Arc::new(GeminiClient::new(config.gemini.clone())));
        if !config.require_auth {
            return Ok(state);
        }
        let identity = config.identity.clone().ok_or_else(|| {
            StudioError::Config("REQUIRE_AUTH is set but FIREBASE_API_KEY is missing".into())
        })?;
        Ok(state.with_verifier(Arc::new(FirebaseIdentity::new(identity))))
    }
}

impl ResponseError for StudioError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(StudioError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            StudioError::Validation(msg) => msg.clone(),
            StudioError::Encoding(_) | StudioError::Json(_) => {
                "Bad Request: Invalid request body.".to_string()
            }
            StudioError::Auth(AuthError::Unauthenticated) => {
                "Unauthorized: Missing bearer token.".to_string()
            }
            StudioError::Auth(_) => "Unauthorized: Invalid identity token.".to_string(),
            StudioError::TooLarge(_) => {
                "Payload Too Large: The uploaded image is too large.".to_string()
            }
            StudioError::Service(_) | StudioError::Config(_) | StudioError::Io(_) => {
                "Internal Server Error: The AI service failed.".to_string()
            }
        };
        HttpResponse::build(ResponseError::status_code(self)).json(ErrorBody { error })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Body extraction failures answer with the same `{ error }` shape as the handler.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let studio_error = match err {
        JsonPayloadError::OverflowKnownLength { length, limit } => {
            StudioError::TooLarge(format!("{} bytes exceeds the {} byte limit", length, limit))
        }
        JsonPayloadError::Overflow { limit } => {
            StudioError::TooLarge(format!("body exceeds the {} byte limit", limit))
        }
        other => StudioError::Encoding(other.to_string()),
    };
    log::warn!("Rejected request body: {}", studio_error);
    studio_error.into()
}

async fn generate_presentation(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<PresentationPayload>,
) -> std::result::Result<HttpResponse, StudioError> {
    let request_id = Uuid::new_v4();

    if let Some(verifier) = &state.verifier {
        let token = bearer_token(&req).ok_or(AuthError::Unauthenticated)?;
        let user = verifier.lookup(token).await.map_err(|e| {
            log::warn!("[req:{}] rejected identity token: {}", request_id, e);
            e
        })?;
        log::debug!("[req:{}] caller {}", request_id, user.uid);
    }

    let request = payload.into_inner().into_request()?;

    log::info!(
        "[req:{}] generating for brand '{}' ({}, {})",
        request_id,
        request.brand_name,
        request.style,
        request.aspect_ratio
    );

    match state.generator.generate(&request).await {
        Ok(result) => Ok(HttpResponse::Ok().json(PresentationResponse {
            base64_image: Some(result.encoded_image),
        })),
        Err(err) => {
            log::error!("[req:{}] Error calling Gemini API: {}", request_id, err);
            Err(err)
        }
    }
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(ErrorBody {
        error: "Method Not Allowed".to_string(),
    })
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    configure_with_limit(cfg, DEFAULT_MAX_BODY_BYTES);
}

/// Registers the relay routes, accepting bodies up to `max_body_bytes`.
pub fn configure_with_limit(cfg: &mut web::ServiceConfig, max_body_bytes: usize) {
    let json_config = web::JsonConfig::default()
        .limit(max_body_bytes)
        .content_type_required(false)
        .error_handler(json_error);

    cfg.service(
        web::resource(RELAY_PATH)
            .app_data(json_config)
            .route(web::post().to(generate_presentation))
            .default_service(web::to(method_not_allowed)),
    )
    .route("/health", web::get().to(health));
}

pub async fn run(config: Config) -> Result<()> {
    let state = web::Data::new(AppState::from_config(&config)?);
    let port = config.port_or_default();
    let max_body_bytes = config.max_body_bytes;

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), port);
    if config.gemini.api_key.is_none() {
        log::warn!("⚠️  GEMINI_KEY is not set; generation requests will fail with 500");
    }

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(|cfg| configure_with_limit(cfg, max_body_bytes))
    })
        .bind(("0.0.0.0", port))?
        .run()
        .await?;
    Ok(())
}
