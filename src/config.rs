use std::env;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com";
/// Upper bound for a relay request body. Base64 grows a photo by a third.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Which `PresentationClient` implementation serves generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationBackend {
    /// Call Gemini directly. Only the relay server process should use this,
    /// since it needs the service key.
    Gemini,
    /// Go through the relay endpoint; the key never leaves the server.
    Relay,
}

impl PresentationBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "direct" => Some(PresentationBackend::Gemini),
            "relay" | "server" => Some(PresentationBackend::Relay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_KEY").ok().filter(|key| !key.is_empty());
        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        let base_url =
            env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());

        GeminiConfig {
            api_key,
            model,
            base_url,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            url: DEFAULT_RELAY_URL.to_string(),
        }
    }
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let url = env::var("RELAY_URL").unwrap_or_else(|_| DEFAULT_RELAY_URL.to_string());
        RelayConfig { url }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Firebase Identity Toolkit project settings.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub api_key: String,
    pub identity_base_url: String,
    pub token_base_url: String,
}

impl IdentityConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        IdentityConfig {
            api_key: api_key.into(),
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            token_base_url: DEFAULT_TOKEN_BASE_URL.to_string(),
        }
    }

    /// `None` when `FIREBASE_API_KEY` is unset: the identity gate is optional.
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("FIREBASE_API_KEY").ok().filter(|key| !key.is_empty())?;
        let mut config = IdentityConfig::new(api_key);
        if let Ok(url) = env::var("IDENTITY_BASE_URL") {
            config.identity_base_url = url;
        }
        if let Ok(url) = env::var("TOKEN_BASE_URL") {
            config.token_base_url = url;
        }
        Some(config)
    }

    pub fn with_base_urls(
        mut self,
        identity_base_url: impl Into<String>,
        token_base_url: impl Into<String>,
    ) -> Self {
        self.identity_base_url = identity_base_url.into();
        self.token_base_url = token_base_url.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub backend: PresentationBackend,
    pub require_auth: bool,
    pub json_logs: bool,
    pub log_file: Option<String>,
    pub max_body_bytes: usize,
    pub gemini: GeminiConfig,
    pub relay: RelayConfig,
    pub identity: Option<IdentityConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            backend: PresentationBackend::Relay,
            require_auth: false,
            json_logs: false,
            log_file: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            gemini: GeminiConfig::default(),
            relay: RelayConfig::default(),
            identity: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let backend = env::var("STUDIO_BACKEND")
            .ok()
            .and_then(|val| PresentationBackend::parse(&val))
            .unwrap_or(PresentationBackend::Relay);
        let require_auth = env::var("REQUIRE_AUTH")
            .ok()
            .map_or(false, |val| val == "true");
        let json_logs = env::var("LOG_FORMAT").ok().map_or(false, |val| val == "json");
        let max_body_bytes = env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        Config {
            port,
            backend,
            require_auth,
            json_logs,
            log_file: env::var("LOG_FILE").ok().filter(|path| !path.is_empty()),
            max_body_bytes,
            gemini: GeminiConfig::from_env(),
            relay: RelayConfig::from_env(),
            identity: IdentityConfig::from_env(),
        }
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(8080)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_backend(mut self, backend: PresentationBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_relay(mut self, config: RelayConfig) -> Self {
        self.relay = config;
        self
    }

    pub fn with_identity(mut self, config: IdentityConfig) -> Self {
        self.identity = Some(config);
        self
    }

    pub fn with_required_auth(mut self, required: bool) -> Self {
        self.require_auth = required;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}
