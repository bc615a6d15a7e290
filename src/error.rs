use thiserror::Error;

/// Failures reported by the identity provider, one variant per user-facing case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no account matches this email")]
    UserNotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error("an account already exists for this email")]
    EmailAlreadyInUse,
    #[error("password is too weak")]
    WeakPassword,
    #[error("no signed-in user")]
    Unauthenticated,
    #[error("identity token rejected: {0}")]
    InvalidToken(String),
    #[error("identity provider error: {0}")]
    Other(String),
}

impl AuthError {
    /// Maps an Identity Toolkit error code (`EMAIL_NOT_FOUND`, `WEAK_PASSWORD : ...`)
    /// onto a variant.
    pub fn from_provider_code(code: &str) -> Self {
        let head = code.split(':').next().unwrap_or(code).trim();
        match head {
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => AuthError::UserNotFound,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => AuthError::WrongPassword,
            "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse,
            "WEAK_PASSWORD" => AuthError::WeakPassword,
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_DISABLED" => {
                AuthError::InvalidToken(head.to_string())
            }
            _ => AuthError::Other(code.to_string()),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::UserNotFound => "No account was found with this email address.",
            AuthError::WrongPassword => "The password is incorrect.",
            AuthError::EmailAlreadyInUse => "This email address is already in use.",
            AuthError::WeakPassword => "The password must contain at least 6 characters.",
            AuthError::Unauthenticated => "Please sign in to generate a presentation.",
            AuthError::InvalidToken(_) => "Your session has expired. Please sign in again.",
            AuthError::Other(_) => "Authentication failed. Please try again.",
        }
    }
}

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Request too large: {0}")]
    TooLarge(String),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StudioError {
    /// The single message shown to the designer for any failed cycle.
    pub fn user_message(&self) -> String {
        match self {
            StudioError::Encoding(_) => {
                "The uploaded image could not be processed. Please try another file.".to_string()
            }
            StudioError::Validation(msg) => msg.clone(),
            StudioError::Service(_) => {
                "Image generation failed. The AI model may be busy. Please try again.".to_string()
            }
            StudioError::TooLarge(_) => {
                "The image is too large. Please upload a smaller photo.".to_string()
            }
            StudioError::Auth(err) => err.user_message().to_string(),
            StudioError::Config(_) | StudioError::Io(_) | StudioError::Json(_) => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }

    /// HTTP status the relay answers with when this error ends a request.
    pub fn status_code(&self) -> u16 {
        match self {
            StudioError::Validation(_) | StudioError::Encoding(_) | StudioError::Json(_) => 400,
            StudioError::Auth(_) => 401,
            StudioError::TooLarge(_) => 413,
            StudioError::Service(_) | StudioError::Config(_) | StudioError::Io(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
