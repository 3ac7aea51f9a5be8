//! Error types for Comm Assist.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by platform adapters while talking to an upstream API.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} is not configured: {reason}")]
    NotConfigured { name: String, reason: String },

    #[error("Channel {name} API error: {reason}")]
    Api { name: String, reason: String },

    #[error("Invalid response from {name}: {reason}")]
    InvalidResponse { name: String, reason: String },

    #[error("Authentication failed for channel {name}: {reason}")]
    AuthFailed { name: String, reason: String },

    #[error("OAuth error: {0}")]
    OAuth(#[from] AuthError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ChannelError {
    pub(crate) fn api(name: &str, reason: impl Into<String>) -> Self {
        Self::Api {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Summarization / generation service errors.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model {model} request failed: {reason}")]
    RequestFailed { model: String, reason: String },

    #[error("Invalid response from {model}: {reason}")]
    InvalidResponse { model: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// OAuth flow and token storage errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to read client secrets from {path}: {reason}")]
    ClientSecrets { path: String, reason: String },

    #[error("OAuth callback failed: {0}")]
    Callback(String),

    #[error("OAuth callback timed out after {0:?}")]
    CallbackTimeout(std::time::Duration),

    #[error("Token endpoint error: {0}")]
    TokenEndpoint(String),

    #[error("Token file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
