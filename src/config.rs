//! Configuration types, built from environment variables.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default HTTP bind port.
pub const DEFAULT_PORT: u16 = 8001;

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Directory for a daily-rolling log file. Stderr only when unset.
    pub log_dir: Option<PathBuf>,
    pub gmail: GmailConfig,
    pub slack: Option<SlackConfig>,
    pub telegram: TelegramConfig,
    pub twilio: Option<TwilioConfig>,
    pub model: ModelConfig,
}

impl AppConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or("COMM_ASSIST_HOST", "127.0.0.1");
        let port = parse_env("COMM_ASSIST_PORT", DEFAULT_PORT)?;
        let log_dir = non_empty_env("COMM_ASSIST_LOG_DIR").map(PathBuf::from);

        Ok(Self {
            host,
            port,
            log_dir,
            gmail: GmailConfig::from_env()?,
            slack: SlackConfig::from_env(),
            telegram: TelegramConfig::from_env()?,
            twilio: TwilioConfig::from_env(),
            model: ModelConfig::from_env()?,
        })
    }
}

/// Gmail adapter configuration.
#[derive(Debug, Clone)]
pub struct GmailConfig {
    /// Google-format OAuth client secrets (`credentials.json`).
    pub credentials_file: PathBuf,
    /// Persisted OAuth credential (`token.json`).
    pub token_file: PathBuf,
    /// Local port for the installed-app OAuth callback.
    pub oauth_port: u16,
    /// Gmail search query bounding the recency window.
    pub query: String,
}

impl GmailConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            credentials_file: PathBuf::from(env_or("GMAIL_CREDENTIALS_FILE", "credentials.json")),
            token_file: PathBuf::from(env_or("GMAIL_TOKEN_FILE", "token.json")),
            oauth_port: parse_env("GMAIL_OAUTH_PORT", 8081)?,
            query: env_or("GMAIL_QUERY", "newer_than:1d"),
        })
    }
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("credentials.json"),
            token_file: PathBuf::from("token.json"),
            oauth_port: 8081,
            query: "newer_than:1d".to_string(),
        }
    }
}

/// Slack adapter configuration. `None` when `SLACK_BOT_TOKEN` is unset.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: SecretString,
}

impl SlackConfig {
    pub fn from_env() -> Option<Self> {
        let bot_token = non_empty_env("SLACK_BOT_TOKEN")?;
        Some(Self {
            bot_token: SecretString::from(bot_token),
        })
    }
}

/// Telegram adapter configuration.
///
/// A missing token is not a startup error; fetches log it and return nothing.
#[derive(Debug, Clone, Default)]
pub struct TelegramConfig {
    pub bot_token: Option<SecretString>,
    /// Only keep messages from this chat when set.
    pub group_chat_id: Option<i64>,
}

impl TelegramConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = non_empty_env("TELEGRAM_BOT_TOKEN").map(SecretString::from);
        let group_chat_id = match non_empty_env("TELEGRAM_GROUP_CHAT_ID") {
            Some(raw) => Some(raw.parse::<i64>().map_err(|e| ConfigError::InvalidValue {
                key: "TELEGRAM_GROUP_CHAT_ID".into(),
                message: format!("{e}"),
            })?),
            None => None,
        };
        Ok(Self {
            bot_token,
            group_chat_id,
        })
    }
}

/// Twilio (WhatsApp) adapter configuration. `None` unless both SID and token are set.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
}

impl TwilioConfig {
    pub fn from_env() -> Option<Self> {
        let account_sid = non_empty_env("TWILIO_ACCOUNT_SID")?;
        let auth_token = non_empty_env("TWILIO_AUTH_TOKEN")?;
        Some(Self {
            account_sid,
            auth_token: SecretString::from(auth_token),
        })
    }
}

/// Which service backs summarization and reply generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelBackend {
    HuggingFace,
    Anthropic,
    OpenAi,
}

impl std::str::FromStr for ModelBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::InvalidValue {
                key: "MODEL_BACKEND".into(),
                message: format!("unknown backend '{other}'"),
            }),
        }
    }
}

/// Summarization / generation model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    /// Hugging Face Inference API token (optional for public models).
    pub hf_api_token: Option<SecretString>,
    pub hf_api_base: String,
    pub summary_model: String,
    pub reply_model: String,
    /// API key for the rig-backed providers.
    pub llm_api_key: Option<SecretString>,
    /// Model name for the rig-backed providers.
    pub llm_model: String,
}

impl ModelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend: ModelBackend = env_or("MODEL_BACKEND", "huggingface").parse()?;

        let (key_var, default_model) = match backend {
            ModelBackend::HuggingFace => ("", ""),
            ModelBackend::Anthropic => ("ANTHROPIC_API_KEY", "claude-3-5-haiku-latest"),
            ModelBackend::OpenAi => ("OPENAI_API_KEY", "gpt-4o-mini"),
        };

        let llm_api_key = if key_var.is_empty() {
            None
        } else {
            Some(SecretString::from(
                non_empty_env(key_var).ok_or_else(|| ConfigError::MissingEnvVar(key_var.into()))?,
            ))
        };

        Ok(Self {
            backend,
            hf_api_token: non_empty_env("HF_API_TOKEN").map(SecretString::from),
            hf_api_base: env_or("HF_API_BASE", "https://api-inference.huggingface.co"),
            summary_model: env_or("SUMMARY_MODEL", "facebook/bart-large-cnn"),
            reply_model: env_or("REPLY_MODEL", "gpt2"),
            llm_api_key,
            llm_model: env_or("LLM_MODEL", default_model),
        })
    }
}

/// Load a `.env` file into the process environment.
///
/// Reads `path` when given, otherwise searches from the working directory up.
/// Variables already set are left alone. Returns the file that was loaded.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    non_empty_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_env(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
