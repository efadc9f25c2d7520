use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// Why the environment could not be turned into a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The OpenAI-compatible completion providers the service can talk to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    OpenRouter,
    Gemini,
}

impl Provider {
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Startup settings for the API host.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_path: PathBuf,
    pub store_quota_bytes: Option<usize>,
    pub provider: Provider,
    /// The key for `provider`, checked to be present.
    pub api_key: String,
    pub chat_model: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub handoff_url: Option<String>,
}

impl Config {
    /// Reads every setting, applying defaults where a variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Tests control the environment themselves.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let store_path = std::env::var("STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./pathwise-store.json"));

        let store_quota_bytes = match std::env::var("STORE_QUOTA_BYTES") {
            Ok(raw) => Some(raw.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue("STORE_QUOTA_BYTES".to_string(), e.to_string())
            })?),
            Err(_) => None,
        };

        let provider_str =
            std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openrouter".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "openai" => Provider::OpenAI,
            "openrouter" => Provider::OpenRouter,
            "gemini" => Provider::Gemini,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{}' is not one of openai, openrouter, gemini", other),
                ));
            }
        };

        let api_key = std::env::var(provider.key_var()).map_err(|_| {
            ConfigError::MissingVar(format!(
                "{} must be set for '{}' provider",
                provider.key_var(),
                provider_str.to_lowercase()
            ))
        })?;

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "openai/gpt-4o-mini".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        let handoff_url = std::env::var("HANDOFF_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            bind_address,
            store_path,
            store_quota_bytes,
            provider,
            api_key,
            chat_model,
            log_level,
            prompts_path,
            handoff_url,
        })
    }
}
