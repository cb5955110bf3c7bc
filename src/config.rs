use std::env;
use std::fmt;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Credential and model settings, loaded for every consultation request.
#[derive(Clone)]
pub struct ServerConfiguration {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl ServerConfiguration {
    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let api_url = env::var("OPENAI_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let model = env::var("OPENAI_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let max_tokens = match env::var("OPENAI_MAX_TOKENS") {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                log::warn!("⚠️ OPENAI_MAX_TOKENS={} is not a number, using {}", value, DEFAULT_MAX_TOKENS);
                DEFAULT_MAX_TOKENS
            }),
            Err(_) => DEFAULT_MAX_TOKENS,
        };

        Self {
            api_key,
            api_url,
            model,
            max_tokens,
        }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

// Keeps the key out of logs and panic messages
impl fmt::Debug for ServerConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfiguration")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Process-wide settings for the HTTP listener, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub max_body_bytes: usize,
}

impl ServerSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let max_body_bytes = match env::var("MAX_BODY_BYTES") {
            Ok(value) => match value.parse::<usize>() {
                Ok(bytes) if bytes > 0 => bytes,
                _ => anyhow::bail!("MAX_BODY_BYTES must be a positive integer, got '{}'", value),
            },
            Err(_) => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            bind_addr,
            max_body_bytes,
        })
    }
}
