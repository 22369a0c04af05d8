//! Backend configuration loaded from environment.

use std::time::Duration;

pub const BACKEND_ENV: &str = "FLOATCHAT_BACKEND";
pub const MODEL_ENV: &str = "FLOATCHAT_MODEL";
pub const REMOTE_URL_ENV: &str = "FLOATCHAT_REMOTE_URL";
pub const TOKEN_ENV: &str = "HUGGING_FACE_HUB_TOKEN";
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

pub const DEFAULT_REMOTE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_REMOTE_MODEL: &str = "google/gemma-7b-it";
pub const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";
pub const DEFAULT_LOCAL_MODEL: &str = "phi3:3.8b-mini-4k-instruct-q4_K_M";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Hosted inference API over HTTPS.
    Remote,
    /// Chat service on this machine.
    Local,
}

impl Backend {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Remote => DEFAULT_REMOTE_MODEL,
            Self::Local => DEFAULT_LOCAL_MODEL,
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" | "hosted" | "huggingface" | "hf" => Ok(Self::Remote),
            "local" | "ollama" => Ok(Self::Local),
            other => Err(ConfigError::Invalid(format!(
                "unknown backend {other:?} (expected `remote` or `local`)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: Backend,
    pub model: String,
    /// Bearer token for [`Backend::Remote`]. Ignored by the local backend.
    pub api_token: Option<String>,
    pub remote_url: String,
    pub ollama_host: String,
    /// `None` disables the timeout.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl LlmConfig {
    pub fn remote(model: &str) -> Self {
        Self {
            backend: Backend::Remote,
            model: model.to_string(),
            api_token: None,
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    pub fn local(model: &str) -> Self {
        Self {
            backend: Backend::Local,
            ..Self::remote(model)
        }
    }

    /// Load from environment variables.
    ///
    /// The token is read here, once; a missing token is only an error when
    /// the remote client is constructed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match non_empty_env(BACKEND_ENV) {
            Some(v) => v.parse()?,
            None => Backend::Local,
        };
        let model = non_empty_env(MODEL_ENV).unwrap_or_else(|| backend.default_model().to_string());

        Ok(Self {
            backend,
            model,
            api_token: non_empty_env(TOKEN_ENV),
            remote_url: normalize_base_url(
                &non_empty_env(REMOTE_URL_ENV).unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string()),
                "https",
            ),
            ollama_host: normalize_base_url(
                &non_empty_env(OLLAMA_HOST_ENV).unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
                "http",
            ),
            timeout: Some(DEFAULT_TIMEOUT),
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Add a scheme when missing and drop trailing slashes.
///
/// `OLLAMA_HOST` is commonly set to a bare `host:port`.
pub fn normalize_base_url(url: &str, default_scheme: &str) -> String {
    let url = url.trim();
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{default_scheme}://{url}")
    };
    url.trim_end_matches('/').to_string()
}
