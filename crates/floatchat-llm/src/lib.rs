//! FloatChat completion clients
//!
//! One capability, "given a prompt, return generated text", with two
//! concrete backends selected at configuration time:
//!
//! - [`HostedClient`]: a hosted text-generation endpoint, bearer-token auth
//! - [`LocalChatClient`]: a locally running chat service (Ollama `/api/chat`)
//!
//! Neither backend cleans up what the model returns. Fence stripping and
//! validation happen downstream.

pub mod config;
pub mod hosted;
pub mod local;
pub mod scripted;

pub use config::{Backend, ConfigError, LlmConfig};
pub use hosted::HostedClient;
pub use local::LocalChatClient;
pub use scripted::ScriptedClient;

// ============================================================================
// Completion Interface
// ============================================================================

/// How a backend wants its instructions framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// Plain text, sent as a single user message.
    #[default]
    Plain,
    /// Wrapped in `[INST] ... [/INST]` for instruction-tuned raw endpoints.
    Instruct,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: usize,
    pub temperature: f32,
    /// Include the echoed prompt in the output (raw endpoints only).
    pub return_full_text: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            temperature: 0.0,
            return_full_text: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    /// Missing or empty credential. Raised at construction, never per call.
    #[error("auth error: {0}")]
    Auth(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Trait for completion backends
pub trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, CompletionError>;

    fn prompt_style(&self) -> PromptStyle {
        PromptStyle::Plain
    }

    /// Short human-readable identity, e.g. `ollama(http://127.0.0.1:11434) model=phi3`.
    fn describe(&self) -> String;
}

impl<T: CompletionClient + ?Sized> CompletionClient for Box<T> {
    fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, CompletionError> {
        (**self).complete(prompt, options)
    }

    fn prompt_style(&self) -> PromptStyle {
        (**self).prompt_style()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<T: CompletionClient + ?Sized> CompletionClient for std::sync::Arc<T> {
    fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, CompletionError> {
        (**self).complete(prompt, options)
    }

    fn prompt_style(&self) -> PromptStyle {
        (**self).prompt_style()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Build the configured backend.
///
/// Fails with [`CompletionError::Auth`] when the hosted backend is selected
/// without a token, before any request is attempted.
pub fn connect(config: &LlmConfig) -> Result<Box<dyn CompletionClient>, CompletionError> {
    let client: Box<dyn CompletionClient> = match config.backend {
        Backend::Remote => Box::new(HostedClient::new(config)?),
        Backend::Local => Box::new(LocalChatClient::new(config)?),
    };
    tracing::info!(backend = %client.describe(), "completion client ready");
    Ok(client)
}

pub(crate) fn http_client(
    timeout: Option<std::time::Duration>,
) -> Result<reqwest::blocking::Client, CompletionError> {
    let mut builder = reqwest::blocking::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| CompletionError::Transport(format!("failed to build http client: {e}")))
}

/// Keep error bodies short enough to log.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
