//! Hosted text-generation endpoint (Hugging Face Inference API shape).
//!
//! Request:  `POST {base}/{model}` with `{"inputs": .., "parameters": {..}}`
//! Response: `[{"generated_text": ".."}]`

use reqwest::blocking::Client;
use serde_json::json;

use crate::{http_client, truncate, CompletionClient, CompletionError, CompletionOptions, LlmConfig, PromptStyle};

pub struct HostedClient {
    client: Client,
    url: String,
    token: String,
    model: String,
}

impl std::fmt::Debug for HostedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HostedClient {
    /// Fails with [`CompletionError::Auth`] when no token is configured.
    pub fn new(config: &LlmConfig) -> Result<Self, CompletionError> {
        let token = config
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CompletionError::Auth(format!(
                    "hosted backend requires {} (set it in your environment)",
                    crate::config::TOKEN_ENV
                ))
            })?
            .to_string();

        Ok(Self {
            client: http_client(config.timeout)?,
            url: format!("{}/{}", config.remote_url.trim_end_matches('/'), config.model),
            token,
            model: config.model.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CompletionClient for HostedClient {
    fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, CompletionError> {
        let mut parameters = json!({
            "max_new_tokens": options.max_tokens,
            "return_full_text": options.return_full_text,
        });
        // The endpoint rejects temperature 0; greedy decoding is its default.
        if options.temperature > 0.0 {
            parameters["temperature"] = json!(options.temperature);
        }
        let body = json!({ "inputs": prompt, "parameters": parameters });

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .map_err(|e| CompletionError::Transport(format!("request to {} failed: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(CompletionError::Transport(format!(
                "http {status}: {}",
                truncate(&text, 200)
            )));
        }

        let data: serde_json::Value = response
            .json()
            .map_err(|e| CompletionError::MalformedResponse(format!("invalid JSON: {e}")))?;
        extract_generated_text(&data)
    }

    fn prompt_style(&self) -> PromptStyle {
        PromptStyle::Instruct
    }

    fn describe(&self) -> String {
        format!("hosted({}) model={}", self.url, self.model)
    }
}

fn extract_generated_text(data: &serde_json::Value) -> Result<String, CompletionError> {
    data.get(0)
        .and_then(|first| first.get("generated_text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CompletionError::MalformedResponse(format!(
                "expected `[{{\"generated_text\": ..}}]`, got {}",
                truncate(&data.to_string(), 120)
            ))
        })
}
