//! Local chat service (Ollama native `/api/chat`).

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{http_client, truncate, CompletionClient, CompletionError, CompletionOptions, LlmConfig};

pub struct LocalChatClient {
    client: Client,
    host: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl LocalChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self, CompletionError> {
        Ok(Self {
            client: http_client(config.timeout)?,
            host: config.ollama_host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.host)
    }
}

impl CompletionClient for LocalChatClient {
    fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, CompletionError> {
        let url = self.chat_url();
        let body = json!({
            "model": self.model,
            "stream": false,
            "messages": [{ "role": "user", "content": prompt }],
            "options": {
                "temperature": options.temperature,
                "num_predict": options.max_tokens,
            }
        });

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            CompletionError::Transport(format!(
                "failed to reach local model service at {url} (is it running?): {e}"
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(CompletionError::Transport(format!(
                "http {status}: {}",
                truncate(&text, 200)
            )));
        }

        let text = response
            .text()
            .map_err(|e| CompletionError::Transport(format!("failed to read response: {e}")))?;
        let out: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            CompletionError::MalformedResponse(format!(
                "expected `message.content` ({e}): {}",
                truncate(&text, 120)
            ))
        })?;
        Ok(out.message.content)
    }

    fn describe(&self) -> String {
        format!("ollama({}) model={}", self.host, self.model)
    }
}
