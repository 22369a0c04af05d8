//! Scripted client for tests and offline demos.

use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::{CompletionClient, CompletionError, CompletionOptions, PromptStyle};

/// Replays queued outcomes in order and records every prompt it receives.
///
/// Once the script runs out it keeps answering with the fallback outcome,
/// which defaults to a transport error.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    fallback: Result<String, CompletionError>,
    prompts: Mutex<Vec<String>>,
    style: PromptStyle,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Err(CompletionError::Transport("script exhausted".to_string())),
            prompts: Mutex::new(Vec::new()),
            style: PromptStyle::Plain,
        }
    }

    pub fn always(response: &str) -> Self {
        Self {
            fallback: Ok(response.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn failing(error: CompletionError) -> Self {
        Self {
            fallback: Err(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_style(mut self, style: PromptStyle) -> Self {
        self.style = style;
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl CompletionClient for ScriptedClient {
    fn complete(&self, prompt: &str, _options: &CompletionOptions) -> Result<String, CompletionError> {
        self.prompts.lock().push(prompt.to_string());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn prompt_style(&self) -> PromptStyle {
        self.style
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_in_order_then_falls_back() {
        let client = ScriptedClient::new(vec![
            Ok("first".to_string()),
            Err(CompletionError::MalformedResponse("bad".to_string())),
        ]);
        let options = CompletionOptions::default();
        assert_eq!(client.complete("a", &options).unwrap(), "first");
        assert!(matches!(
            client.complete("b", &options),
            Err(CompletionError::MalformedResponse(_))
        ));
        assert!(matches!(
            client.complete("c", &options),
            Err(CompletionError::Transport(_))
        ));
        assert_eq!(client.prompts(), vec!["a", "b", "c"]);
        assert_eq!(client.calls(), 3);
    }

    #[test]
    fn test_always() {
        let client = ScriptedClient::always("SELECT 1");
        for _ in 0..3 {
            assert_eq!(
                client.complete("q", &CompletionOptions::default()).unwrap(),
                "SELECT 1"
            );
        }
    }
}
