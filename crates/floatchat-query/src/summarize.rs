//! Natural-language digest of a query result.

use floatchat_llm::{CompletionClient, CompletionOptions};
use floatchat_store::QueryResult;
use serde::Serialize;

use crate::prompt::{PromptBuilder, PromptMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Model,
    Canned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub text: String,
    pub source: SummarySource,
}

impl Summary {
    pub fn canned(text: &str) -> Self {
        Self {
            text: text.to_string(),
            source: SummarySource::Canned,
        }
    }
}

/// Wraps the completion client in summarization mode.
///
/// Never fails: any completion error, or an empty reply, degrades to the
/// canned sentence.
pub struct Summarizer<'a> {
    client: &'a dyn CompletionClient,
    prompts: &'a PromptBuilder,
    options: &'a CompletionOptions,
    canned: &'a str,
}

impl<'a> Summarizer<'a> {
    pub fn new(
        client: &'a dyn CompletionClient,
        prompts: &'a PromptBuilder,
        options: &'a CompletionOptions,
        canned: &'a str,
    ) -> Self {
        Self {
            client,
            prompts,
            options,
            canned,
        }
    }

    pub fn summarize(&self, question: &str, result: &QueryResult) -> Summary {
        let prompt = match self.prompts.build(question, PromptMode::Summarization(result)) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "summary prompt rejected, using canned summary");
                return Summary::canned(self.canned);
            }
        };

        match self.client.complete(&prompt, self.options) {
            Ok(text) if !text.trim().is_empty() => Summary {
                text: text.trim().to_string(),
                source: SummarySource::Model,
            },
            Ok(_) => {
                tracing::warn!("model returned an empty summary, using canned summary");
                Summary::canned(self.canned)
            }
            Err(e) => {
                tracing::warn!(error = %e, "summarization unavailable, using canned summary");
                Summary::canned(self.canned)
            }
        }
    }
}
