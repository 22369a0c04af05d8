//! Fallback orchestrator.
//!
//! ```text
//!  Start ─► GeneratingSql ─► Executing ─► Summarizing ─► Done
//!                 │              │   ▲
//!                 └──────┬───────┘   │ once
//!                        ▼           │
//!                  ErrorRecovery ────┘ ─► (fallback fails) ─► Failed
//! ```
//!
//! The model is asked for SQL exactly once per question. Any failure on the
//! primary path substitutes the configured fallback statement, which is
//! executed exactly once. Summarization never fails the request.

use floatchat_llm::{CompletionClient, CompletionOptions};
use floatchat_store::{ProfileStore, QueryResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, RecoveryReason};
use crate::extract::extract_sql;
use crate::prompt::{PromptBuilder, PromptMode};
use crate::summarize::{Summarizer, Summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Start,
    GeneratingSql,
    Executing,
    ErrorRecovery,
    Summarizing,
    Done,
    /// Terminal: the fallback statement failed too.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlSource {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedSql {
    pub text: String,
    pub source: SqlSource,
}

/// What went wrong on the primary path before the fallback succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recovery {
    pub reason: RecoveryReason,
    /// The extracted statement, when generation got that far.
    pub original_sql: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub sql: GeneratedSql,
    pub result: QueryResult,
    pub summary: Summary,
    pub recovery: Option<Recovery>,
    /// States visited, in order.
    pub trace: Vec<PipelineState>,
}

pub struct Pipeline {
    client: Box<dyn CompletionClient>,
    store: Arc<ProfileStore>,
    prompts: PromptBuilder,
    options: CompletionOptions,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("client", &self.client.describe())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        client: Box<dyn CompletionClient>,
        store: Arc<ProfileStore>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let prompts = PromptBuilder::new(store.schema(), config.row_limit, client.prompt_style());
        Ok(Self {
            options: config.completion_options(),
            client,
            store,
            prompts,
            config,
        })
    }

    /// Connect the configured backend, then open the existing store.
    ///
    /// A missing database file is a startup error. A missing hosted-backend token fails here with
    /// [`PipelineError::Auth`], before any prompt is built.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let client = floatchat_llm::connect(&config.llm)?;
        let store = Arc::new(ProfileStore::open_existing(&config.db_path, config.store_options())?);
        Self::new(client, store, config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ProfileStore> {
        &self.store
    }

    pub fn client(&self) -> &dyn CompletionClient {
        self.client.as_ref()
    }

    /// Answer one question: generate, execute, recover once, summarize.
    pub fn answer(&self, question: &str) -> Result<Answer, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::InvalidInput("question is empty".to_string()));
        }
        let started = Instant::now();
        let mut trace = vec![PipelineState::Start];

        enter(&mut trace, PipelineState::GeneratingSql);
        let primary = match self.generate_sql(question) {
            Ok(sql) => {
                enter(&mut trace, PipelineState::Executing);
                match self.store.execute(&sql) {
                    Ok(result) => Ok((sql, result)),
                    Err(e) => Err(Recovery {
                        reason: RecoveryReason::ExecutionFailed,
                        original_sql: Some(sql),
                        error: e.to_string(),
                    }),
                }
            }
            Err(error) => Err(Recovery {
                reason: RecoveryReason::GenerationFailed,
                original_sql: None,
                error,
            }),
        };

        let (sql, result, recovery) = match primary {
            Ok((sql, result)) => (
                GeneratedSql {
                    text: sql,
                    source: SqlSource::Primary,
                },
                result,
                None,
            ),
            Err(recovery) => {
                let (sql, result) = self.recover(&recovery, &mut trace)?;
                (sql, result, Some(recovery))
            }
        };

        enter(&mut trace, PipelineState::Summarizing);
        let summary = Summarizer::new(
            self.client.as_ref(),
            &self.prompts,
            &self.options,
            &self.config.canned_summary,
        )
        .summarize(question, &result);

        enter(&mut trace, PipelineState::Done);
        tracing::info!(
            source = ?sql.source,
            rows = result.len(),
            summary = ?summary.source,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answered question"
        );

        Ok(Answer {
            question: question.to_string(),
            sql,
            result,
            summary,
            recovery,
            trace,
        })
    }

    /// Build the prompt, ask the model once, extract the statement.
    fn generate_sql(&self, question: &str) -> Result<String, String> {
        let prompt = self
            .prompts
            .build(question, PromptMode::SqlGeneration)
            .map_err(|e| e.to_string())?;
        let raw = self
            .client
            .complete(&prompt, &self.options)
            .map_err(|e| e.to_string())?;
        let sql = extract_sql(&raw);
        if sql.is_empty() {
            return Err("model returned no SQL".to_string());
        }
        tracing::debug!(sql = %sql, "generated SQL");
        Ok(sql)
    }

    /// Run the fallback statement exactly once.
    fn recover(
        &self,
        recovery: &Recovery,
        trace: &mut Vec<PipelineState>,
    ) -> Result<(GeneratedSql, QueryResult), PipelineError> {
        enter(trace, PipelineState::ErrorRecovery);
        let fallback_sql = self.config.fallback_sql();
        tracing::warn!(
            reason = %recovery.reason,
            error = %recovery.error,
            fallback_sql = %fallback_sql,
            "primary path failed, substituting fallback SQL"
        );

        enter(trace, PipelineState::Executing);
        match self.store.execute(&fallback_sql) {
            Ok(result) => Ok((
                GeneratedSql {
                    text: fallback_sql,
                    source: SqlSource::Fallback,
                },
                result,
            )),
            Err(e) => {
                enter(trace, PipelineState::Failed);
                tracing::error!(error = %e, "fallback SQL failed");
                Err(PipelineError::PipelineFailed {
                    reason: recovery.reason,
                    original_sql: recovery.original_sql.clone(),
                    original_error: recovery.error.clone(),
                    fallback_sql,
                    fallback_error: e.to_string(),
                })
            }
        }
    }
}

fn enter(trace: &mut Vec<PipelineState>, state: PipelineState) {
    tracing::debug!(stage = ?state, "pipeline transition");
    trace.push(state);
}
