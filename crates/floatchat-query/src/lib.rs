//! FloatChat query pipeline: natural-language questions over ARGO profiles
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        QUESTION → ANSWER                             │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  question ──► PromptBuilder ──► CompletionClient ──► extract_sql     │
//! │                   ▲                                       │          │
//! │             SchemaDescriptor                              ▼          │
//! │                                     fallback SQL ──► ProfileStore    │
//! │                                     (once)                │          │
//! │                                                           ▼          │
//! │  Answer ◄── Summarizer ◄── PromptBuilder ◄──────── QueryResult       │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Pipeline::answer`] always terminates in an [`Answer`] or a
//! [`PipelineError`]. The model is asked for SQL once; on failure the
//! configured fallback statement runs once; a failed summary degrades to a
//! canned sentence.

pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompt;
pub mod summarize;

pub use config::PipelineConfig;
pub use error::{PipelineError, RecoveryReason};
pub use extract::extract_sql;
pub use pipeline::{Answer, GeneratedSql, Pipeline, PipelineState, Recovery, SqlSource};
pub use prompt::{PromptBuilder, PromptMode, DATE_FILTER_CONVENTION, MAX_SUMMARY_ROWS};
pub use summarize::{Summarizer, Summary, SummarySource};
