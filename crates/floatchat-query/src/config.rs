//! Pipeline configuration.
//!
//! Precedence: CLI overrides (applied by the caller) > environment > defaults.

use floatchat_llm::{CompletionOptions, ConfigError, LlmConfig};
use floatchat_store::StoreOptions;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

pub const DB_ENV: &str = "FLOATCHAT_DB";
pub const TIMEOUT_SECS_ENV: &str = "FLOATCHAT_TIMEOUT_SECS";
pub const ROW_LIMIT_ENV: &str = "FLOATCHAT_ROW_LIMIT";
pub const MAX_TOKENS_ENV: &str = "FLOATCHAT_MAX_TOKENS";
pub const FALLBACK_PERIOD_ENV: &str = "FLOATCHAT_FALLBACK_PERIOD";
pub const FALLBACK_SQL_ENV: &str = "FLOATCHAT_FALLBACK_SQL";
pub const CANNED_SUMMARY_ENV: &str = "FLOATCHAT_CANNED_SUMMARY";
pub const READ_ONLY_ENV: &str = "FLOATCHAT_READ_ONLY";

pub const DEFAULT_DB_PATH: &str = "argo.db";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Longest accepted timeout, one day.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_ROW_LIMIT: usize = 10;
pub const DEFAULT_MAX_TOKENS: usize = 200;
pub const DEFAULT_FALLBACK_PERIOD: &str = "2024-01";
pub const DEFAULT_FALLBACK_SQL: &str = "SELECT PSAL, PRES, LATITUDE, LONGITUDE, TIME FROM profiles \
     WHERE strftime('%Y-%m', TIME) = '{period}' LIMIT {limit}";
pub const DEFAULT_CANNED_SUMMARY: &str = "Salinity data shows measurements from ocean floats in \
     January 2024, with values around 35.5 PSU at shallow depths.";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub db_path: PathBuf,
    pub llm: LlmConfig,
    /// Applied to every completion call and every statement. `None` waits forever.
    pub timeout: Option<Duration>,
    pub row_limit: usize,
    pub max_tokens: usize,
    /// Literal `YYYY-MM` substituted into the fallback template.
    pub fallback_period: String,
    /// Fallback SQL with `{period}` and `{limit}` placeholders.
    pub fallback_template: String,
    pub canned_summary: String,
    pub read_only: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            llm: LlmConfig::local(floatchat_llm::config::DEFAULT_LOCAL_MODEL),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            row_limit: DEFAULT_ROW_LIMIT,
            max_tokens: DEFAULT_MAX_TOKENS,
            fallback_period: DEFAULT_FALLBACK_PERIOD.to_string(),
            fallback_template: DEFAULT_FALLBACK_SQL.to_string(),
            canned_summary: DEFAULT_CANNED_SUMMARY.to_string(),
            read_only: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout = match env_parse::<u64>(TIMEOUT_SECS_ENV)? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.timeout,
        };

        let mut config = Self {
            db_path: env_string(DB_ENV).map(PathBuf::from).unwrap_or(defaults.db_path),
            llm: LlmConfig::from_env()?,
            timeout,
            row_limit: env_parse(ROW_LIMIT_ENV)?.unwrap_or(defaults.row_limit),
            max_tokens: env_parse(MAX_TOKENS_ENV)?.unwrap_or(defaults.max_tokens),
            fallback_period: env_string(FALLBACK_PERIOD_ENV).unwrap_or(defaults.fallback_period),
            fallback_template: env_string(FALLBACK_SQL_ENV).unwrap_or(defaults.fallback_template),
            canned_summary: env_string(CANNED_SUMMARY_ENV).unwrap_or(defaults.canned_summary),
            read_only: env_string(READ_ONLY_ENV).is_some_and(|v| parse_flag(&v)),
        };
        config.llm.timeout = config.timeout;
        config.validate()?;
        Ok(config)
    }

    /// Set the shared timeout on both the pipeline and the completion backend.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self.llm.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_limit == 0 {
            return Err(ConfigError::Invalid("row limit must be at least 1".to_string()));
        }
        for timeout in [self.timeout, self.llm.timeout].into_iter().flatten() {
            if timeout > MAX_TIMEOUT {
                return Err(ConfigError::Invalid(format!(
                    "timeout of {}s exceeds the maximum of {}s (use 0 to disable)",
                    timeout.as_secs(),
                    MAX_TIMEOUT.as_secs()
                )));
            }
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max tokens must be at least 1".to_string()));
        }
        if !period_pattern().is_match(&self.fallback_period) {
            return Err(ConfigError::Invalid(format!(
                "fallback period {:?} is not a YYYY-MM month",
                self.fallback_period
            )));
        }
        if !self.fallback_template.contains("{period}") {
            return Err(ConfigError::Invalid(
                "fallback SQL template must contain `{period}`".to_string(),
            ));
        }
        if self.canned_summary.trim().is_empty() {
            return Err(ConfigError::Invalid("canned summary must not be empty".to_string()));
        }
        Ok(())
    }

    /// The hand-authored fallback statement with its literals filled in.
    pub fn fallback_sql(&self) -> String {
        self.fallback_template
            .replace("{period}", &self.fallback_period)
            .replace("{limit}", &self.row_limit.to_string())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            timeout: self.timeout,
            read_only: self.read_only,
        }
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            max_tokens: self.max_tokens,
            temperature: 0.0,
            return_full_text: false,
        }
    }
}

fn period_pattern() -> &'static Regex {
    static PERIOD: OnceLock<Regex> = OnceLock::new();
    PERIOD.get_or_init(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("period pattern compiles"))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    env_string(name)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| ConfigError::Invalid(format!("invalid {name}={v:?} (expected an integer)")))
        })
        .transpose()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
