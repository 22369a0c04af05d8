//! FloatChat CLI
//!
//! Ask natural-language questions about ARGO float profiles:
//! - `ask`: one question, answered with SQL, rows, and a summary
//! - `chat`: an interactive loop of independent questions
//! - `inspect`: sample rows, years, and coordinate ranges of the store
//! - `load`: populate the `profiles` table from JSON or JSON-lines rows

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use floatchat_llm::config::MODEL_ENV;
use floatchat_llm::Backend;
use floatchat_query::{Pipeline, PipelineConfig};
use floatchat_store::{LoadMode, ProfileStore};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod chat;
mod render;

#[derive(Parser)]
#[command(name = "floatchat")]
#[command(author, version, about = "FloatChat: ask questions about ARGO ocean float data")]
struct Cli {
    #[command(flatten)]
    overrides: ConfigArgs,
    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the environment.
#[derive(Args, Debug, Clone, Default)]
struct ConfigArgs {
    /// SQLite database path (env: FLOATCHAT_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Completion backend: `remote` or `local` (env: FLOATCHAT_BACKEND)
    #[arg(long, global = true)]
    backend: Option<String>,
    /// Model identifier (env: FLOATCHAT_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,
    /// Timeout in seconds for completion calls and SQL execution; 0 disables
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Reject anything but a single SELECT statement
    #[arg(long, global = true)]
    read_only: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question.
    Ask {
        /// The question, e.g. "Show me salinity profiles in January 2024"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        /// Print the answer (or the structured failure) as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Interactive session; one independent answer per line.
    Chat,

    /// Show sample rows, available years, and coordinate ranges.
    Inspect {
        #[arg(long)]
        json: bool,
    },

    /// Load profile rows from a JSON array or JSON-lines file.
    ///
    /// Rows with any missing value are dropped. The table is replaced unless
    /// `--append` is given.
    Load {
        input: PathBuf,
        #[arg(long)]
        append: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli.overrides)?;

    match cli.command {
        Commands::Ask { question, json } => cmd_ask(config, &question.join(" "), json),
        Commands::Chat => {
            let pipeline = Pipeline::from_config(config)?;
            chat::cmd_chat(&pipeline)
        }
        Commands::Inspect { json } => cmd_inspect(&config, json),
        Commands::Load { input, append } => cmd_load(&config, &input, append),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("floatchat=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment first, then command-line overrides.
fn load_config(args: &ConfigArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env()?;

    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }
    if let Some(raw) = &args.backend {
        let backend: Backend = raw.parse()?;
        // The default model differs per backend.
        if args.model.is_none() && std::env::var_os(MODEL_ENV).is_none() {
            config.llm.model = backend.default_model().to_string();
        }
        config.llm.backend = backend;
    }
    if let Some(model) = &args.model {
        config.llm.model = model.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }
    if args.read_only {
        config.read_only = true;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_ask(config: PipelineConfig, question: &str, json: bool) -> Result<()> {
    let outcome = Pipeline::from_config(config).and_then(|pipeline| pipeline.answer(question));

    match outcome {
        Ok(answer) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&render::answer_json(&answer)?)?);
            } else {
                render::print_answer(&answer);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&render::error_json(&e))?);
            }
            Err(anyhow!("{} stage failed: {e}", e.stage()))
        }
    }
}

fn cmd_inspect(config: &PipelineConfig, json: bool) -> Result<()> {
    let store = ProfileStore::open_existing(&config.db_path, config.store_options())?;
    let overview = store.overview()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else {
        println!(
            "{} {}",
            "Inspecting".green().bold(),
            config.db_path.display()
        );
        render::print_overview(&overview);
    }
    Ok(())
}

fn cmd_load(config: &PipelineConfig, input: &Path, append: bool) -> Result<()> {
    let mode = if append {
        LoadMode::Append
    } else {
        LoadMode::Replace
    };
    println!(
        "{} {} → {}",
        "Loading".green().bold(),
        input.display(),
        config.db_path.display()
    );
    let store = ProfileStore::open(&config.db_path, config.store_options())?;
    let report = store
        .load_file(input, mode)
        .map_err(|e| anyhow!("failed to load {}: {e}", input.display()))?;
    println!(
        "{} read {}, inserted {}, dropped {} incomplete",
        "ok".green().bold(),
        report.read,
        report.inserted,
        report.dropped
    );
    Ok(())
}
