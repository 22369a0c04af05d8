//! Interactive question loop.
//!
//! Uses `rustyline` for line editing by default. A plain stdin loop is used
//! when built with `--no-default-features`. Every question is answered
//! independently; nothing carries over between turns.

use anyhow::Result;
use colored::Colorize;
use floatchat_query::{Pipeline, PipelineError};

use crate::render;

const PROMPT: &str = "floatchat> ";

pub fn cmd_chat(pipeline: &Pipeline) -> Result<()> {
    println!("{}", "FloatChat".green().bold());
    println!(
        "Ask about ARGO float profiles. Backend: {}. Type `exit` to quit.\n",
        pipeline.client().describe()
    );

    #[cfg(feature = "repl-rustyline")]
    {
        chat_rustyline(pipeline)
    }
    #[cfg(not(feature = "repl-rustyline"))]
    {
        chat_simple(pipeline)
    }
}

enum ChatControl {
    Continue,
    Exit,
}

fn handle_line(pipeline: &Pipeline, line: &str) -> ChatControl {
    let line = line.trim();
    if matches!(line, "exit" | "quit" | ":q") {
        return ChatControl::Exit;
    }
    if line.is_empty() {
        eprintln!("{} Please enter a question.", "warning:".yellow().bold());
        return ChatControl::Continue;
    }

    match pipeline.answer(line) {
        Ok(answer) => render::print_answer(&answer),
        Err(PipelineError::InvalidInput(_)) => {
            eprintln!("{} Please enter a question.", "warning:".yellow().bold());
        }
        Err(e) => eprintln!("{} [{}] {e}", "error:".red().bold(), e.stage()),
    }
    println!();
    ChatControl::Continue
}

#[cfg(feature = "repl-rustyline")]
fn chat_rustyline(pipeline: &Pipeline) -> Result<()> {
    use anyhow::anyhow;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    let mut rl = DefaultEditor::new().map_err(|e| anyhow!("failed to init rustyline: {e}"))?;
    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => return Err(anyhow!("readline error: {e}")),
        };
        if !line.trim().is_empty() {
            rl.add_history_entry(line.trim())
                .map_err(|e| anyhow!("failed to record history: {e}"))?;
        }
        if let ChatControl::Exit = handle_line(pipeline, &line) {
            break;
        }
    }
    Ok(())
}

#[cfg(not(feature = "repl-rustyline"))]
fn chat_simple(pipeline: &Pipeline) -> Result<()> {
    use std::io::{self, Write};

    let stdin = io::stdin();
    loop {
        print!("{}", PROMPT.cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        if let ChatControl::Exit = handle_line(pipeline, &line) {
            break;
        }
    }
    Ok(())
}
