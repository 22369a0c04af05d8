//! Terminal and JSON rendering of answers, failures, and store overviews.

use colored::Colorize;
use floatchat_query::{Answer, PipelineError, SqlSource, SummarySource};
use floatchat_store::StoreOverview;
use serde_json::{json, Value};

pub fn print_answer(answer: &Answer) {
    let label = match answer.sql.source {
        SqlSource::Primary => "SQL:".cyan().bold(),
        SqlSource::Fallback => "SQL (fallback):".yellow().bold(),
    };
    println!("{label} {}", answer.sql.text);

    if let Some(recovery) = &answer.recovery {
        println!(
            "{} {}: {}",
            "info:".yellow().bold(),
            recovery.reason,
            recovery.error
        );
    }

    println!();
    println!("{}", answer.result.render_text());
    println!();

    let summary_label = match answer.summary.source {
        SummarySource::Model => "Summary:".green().bold(),
        SummarySource::Canned => "Summary (canned):".yellow().bold(),
    };
    println!("{summary_label} {}", answer.summary.text);
}

pub fn answer_json(answer: &Answer) -> serde_json::Result<Value> {
    serde_json::to_value(answer)
}

/// Structured failure naming the stage that failed.
pub fn error_json(err: &PipelineError) -> Value {
    let mut body = json!({
        "stage": err.stage(),
        "message": err.to_string(),
    });
    if let PipelineError::PipelineFailed {
        reason,
        original_sql,
        original_error,
        fallback_sql,
        fallback_error,
    } = err
    {
        body["reason"] = json!(reason);
        body["original_sql"] = json!(original_sql);
        body["original_error"] = json!(original_error);
        body["fallback_sql"] = json!(fallback_sql);
        body["fallback_error"] = json!(fallback_error);
    }
    json!({ "error": body })
}

pub fn print_overview(overview: &StoreOverview) {
    println!("{} {}", "rows:".cyan().bold(), overview.row_count);
    if overview.years.is_empty() {
        println!("{} none", "years:".cyan().bold());
    } else {
        println!("{} {}", "years:".cyan().bold(), overview.years.join(", "));
    }
    println!("{} {}", "latitude:".cyan().bold(), format_range(overview.latitude_range));
    println!("{} {}", "longitude:".cyan().bold(), format_range(overview.longitude_range));
    println!();
    println!("{}", "Sample rows:".bold());
    println!("{}", overview.sample.render_text());
}

fn format_range(range: Option<(f64, f64)>) -> String {
    match range {
        Some((lo, hi)) => format!("{lo} .. {hi}"),
        None => "n/a".to_string(),
    }
}
