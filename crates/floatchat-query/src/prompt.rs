//! Prompt construction for SQL generation and result summarization.

use floatchat_llm::PromptStyle;
use floatchat_store::{QueryResult, SchemaDescriptor};

use crate::PipelineError;

/// Date filters must use this expression so month filters stay comparable
/// across generated and fallback SQL.
pub const DATE_FILTER_CONVENTION: &str = "strftime('%Y-%m', TIME)";

/// Rows of a result rendered into a summarization prompt.
pub const MAX_SUMMARY_ROWS: usize = 50;

#[derive(Debug, Clone, Copy)]
pub enum PromptMode<'a> {
    SqlGeneration,
    Summarization(&'a QueryResult),
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    schema_text: String,
    row_limit: usize,
    style: PromptStyle,
}

impl PromptBuilder {
    pub fn new(schema: &SchemaDescriptor, row_limit: usize, style: PromptStyle) -> Self {
        Self {
            schema_text: schema.render(),
            row_limit,
            style,
        }
    }

    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }

    /// Fails with [`PipelineError::InvalidInput`] on a blank question.
    pub fn build(&self, question: &str, mode: PromptMode<'_>) -> Result<String, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::InvalidInput("question is empty".to_string()));
        }

        let body = match mode {
            PromptMode::SqlGeneration => self.sql_generation(question),
            PromptMode::Summarization(result) => summarization(question, result),
        };
        Ok(match self.style {
            PromptStyle::Plain => body,
            PromptStyle::Instruct => format!("[INST] {body} [/INST]"),
        })
    }

    fn sql_generation(&self, question: &str) -> String {
        format!(
            "You are an assistant that translates natural language questions into SQL for a \
             SQLite database with the following schema:\n\
             {schema}\n\
             Given the user question: {question}\n\n\
             Generate a single valid SQLite SELECT query that retrieves the relevant data.\n\
             - Return only the SQL query string: no explanations, no prose, no markdown code fences.\n\
             - Limit the result to {limit} rows.\n\
             - Use {convention} for date filtering, e.g. {convention} = '2024-01'.",
            schema = self.schema_text,
            limit = self.row_limit,
            convention = DATE_FILTER_CONVENTION,
        )
    }
}

fn summarization(question: &str, result: &QueryResult) -> String {
    let mut table = result.head(MAX_SUMMARY_ROWS).render_text();
    if result.len() > MAX_SUMMARY_ROWS {
        table.push_str(&format!(
            "\n({} more rows omitted)",
            result.len() - MAX_SUMMARY_ROWS
        ));
    }
    format!(
        "Summarize the following ocean float measurements for a non-technical user in plain \
         language. Mention what was measured, when, where, and typical values. Do not mention \
         SQL or tables.\n\
         Question: {question}\n\
         Results ({rows} rows):\n\
         {table}",
        rows = result.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use floatchat_store::Scalar;

    fn builder(style: PromptStyle) -> PromptBuilder {
        PromptBuilder::new(&SchemaDescriptor::argo_profiles(), 10, style)
    }

    #[test]
    fn test_sql_prompt_embeds_schema_question_and_constraints() {
        let b = builder(PromptStyle::Plain);
        let prompt = b
            .build("Show salinity profiles in January 2024", PromptMode::SqlGeneration)
            .unwrap();
        assert!(prompt.contains(b.schema_text()));
        assert!(prompt.contains("Given the user question: Show salinity profiles in January 2024"));
        assert!(prompt.contains("Limit the result to 10 rows"));
        assert!(prompt.contains("strftime('%Y-%m', TIME)"));
        assert!(prompt.contains("no markdown"));
        assert!(!prompt.starts_with("[INST]"));
    }

    #[test]
    fn test_instruct_style_wraps() {
        let prompt = builder(PromptStyle::Instruct)
            .build("deepest readings", PromptMode::SqlGeneration)
            .unwrap();
        assert!(prompt.starts_with("[INST] "));
        assert!(prompt.ends_with(" [/INST]"));
    }

    #[test]
    fn test_empty_question_is_invalid_input() {
        let b = builder(PromptStyle::Plain);
        for q in ["", "   \n"] {
            assert!(matches!(
                b.build(q, PromptMode::SqlGeneration),
                Err(PipelineError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_summary_prompt_embeds_rendered_result() {
        let mut result = QueryResult::new(vec!["PSAL".into(), "PRES".into()]);
        result.push_row(vec![Scalar::Real(35.5), Scalar::Real(5.0)]);
        let prompt = builder(PromptStyle::Plain)
            .build("salinity in January 2024", PromptMode::Summarization(&result))
            .unwrap();
        assert!(prompt.contains("non-technical"));
        assert!(prompt.contains("Question: salinity in January 2024"));
        assert!(prompt.contains("Results (1 rows):"));
        assert!(prompt.contains(&result.render_text()));
    }

    #[test]
    fn test_summary_prompt_truncates_long_results() {
        let mut result = QueryResult::new(vec!["n".into()]);
        for i in 0..(MAX_SUMMARY_ROWS as i64 + 7) {
            result.push_row(vec![Scalar::Integer(i)]);
        }
        let prompt = builder(PromptStyle::Plain)
            .build("numbers", PromptMode::Summarization(&result))
            .unwrap();
        assert!(prompt.contains("(7 more rows omitted)"));
    }
}
