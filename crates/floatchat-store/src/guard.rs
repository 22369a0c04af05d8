//! Optional statement-type allowlist.
//!
//! Generated SQL is untrusted. The store's own parser is the authority on
//! whether a statement is valid; this guard only answers "is it a single
//! query", and is enabled explicitly through [`crate::StoreOptions`].

use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

/// Why a statement was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardRejection {
    #[error("statement could not be parsed: {0}")]
    Unparseable(String),
    #[error("expected exactly one statement, found {0}")]
    StatementCount(usize),
    #[error("only SELECT queries are allowed, found {0}")]
    NotAQuery(String),
}

/// Accept exactly one query statement (`SELECT`, `WITH ... SELECT`, `VALUES`).
pub fn check_read_only(sql: &str) -> Result<(), GuardRejection> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, sql)
        .map_err(|e| GuardRejection::Unparseable(e.to_string()))?;

    match statements.as_slice() {
        [Statement::Query(_)] => Ok(()),
        [other] => Err(GuardRejection::NotAQuery(statement_kind(other))),
        many => Err(GuardRejection::StatementCount(many.len())),
    }
}

fn statement_kind(stmt: &Statement) -> String {
    stmt.to_string()
        .split_whitespace()
        .next()
        .unwrap_or("statement")
        .to_ascii_uppercase()
}
