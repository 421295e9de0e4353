//! Validation of generated SQL against the live schema catalog.
//!
//! The local backend has a real database to introspect, so the guard can
//! demand that every referenced table and every qualified column actually
//! exists. Detection is a whole-word regex scan over the raw SQL text.

use regex::Regex;

use crate::catalog::SchemaCatalog;
use crate::error::{Result, SoilqError};

use super::{has_readonly_prefix, split_series, BackendKind, GuardedQuery};

/// Validates planner SQL against the catalog.
///
/// All rules are mandatory and apply to each statement around the series
/// marker:
/// 1. no semicolons anywhere (blocks statement chaining),
/// 2. each part must begin with `WITH` or `SELECT`,
/// 3. each part must reference at least one known table,
/// 4. every qualified `table.column` must exist in the catalog.
pub fn validate(sql: &str, catalog: &SchemaCatalog) -> Result<GuardedQuery> {
    if sql.contains(';') {
        return Err(SoilqError::validation("semicolons are forbidden"));
    }

    let parts = split_series(sql);
    let mut checked = 0usize;
    for part in [Some(parts.primary), parts.series].into_iter().flatten() {
        if part.is_empty() {
            continue;
        }
        validate_statement(part, catalog)?;
        checked += 1;
    }
    if checked == 0 {
        return Err(SoilqError::validation("empty SQL"));
    }

    Ok(GuardedQuery::approved(sql, BackendKind::Local))
}

fn validate_statement(sql: &str, catalog: &SchemaCatalog) -> Result<()> {
    if !has_readonly_prefix(sql) {
        return Err(SoilqError::validation(
            "only SELECT/CTE statements are allowed",
        ));
    }

    let used_tables: Vec<&str> = catalog
        .table_names()
        .filter(|table| whole_word(table).is_match(sql))
        .collect();
    if used_tables.is_empty() {
        return Err(SoilqError::validation("no known SSURGO tables referenced"));
    }

    for table in used_tables {
        let qualified = qualified_column(table);
        for caps in qualified.captures_iter(sql) {
            let column = &caps[1];
            if !catalog.has_column(table, column) {
                return Err(SoilqError::validation(format!(
                    "unknown column {table}.{column}"
                )));
            }
        }
    }

    Ok(())
}

fn whole_word(table: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(table))).expect("escaped table regex")
}

fn qualified_column(table: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\.(\w+)\b", regex::escape(table)))
        .expect("escaped column regex")
}
