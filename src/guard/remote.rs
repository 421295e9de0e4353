//! Validation of generated SQL for the SDA remote backend.
//!
//! SDA exposes no live schema, so this guard works from a fixed table
//! allowlist plus a banned-keyword scan. Very conservative: the detector
//! is a naive FROM/JOIN scan that over-rejects aliased or exotic queries
//! rather than risk letting anything else through.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, SoilqError};

use super::{has_readonly_prefix, split_series, BackendKind, GuardedQuery};

/// SSURGO tabulars that may be queried through SDA.
pub const REMOTE_TABLE_ALLOWLIST: &[&str] = &[
    "mapunit",
    "component",
    "chorizon",
    "muaggatt",
    "cointerp",
    "sainterp",
    "legend",
    "sacatalog",
    "chtexture",
    "chtexturegrp",
    "chfrags",
];

fn ban_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|CREATE|TRUNCATE|ATTACH|PRAGMA)\b")
            .expect("static regex")
    })
}

fn from_join_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:from|join)\s+([a-z_][a-z0-9_]*)").expect("static regex")
    })
}

/// Validates planner SQL for the remote backend.
///
/// Three independent checks, all mandatory, applied to each statement
/// around the series marker: read-only prefix (with the same no-semicolon
/// rule as the local guard), banned-keyword scan, and the FROM/JOIN table
/// allowlist.
pub fn validate(sql: &str) -> Result<GuardedQuery> {
    if sql.contains(';') {
        return Err(SoilqError::validation("semicolons are forbidden"));
    }

    let parts = split_series(sql);
    let mut checked = 0usize;
    for part in [Some(parts.primary), parts.series].into_iter().flatten() {
        if part.is_empty() {
            continue;
        }
        validate_statement(part)?;
        checked += 1;
    }
    if checked == 0 {
        return Err(SoilqError::validation("empty SQL"));
    }

    Ok(GuardedQuery::approved(sql, BackendKind::Remote))
}

fn validate_statement(sql: &str) -> Result<()> {
    if !has_readonly_prefix(sql) {
        return Err(SoilqError::validation(
            "only SELECT/CTE statements are allowed",
        ));
    }
    if let Some(m) = ban_regex().find(sql) {
        return Err(SoilqError::validation(format!(
            "banned keyword '{}'",
            m.as_str().to_uppercase()
        )));
    }
    for caps in from_join_regex().captures_iter(sql) {
        let table = caps[1].to_lowercase();
        if !REMOTE_TABLE_ALLOWLIST.contains(&table.as_str()) {
            return Err(SoilqError::validation(format!(
                "table '{table}' is not in the SDA allowlist"
            )));
        }
    }
    Ok(())
}
