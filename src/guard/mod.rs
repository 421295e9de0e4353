//! SQL guardrails for planner-generated queries.
//!
//! Untrusted, machine-generated SQL must be approved by the guard matching
//! its execution backend before it can run: the local guard validates
//! against the live schema catalog, the remote guard against a static
//! allowlist. Both are conservative lexical checks over the raw SQL text,
//! not parsers; they may over-reject but must never under-reject.

pub mod local;
pub mod remote;

use std::sync::OnceLock;

use regex::Regex;

/// Separator between the primary mapunit SELECT and the optional
/// per-component SELECT in planner output.
pub const SERIES_MARKER: &str = "---SERIES---";

/// A planner SQL text split on [`SERIES_MARKER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlParts<'a> {
    /// The mapunit-level SELECT. May be empty for series-only plans.
    pub primary: &'a str,
    /// The per-component SELECT, when the marker is present.
    pub series: Option<&'a str>,
}

/// Splits planner SQL into its primary and optional series part.
pub fn split_series(sql: &str) -> SqlParts<'_> {
    match sql.split_once(SERIES_MARKER) {
        Some((primary, series)) => SqlParts {
            primary: primary.trim(),
            series: Some(series.trim()),
        },
        None => SqlParts {
            primary: sql.trim(),
            series: None,
        },
    }
}

/// Which execution backend a query was approved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Embedded SQLite database.
    Local,
    /// SDA-style remote tabular web service.
    Remote,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// A SQL query that passed its backend's guard.
///
/// The constructor is private to this module: the only way to obtain a
/// `GuardedQuery` is through [`local::validate`] or [`remote::validate`],
/// so an executor can never be handed unapproved SQL.
#[derive(Debug, Clone)]
pub struct GuardedQuery {
    sql: String,
    backend: BackendKind,
}

impl GuardedQuery {
    fn approved(sql: impl Into<String>, backend: BackendKind) -> Self {
        Self {
            sql: sql.into(),
            backend,
        }
    }

    /// The approved SQL text (may still contain [`SERIES_MARKER`]).
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The backend this query was approved for.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }
}

/// A join edge between two SSURGO tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPair {
    pub left_table: &'static str,
    pub left_key: &'static str,
    pub right_table: &'static str,
    pub right_key: &'static str,
}

/// Join edges the planner is expected to use.
///
/// Advisory only: neither guard consults this list during validation.
/// It is kept so join-path enforcement can be switched on later without
/// re-deriving the legal paths.
pub const ALLOWED_JOIN_PAIRS: &[JoinPair] = &[
    JoinPair {
        left_table: "mapunit",
        left_key: "mukey",
        right_table: "component",
        right_key: "mukey",
    },
    JoinPair {
        left_table: "component",
        left_key: "cokey",
        right_table: "chorizon",
        right_key: "cokey",
    },
    // MU-level direct
    JoinPair {
        left_table: "mapunit",
        left_key: "mukey",
        right_table: "muaggatt",
        right_key: "mukey",
    },
];

/// Returns true if the given join edge appears in [`ALLOWED_JOIN_PAIRS`],
/// in either direction. Advisory; not called from validation.
pub fn join_pair_allowed(
    left_table: &str,
    left_key: &str,
    right_table: &str,
    right_key: &str,
) -> bool {
    ALLOWED_JOIN_PAIRS.iter().any(|p| {
        (p.left_table == left_table
            && p.left_key == left_key
            && p.right_table == right_table
            && p.right_key == right_key)
            || (p.left_table == right_table
                && p.left_key == right_key
                && p.right_table == left_table
                && p.right_key == left_key)
    })
}

/// Returns true if the SQL begins with `WITH` or `SELECT` after leading
/// whitespace, case-insensitive. The read-only surface both guards demand.
pub(crate) fn has_readonly_prefix(sql: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)^\s*(with|select)\b").expect("static regex"));
    re.is_match(sql)
}
