//! Guard properties exercised across both backends.

use soilq::catalog::SchemaCatalog;
use soilq::guard::{local, remote};

fn catalog() -> SchemaCatalog {
    SchemaCatalog::from_tables([
        ("mapunit", vec!["mukey"]),
        ("component", vec!["mukey", "cokey", "comppct_r"]),
    ])
}

#[test]
fn test_both_guards_reject_any_semicolon() {
    for sql in [
        "SELECT mukey FROM mapunit;",
        "SELECT mukey FROM mapunit; SELECT 1",
        ";",
        "WITH x AS (SELECT 1) SELECT * FROM x; --",
    ] {
        assert!(local::validate(sql, &catalog()).is_err(), "local: {sql:?}");
        assert!(remote::validate(sql).is_err(), "remote: {sql:?}");
    }
}

#[test]
fn test_both_guards_reject_non_select_prefix() {
    for sql in [
        "DELETE FROM mapunit",
        "  INSERT INTO mapunit VALUES (1)",
        "EXPLAIN SELECT mukey FROM mapunit",
        "VACUUM",
    ] {
        assert!(local::validate(sql, &catalog()).is_err(), "local: {sql:?}");
        assert!(remote::validate(sql).is_err(), "remote: {sql:?}");
    }
}

#[test]
fn test_both_guards_accept_leading_whitespace() {
    let sql = "\n   SELECT mukey FROM mapunit";
    assert!(local::validate(sql, &catalog()).is_ok());
    assert!(remote::validate(sql).is_ok());
}

#[test]
fn test_local_guard_column_knowledge() {
    let err = local::validate("SELECT component.bogus FROM component", &catalog()).unwrap_err();
    assert!(err.to_string().contains("unknown column component.bogus"));

    assert!(local::validate("SELECT component.cokey FROM component", &catalog()).is_ok());
}

#[test]
fn test_remote_guard_bans_keywords_behind_select() {
    for kw in [
        "DROP", "DELETE", "INSERT", "UPDATE", "ALTER", "CREATE", "TRUNCATE", "ATTACH", "PRAGMA",
    ] {
        let sql = format!("SELECT mukey FROM mapunit WHERE note = '{kw} something'");
        assert!(remote::validate(&sql).is_err(), "{kw} must be rejected");
    }
}

#[test]
fn test_remote_guard_enforces_table_allowlist() {
    assert!(remote::validate("SELECT x FROM sysobjects").is_err());
    assert!(remote::validate("SELECT mukey FROM mapunit JOIN users ON 1=1").is_err());
    assert!(remote::validate(
        "SELECT mukey FROM mapunit JOIN muaggatt ON mapunit.mukey = muaggatt.mukey"
    )
    .is_ok());
}

#[test]
fn test_guards_tag_queries_with_their_backend() {
    let local_q = local::validate("SELECT mukey FROM mapunit", &catalog()).unwrap();
    let remote_q = remote::validate("SELECT mukey FROM mapunit").unwrap();
    assert_ne!(local_q.backend(), remote_q.backend());
}
