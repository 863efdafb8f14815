//! CLI parsing tests for the dbtctx command
//!
//! Tests that verify CLI argument parsing works correctly.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command for the dbtctx binary
#[allow(deprecated)]
fn dbtctx() -> Command {
    Command::cargo_bin("dbtctx").expect("Failed to find dbtctx binary")
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    dbtctx()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("model"))
        .stdout(predicate::str::contains("models"))
        .stdout(predicate::str::contains("column"))
        .stdout(predicate::str::contains("lineage"))
        .stdout(predicate::str::contains("tags"))
        .stdout(predicate::str::contains("stats"))
        .stdout(predicate::str::contains("context"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    dbtctx()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dbtctx"));
}

// ============================================================================
// Global Options Tests
// ============================================================================

#[test]
fn test_global_options_in_help() {
    dbtctx()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--project-dir"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"))
        .stdout(predicate::str::contains("--warehouse"))
        .stdout(predicate::str::contains("--log-level"))
        .stdout(predicate::str::contains("--cache-size"))
        .stdout(predicate::str::contains("--no-cache"));
}

#[test]
fn test_missing_subcommand_fails() {
    dbtctx().assert().failure();
}

#[test]
fn test_unknown_subcommand_fails() {
    dbtctx()
        .arg("compile")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ============================================================================
// Command Help Tests
// ============================================================================

#[test]
fn test_search_help() {
    dbtctx()
        .args(["search", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tag"))
        .stdout(predicate::str::contains("--schema"))
        .stdout(predicate::str::contains("--materialization"))
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_search_requires_query() {
    dbtctx()
        .arg("search")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<QUERY>"));
}

#[test]
fn test_search_rejects_unknown_output_format() {
    dbtctx()
        .args(["search", "orders", "--output", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_models_help() {
    dbtctx()
        .args(["models", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--schema"))
        .stdout(predicate::str::contains("--materialization"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_context_help() {
    dbtctx()
        .args(["context", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--limit"));
}

#[test]
fn test_cache_size_must_be_a_number() {
    dbtctx()
        .args(["--cache-size", "lots", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_column_requires_both_names() {
    dbtctx()
        .args(["column", "orders"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<COLUMN>"));
}

#[test]
fn test_config_help() {
    dbtctx()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_config_init_help() {
    dbtctx()
        .args(["config", "init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--global"));
}
