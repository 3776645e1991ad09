// domain-lookup/tests/cli_integration.rs

//! CLI tests that need no network access.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::NamedTempFile;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("domain-lookup").unwrap();
    cmd.env_remove("DL_MODE")
        .env_remove("DL_CONFIG")
        .env_remove("DL_STATIC_TABLE");
    cmd
}

fn config_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    fs::write(file.path(), content).expect("Failed to write to temp file");
    file
}

#[test]
fn test_help_lists_flags() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--deadline"))
        .stdout(predicate::str::contains("--static-table"));
}

#[test]
fn test_no_domains_is_usage_error() {
    cli()
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one domain"));
}

#[test]
fn test_invalid_domain_json_output() {
    cli()
        .args(["192.168.1.1", "--json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"sourceProtocol\": \"ERROR\""))
        .stdout(predicate::str::contains("\"failure\": \"InvalidDomainSyntax\""))
        .stdout(predicate::str::contains("\"registrar\": \"unknown\""));
}

#[test]
fn test_unsupported_tld_text_output() {
    cli()
        .args(["example.zzzz", "--no-generic-rdap"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("ERROR"))
        .stdout(predicate::str::contains("No RDAP or WHOIS server known"));
}

#[test]
fn test_static_table_answers_offline() {
    cli()
        .args(["https://www.Google.com/", "--static-table", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"domain\": \"google.com\""))
        .stdout(predicate::str::contains("\"sourceProtocol\": \"STATIC\""))
        .stdout(predicate::str::contains("may be stale"));
}

#[test]
fn test_multiple_domains_json_array() {
    cli()
        .args(["google.com", "not_valid", "--static-table", "--json"])
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("["))
        .stdout(predicate::str::contains("\"STATIC\""))
        .stdout(predicate::str::contains("\"ERROR\""));
}

#[test]
fn test_config_file_enables_static_table() {
    let file = config_file("[defaults]\nstatic_table = true\nmode = \"auto\"\n");
    cli()
        .args(["github.com", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("STATIC"))
        .stdout(predicate::str::contains("MarkMonitor, Inc."));
}

#[test]
fn test_invalid_config_file_fails() {
    let file = config_file("[defaults]\nrdap_timeout = \"0s\"\n");
    cli()
        .args(["example.com", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config file"));
}

#[test]
fn test_domains_from_file() {
    let file = config_file("# popular\ngoogle.com\n\ngithub.com # inline\n");
    cli()
        .args(["--static-table", "--file"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("google.com"))
        .stdout(predicate::str::contains("github.com"))
        .stdout(predicate::str::contains("2 domains"));
}

#[test]
fn test_list_tlds() {
    cli()
        .arg("--list-tlds")
        .assert()
        .success()
        .stdout(predicate::str::contains(".com"))
        .stdout(predicate::str::contains("google.com"));
}

#[test]
fn test_bad_mode_rejected() {
    cli()
        .args(["example.com", "--mode", "fastest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown lookup mode"));
}

#[test]
fn test_zero_rdap_timeout_rejected() {
    cli()
        .args(["example.com", "--rdap-timeout", "0s"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("rdap_timeout must be between 1s and 120s"));
}

#[test]
fn test_malformed_deadline_rejected() {
    cli()
        .args(["example.com", "--deadline", "bogus"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid deadline 'bogus'"));
}
