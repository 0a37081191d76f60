use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Nothing listens on the discard port, so requests fail fast.
const UNREACHABLE: &str = "http://127.0.0.1:9";

/// A command isolated from the user's config directory and API keys.
fn kwlink(home: &Path) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("kwlink").into();
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    cmd.env("NO_COLOR", "1");
    for var in [
        "OPENAI_API_KEY",
        "GROQ_API_KEY",
        "ANTHROPIC_API_KEY",
        "KWLINK_PROVIDER",
        "KWLINK_MODEL",
        "KWLINK_WIKIDATA_URL",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("kwlink.json");
    fs::write(&path, content).unwrap();
    path
}

// --- Binary startup ---

#[test]
fn binary_runs() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kwlink"));
}

#[test]
fn help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("link"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("similarity"));
}

// --- Similarity ---

#[test]
fn similarity_prints_ratio() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path())
        .args(["similarity", "abcd", "bcde"])
        .assert()
        .success()
        .stdout("0.75\n");
}

#[test]
fn similarity_of_identical_strings_is_one() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path())
        .args(["similarity", "horse", "horse"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn similarity_does_not_read_config() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path())
        .args(["--config", "/nonexistent/kwlink.json", "similarity", "abcd", "bcde"])
        .env("KWLINK_PROVIDER", "bard")
        .assert()
        .success()
        .stdout("0.75\n");
}

// --- Configuration ---

#[test]
fn resolve_requires_api_key() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path())
        .args(["resolve", "--keyword", "horse"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn provider_from_environment_selects_key_variable() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path())
        .env("KWLINK_PROVIDER", "groq")
        .args(["link", "--keyword", "horse"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GROQ_API_KEY"));
}

#[test]
fn unknown_provider_is_rejected() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path())
        .env("KWLINK_PROVIDER", "bard")
        .args(["resolve", "--keyword", "horse"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown provider"));
}

#[test]
fn invalid_config_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), r#"{"knowledge_base": {"search_limit": 0}}"#);

    kwlink(tmp.path())
        .arg("--config")
        .arg(&config)
        .args(["resolve", "--keyword", "horse"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("search_limit"));
}

#[test]
fn missing_config_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path())
        .args(["--config", "/nonexistent/kwlink.json", "search", "horse"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn resolve_requires_keyword() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path()).arg("resolve").assert().failure();
}

// --- Offline failure handling ---

#[test]
fn search_reports_unreachable_endpoint() {
    let tmp = TempDir::new().unwrap();
    kwlink(tmp.path())
        .env("KWLINK_WIKIDATA_URL", format!("{UNREACHABLE}/w/api.php"))
        .args(["search", "horse"])
        .assert()
        .failure();
}

#[test]
fn resolve_degrades_to_empty_result_when_model_is_unreachable() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(
        tmp.path(),
        &format!(
            r#"{{
                "generation": {{"api_key": "sk-test", "base_url": "{UNREACHABLE}/v1"}},
                "retry": {{"max_attempts": 1}}
            }}"#
        ),
    );

    kwlink(tmp.path())
        .arg("--config")
        .arg(&config)
        .args(["resolve", "-k", "vie littéraire", "-k", "salons", "-l", "fr"])
        .assert()
        .success()
        .stdout(
            "{\"keyword\":\"vie littéraire\",\"entities\":[]}\n\
             {\"keyword\":\"salons\",\"entities\":[]}\n",
        )
        .stderr(predicate::str::contains("Resolved 0/2 keywords"));
}
