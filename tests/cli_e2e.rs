//! End-to-end CLI tests for the sharefetch binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

/// Binary command isolated from any user config file.
fn sharefetch(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sharefetch").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

/// Test that the binary with no input exits with code 0.
#[test]
fn test_binary_invocation_without_input_returns_zero() {
    let home = TempDir::new().unwrap();
    sharefetch(&home)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    sharefetch(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--share-json"))
        .stdout(predicate::str::contains("--browser-headers"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    sharefetch(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sharefetch"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    sharefetch(&home)
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_rejects_invalid_config_file() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "concurrency = 0\n").unwrap();

    sharefetch(&home)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_binary_unreachable_url_reports_failure() {
    let home = TempDir::new().unwrap();
    sharefetch(&home)
        .args(["-q", "--cache-dir"])
        .arg(home.path().join("cache"))
        .arg("http://127.0.0.1:9/file.bin")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 1 downloads failed"))
        .stderr(predicate::str::contains("[network]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_fetches_urls_from_stdin() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/files/clip.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "video/mp4")
                .set_body_bytes(b"mp4 data".to_vec()),
        )
        .mount(&mock_server)
        .await;
    let home = TempDir::new().unwrap();
    let cache = home.path().join("cache");

    sharefetch(&home)
        .arg("--cache-dir")
        .arg(&cache)
        .write_stdin(format!("# queued\n{}/files/clip.mp4\n", mock_server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains("clip.mp4\tvideo/mp4"));

    assert_eq!(std::fs::read(cache.join("clip.mp4")).unwrap(), b"mp4 data");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_fetches_share_listing() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/fast/notes"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", r#"attachment; filename="notes.txt""#)
                .insert_header("Content-Type", "text/plain")
                .set_body_bytes(b"hello".to_vec()),
        )
        .mount(&mock_server)
        .await;
    let home = TempDir::new().unwrap();
    let cache = home.path().join("cache");
    let listing = home.path().join("listing.json");
    std::fs::write(
        &listing,
        format!(
            r#"{{"errno":0,"share_id":"s1","list":[{{"server_filename":"notes.txt","size":5,"dlink":"{uri}/slow/notes","direct_link":"{uri}/fast/notes"}}]}}"#,
            uri = mock_server.uri()
        ),
    )
    .unwrap();

    sharefetch(&home)
        .arg("--cache-dir")
        .arg(&cache)
        .arg("--share-json")
        .arg(&listing)
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.txt\ttext/plain"));

    assert_eq!(std::fs::read(cache.join("notes.txt")).unwrap(), b"hello");
}
