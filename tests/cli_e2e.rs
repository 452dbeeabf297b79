//! End-to-end CLI tests for the bibdl binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

mod support;

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use support::{pdf_document, scholar_page, single_result_page, start_mock_host};
use tempfile::TempDir;

const SICP_TITLE: &str = "Structure and Interpretation of Computer Programs";
const SICP_LINE: &str = "[SICP] Harold Abelson, Gerald Jay Sussman. Structure and Interpretation of Computer Programs. MIT Press, 1996.";

fn write_bibliography(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("refs.txt");
    std::fs::write(&path, contents).unwrap();
    path
}

fn write_bibdl_config(config_home: &Path, contents: &str) {
    let config_dir = config_home.join("bibdl");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), contents).unwrap();
}

fn toml_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

/// Command isolated from the user's config and environment.
fn bibdl(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bibdl").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_binary_help_shows_usage() {
    let temp = TempDir::new().unwrap();
    bibdl(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: bibdl"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--on-blocked"));
}

#[test]
fn test_binary_without_paths_fails_with_usage() {
    let temp = TempDir::new().unwrap();
    bibdl(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("BIBLIOGRAPHY"));
}

#[test]
fn test_binary_missing_bibliography_is_fatal() {
    let temp = TempDir::new().unwrap();
    bibdl(temp.path())
        .arg(temp.path().join("missing.txt"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load bibliography"));
}

#[test]
fn test_binary_missing_output_dir_is_fatal() {
    let temp = TempDir::new().unwrap();
    let bib = write_bibliography(temp.path(), SICP_LINE);
    bibdl(temp.path())
        .arg(&bib)
        .arg("--output-dir")
        .arg(temp.path().join("nowhere"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_binary_unknown_key_is_fatal() {
    let temp = TempDir::new().unwrap();
    let bib = write_bibliography(temp.path(), SICP_LINE);
    bibdl(temp.path())
        .arg(&bib)
        .args(["--key", "TAOCP", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown bibliography key 'TAOCP'"));
}

#[test]
fn test_binary_rejects_unknown_config_key() {
    let temp = TempDir::new().unwrap();
    write_bibdl_config(temp.path(), "concurrency = 8\n");
    let bib = write_bibliography(temp.path(), SICP_LINE);
    bibdl(temp.path())
        .arg(&bib)
        .arg("--dry-run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_binary_explicit_config_flag_is_used() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("custom.toml");
    std::fs::write(&config, "min_delay_ms = 900\nbaseline_delay_ms = 800\n").unwrap();
    let bib = write_bibliography(temp.path(), "");
    bibdl(temp.path())
        .arg(&bib)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid throttle settings"));
}

#[test]
fn test_binary_empty_bibliography_succeeds_with_json_summary() {
    let temp = TempDir::new().unwrap();
    let bib = write_bibliography(temp.path(), "\nnot an entry\n");
    bibdl(temp.path())
        .arg(&bib)
        .args(["--json", "--output-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""event":"summary""#))
        .stdout(predicate::str::contains(r#""entries":0"#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_downloads_entry_from_mock_provider() {
    let Some(server) = start_mock_host().await else {
        return;
    };
    let pdf_url = format!("{}/files/sicp.pdf", server.uri());
    let page = single_result_page(SICP_TITLE, &pdf_url, "H Abelson, GJ Sussman - 1996 - mit.edu");
    scholar_page("as_epq", SICP_TITLE, page)
        .expect(1)
        .mount(&server)
        .await;
    pdf_document("/files/sicp.pdf", b"%PDF-1.4 sicp")
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let out_dir = temp.path().join("papers");
    std::fs::create_dir(&out_dir).unwrap();
    write_bibdl_config(
        temp.path(),
        &format!(
            "scholar_base_url = \"{}\"\noutput_dir = \"{}\"\n",
            server.uri(),
            toml_path(&out_dir)
        ),
    );
    let bib = write_bibliography(temp.path(), SICP_LINE);
    let config_home = temp.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        bibdl(&config_home)
            .arg(&bib)
            .args(["--delay-ms", "20", "--min-delay-ms", "10"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("Processing SICP"))
        .stdout(predicate::str::contains("Copied to"))
        .stdout(predicate::str::contains("1 downloaded"));
    assert_eq!(
        std::fs::read(out_dir.join("SICP.pdf")).unwrap(),
        b"%PDF-1.4 sicp"
    );
}
