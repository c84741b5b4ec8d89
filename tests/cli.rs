//! Tests that run the `seqsearch` binary. None of them touch the network.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/seqsearch.sqlite"

[chunking]
chunk_size = 4

[fetch]
base_url = "http://127.0.0.1:9/efetch.fcgi"
timeout_secs = 2

[jobs]
workers = 2
await_timeout_secs = 5
"#,
        root.display()
    );

    let config_path = config_dir.join("seqsearch.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run(config_path: &Path, cwd: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_seqsearch"))
        .current_dir(cwd)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .expect("failed to run seqsearch binary");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run(&config_path, tmp.path(), &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/seqsearch.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (tmp, config_path) = setup_test_env();

    let (_, _, first) = run(&config_path, tmp.path(), &["init"]);
    let (_, _, second) = run(&config_path, tmp.path(), &["init"]);
    assert!(first && second);
}

#[test]
fn test_invalid_pattern_exits_nonzero() {
    let (tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run(&config_path, tmp.path(), &["search", "30271926", "AC(GT"]);
    assert!(!success);
    assert!(stderr.contains("invalid pattern"), "stderr: {}", stderr);
}

#[test]
fn test_unreachable_provider_exits_nonzero() {
    let (tmp, config_path) = setup_test_env();

    let out = tmp.path().join("out.json");
    let (_, stderr, success) = run(
        &config_path,
        tmp.path(),
        &["search", "30271926", "AA", "--output", out.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("fetch failed"), "stderr: {}", stderr);
    assert!(!out.exists());
}

#[test]
fn test_bad_config_rejected() {
    let (tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[chunking]\nchunk_size = 0\n").unwrap();

    let (_, stderr, success) = run(&config_path, tmp.path(), &["init"]);
    assert!(!success);
    assert!(stderr.contains("chunk_size"));
}
