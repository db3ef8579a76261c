//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own database and HOME.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let db = home.join("sentry.db");
    let output = Command::new(env!("CARGO_BIN_EXE_gamesentry"))
        .env("HOME", home)
        .env_remove("GAMESENTRY_ENV")
        .env("RUST_LOG", "off")
        .arg("--db")
        .arg(&db)
        .args(args)
        .output()
        .expect("failed to execute gamesentry");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.code().unwrap_or(-1), stdout, stderr)
}

fn home() -> TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_user_add_and_list() {
    let home = home();
    let (code, out, _) = run_cli(home.path(), &["user", "add", "Sam", "--max-daily", "120"]);
    assert_eq!(code, 0);
    assert!(out.contains("User added: Sam"));

    let (code, out, _) = run_cli(home.path(), &["user", "list", "--json"]);
    assert_eq!(code, 0);
    let users: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["username"], "Sam");
}

#[test]
fn test_duplicate_username_is_refused() {
    let home = home();
    assert_eq!(run_cli(home.path(), &["user", "add", "Sam"]).0, 0);
    let (code, _, err) = run_cli(home.path(), &["user", "add", "sam"]);
    assert_eq!(code, 1);
    assert!(err.starts_with("error:"));
}

#[test]
fn test_manual_entry_shows_in_log() {
    let home = home();
    run_cli(home.path(), &["user", "add", "Sam"]);

    let (code, out, _) = run_cli(
        home.path(),
        &["session", "add", "sam", "16:00", "16:45", "--date", "2024-05-01"],
    );
    assert_eq!(code, 0, "{out}");

    let (code, out, _) = run_cli(home.path(), &["session", "log", "Sam", "--json"]);
    assert_eq!(code, 0);
    let log: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(log[0]["start"], "2024-05-01 16:00:00");
    assert_eq!(log[0]["duration"], "00:45:00");
}

#[test]
fn test_overlapping_manual_entry_is_refused() {
    let home = home();
    run_cli(home.path(), &["user", "add", "Sam"]);
    run_cli(
        home.path(),
        &["session", "add", "sam", "16:00", "16:45", "--date", "2024-05-01"],
    );
    let (code, _, _) = run_cli(
        home.path(),
        &["session", "add", "sam", "16:30", "17:00", "--date", "2024-05-01"],
    );
    assert_eq!(code, 1);
}

#[test]
fn test_clear_needs_confirmation() {
    let home = home();
    run_cli(home.path(), &["user", "add", "Sam"]);
    run_cli(
        home.path(),
        &["session", "add", "sam", "09:00", "10:00", "--date", "2024-05-01"],
    );

    assert_eq!(run_cli(home.path(), &["session", "clear", "sam"]).0, 1);
    let (code, out, _) = run_cli(home.path(), &["session", "clear", "sam", "--yes"]);
    assert_eq!(code, 0);
    assert!(out.contains("Deleted 1 sessions"));
}

#[test]
fn test_status_json_for_idle_kid() {
    let home = home();
    run_cli(home.path(), &["user", "add", "Sam", "--max-session", "60"]);
    let (code, out, _) = run_cli(home.path(), &["session", "status", "sam", "--json"]);
    assert_eq!(code, 0);
    let status: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(status["state"], "idle");
    assert_eq!(status["block_limit_secs"], 3600);
}

#[test]
fn test_unknown_user() {
    let home = home();
    let (code, _, err) = run_cli(home.path(), &["session", "status", "nobody"]);
    assert_eq!(code, 1);
    assert!(err.contains("no such user"));
}
