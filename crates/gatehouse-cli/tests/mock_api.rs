//! CLI integration tests against the file-backed mock API.

mod common;

use std::path::PathBuf;

use tempfile::TempDir;

use common::{run_cli, run_cli_failure, run_cli_success};

struct Env {
    _dir: TempDir,
    home: PathBuf,
    mock: PathBuf,
}

fn setup() -> Env {
    let dir = TempDir::new().unwrap();
    let home = dir.path().join("home");
    let mock = dir.path().join("mock");
    std::fs::create_dir_all(&home).unwrap();
    Env {
        _dir: dir,
        home,
        mock,
    }
}

fn login(env: &Env) {
    run_cli_success(
        &[
            "auth",
            "login",
            "--email",
            "admin@example.com",
            "--password",
            "admin123",
        ],
        &env.home,
        &env.mock,
    );
}

#[test]
fn test_login_and_whoami() {
    let env = setup();

    let stdout = run_cli_success(
        &[
            "auth",
            "login",
            "--email",
            "admin@example.com",
            "--password",
            "admin123",
        ],
        &env.home,
        &env.mock,
    );
    assert!(stdout.contains("Logged in successfully"));
    assert!(env.mock.join("tokens.json").exists());

    let stdout = run_cli_success(&["auth", "whoami", "--json"], &env.home, &env.mock);
    let user: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(user["username"], "admin");
    assert_eq!(user["role"], "admin");
}

#[test]
fn test_login_wrong_password_fails() {
    let env = setup();

    let stderr = run_cli_failure(
        &[
            "auth",
            "login",
            "--email",
            "admin@example.com",
            "--password",
            "wrong",
        ],
        &env.home,
        &env.mock,
    );
    assert!(stderr.contains("Failed to login"));
}

#[test]
fn test_whoami_without_session_fails() {
    let env = setup();
    let output = run_cli(&["auth", "whoami"], &env.home, &env.mock);
    assert!(!output.status.success());
}

#[test]
fn test_refresh_and_logout() {
    let env = setup();
    login(&env);

    let before = std::fs::read_to_string(env.mock.join("tokens.json")).unwrap();
    run_cli_success(&["auth", "refresh"], &env.home, &env.mock);
    let after = std::fs::read_to_string(env.mock.join("tokens.json")).unwrap();
    assert_ne!(before, after);

    run_cli_success(&["auth", "logout"], &env.home, &env.mock);
    assert!(!env.mock.join("tokens.json").exists());

    let output = run_cli(&["users", "list"], &env.home, &env.mock);
    assert!(!output.status.success());
}

#[test]
fn test_user_lifecycle() {
    let env = setup();
    login(&env);

    let stdout = run_cli_success(&["users", "list", "--json"], &env.home, &env.mock);
    let page: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(page["pagination"]["total"], 3);

    run_cli_success(
        &[
            "users",
            "create",
            "--email",
            "carol@example.com",
            "--username",
            "carol",
            "--password",
            "secret123",
            "--role",
            "admin",
        ],
        &env.home,
        &env.mock,
    );

    let stdout = run_cli_success(&["users", "list", "--json"], &env.home, &env.mock);
    let page: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let carol = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "carol")
        .unwrap()
        .clone();
    assert_eq!(carol["role"], "admin");
    let id = carol["id"].as_str().unwrap().to_string();

    let stdout = run_cli_success(
        &["users", "update", &id, "--first-name", "Carol"],
        &env.home,
        &env.mock,
    );
    assert!(stdout.contains("Carol"));

    let stdout = run_cli_success(&["users", "get", &id, "--json"], &env.home, &env.mock);
    let user: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(user["first_name"], "Carol");

    run_cli_success(&["users", "delete", &id], &env.home, &env.mock);
    run_cli_failure(&["users", "get", &id], &env.home, &env.mock);
}

#[test]
fn test_update_without_fields_fails() {
    let env = setup();
    let stderr = run_cli_failure(
        &["users", "update", "123e4567-e89b-12d3-a456-426614174000"],
        &env.home,
        &env.mock,
    );
    assert!(stderr.contains("Nothing to update"));
}
