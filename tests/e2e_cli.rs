use assert_cmd::Command;
use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the caller's config and database
fn agent_cmd(dir: &TempDir, database_url: &str) -> Command {
    let mut cmd = cargo_bin_cmd!("agent-scaffold");
    cmd.current_dir(dir.path())
        .env_remove("AGENT_CONFIG")
        .env_remove("RUST_LOG")
        .env_remove("LOG_LEVEL")
        .env("DATABASE_URL", database_url)
        .env("DB_CONNECT_TIMEOUT_SECS", "1");
    cmd
}

fn sqlite_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("sessions.db").display())
}

fn session_line(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .lines()
        .find(|l| l.starts_with("session: "))
        .map(str::to_string)
        .expect("session line in output")
}

#[test]
fn test_help_shows_usage() {
    cargo_bin_cmd!("agent-scaffold")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("persistent sessions"));
}

#[test]
fn test_tools_lists_example_tools() {
    let dir = TempDir::new().expect("create temp dir");
    agent_cmd(&dir, "bogus://nowhere")
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("calculate_sum"))
        .stdout(predicate::str::contains("fetch_data"))
        .stdout(predicate::str::contains("process_data"));
}

#[test]
fn test_session_falls_back_to_memory() {
    let dir = TempDir::new().expect("create temp dir");
    agent_cmd(&dir, "bogus://nowhere")
        .arg("session")
        .assert()
        .success()
        .stdout(predicate::str::contains("session: "))
        .stdout(predicate::str::contains("backend: volatile"));
}

#[test]
fn test_session_persists_across_invocations() {
    let dir = TempDir::new().expect("create temp dir");
    let url = sqlite_url(&dir);

    let first = agent_cmd(&dir, &url)
        .args(["session", "--user", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backend: durable"));
    let first = session_line(&first.get_output().stdout);

    let second = agent_cmd(&dir, &url)
        .args(["session", "--user", "alice"])
        .assert()
        .success();
    let second = session_line(&second.get_output().stdout);

    assert_eq!(first, second);

    let other = agent_cmd(&dir, &url)
        .args(["session", "--user", "bob"])
        .assert()
        .success();
    assert_ne!(session_line(&other.get_output().stdout), first);
}

#[test]
fn test_sessions_lists_user_sessions() {
    let dir = TempDir::new().expect("create temp dir");
    let url = sqlite_url(&dir);

    agent_cmd(&dir, &url)
        .args(["sessions", "--user", "carol"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions for carol"));

    agent_cmd(&dir, &url)
        .args(["session", "--user", "carol"])
        .assert()
        .success();

    agent_cmd(&dir, &url)
        .args(["sessions", "--user", "carol"])
        .assert()
        .success()
        .stdout(predicate::str::contains("carol"))
        .stdout(predicate::str::contains("0 turns"));
}

#[test]
fn test_run_without_api_key_fails_gracefully() {
    let dir = TempDir::new().expect("create temp dir");
    agent_cmd(&dir, "bogus://nowhere")
        .env_remove("OPENAI_API_KEY")
        .args(["run", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_invalid_connect_timeout_is_reported() {
    let dir = TempDir::new().expect("create temp dir");
    agent_cmd(&dir, "bogus://nowhere")
        .env("DB_CONNECT_TIMEOUT_SECS", "soon")
        .arg("session")
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "ignoring invalid DB_CONNECT_TIMEOUT_SECS",
        ))
        .stderr(predicate::str::contains("soon"));
}

#[test]
fn test_unknown_workflow_is_rejected() {
    let dir = TempDir::new().expect("create temp dir");
    agent_cmd(&dir, "bogus://nowhere")
        .args(["workflow", "poetry", "hello"])
        .assert()
        .failure();
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().expect("create temp dir");
    agent_cmd(&dir, "bogus://nowhere")
        .args(["--config", "does-not-exist.toml", "tools"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.toml"));
}

#[test]
fn test_config_file_sets_app_identity() {
    let dir = TempDir::new().expect("create temp dir");
    std::fs::write(
        dir.path().join("agent.toml"),
        "[app]\nname = \"my_agent\"\ndefault_user_id = \"owner\"\n",
    )
    .expect("write config");

    agent_cmd(&dir, &sqlite_url(&dir))
        .arg("session")
        .assert()
        .success();

    agent_cmd(&dir, &sqlite_url(&dir))
        .args(["sessions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("owner"));
}
