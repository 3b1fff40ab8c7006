//! CLI integration tests for datasaver
//!
//! Every test runs against its own temporary storage root and config file so
//! nothing touches the user's real data directory.

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> std::path::PathBuf {
        self.dir.path().join("values")
    }

    fn config(&self) -> std::path::PathBuf {
        self.dir.path().join("config.toml")
    }

    /// Command with root and config pinned to this environment
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("datasaver"));
        cmd.env_remove("DATASAVER_ROOT")
            .env_remove("RUST_LOG")
            .env("DATASAVER_CONFIG", self.config())
            .arg("--root")
            .arg(self.root());
        cmd
    }
}

// =============================================================================
// Setup Tests
// =============================================================================

#[test]
fn test_init_creates_root() {
    let env = Env::new();

    env.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized storage root"));

    assert!(env.root().is_dir());
    assert!(!env.config().exists());
}

#[test]
fn test_init_save_config_records_root() {
    let env = Env::new();

    env.cmd().args(["init", "--save-config"]).assert().success();

    let content = fs::read_to_string(env.config()).unwrap();
    assert!(content.contains("root"));
    assert!(content.contains("immediate"));

    // Root now comes from the config file
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("datasaver"));
    cmd.env_remove("DATASAVER_ROOT")
        .env("DATASAVER_CONFIG", env.config())
        .args(["config", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"root_source\":\"config\""));
}

// =============================================================================
// Value Tests
// =============================================================================

#[test]
fn test_set_then_get() {
    let env = Env::new();

    env.cmd()
        .args(["set", "count", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 'count'"));

    assert_eq!(fs::read(env.root().join("count")).unwrap(), b"5");

    env.cmd()
        .args(["get", "count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("5\n"));
}

#[test]
fn test_set_structured_value_json_output() {
    let env = Env::new();

    env.cmd()
        .args(["set", "names", r#"["ada","bob"]"#])
        .assert()
        .success();

    env.cmd()
        .args(["--format", "json", "get", "names"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""key":"names""#))
        .stdout(predicate::str::contains(r#""value":["ada","bob"]"#));
}

#[test]
fn test_set_unchanged_value_still_writes() {
    let env = Env::new();

    // null equals the initial value when nothing is stored yet
    env.cmd().args(["set", "empty", "null"]).assert().success();
    assert_eq!(fs::read(env.root().join("empty")).unwrap(), b"null");
}

#[test]
fn test_set_with_on_dispose_policy() {
    let env = Env::new();

    env.cmd()
        .args(["set", "theme", "dark", "--string", "--policy", "on_dispose"])
        .assert()
        .success();

    assert_eq!(fs::read(env.root().join("theme")).unwrap(), br#""dark""#);
}

#[test]
fn test_set_rejects_invalid_json() {
    let env = Env::new();

    env.cmd()
        .args(["set", "theme", "dark"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid JSON value"));
}

#[test]
fn test_set_rejects_bad_policy() {
    let env = Env::new();

    env.cmd()
        .args(["set", "count", "1", "--policy", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown save policy"));
}

#[test]
fn test_get_missing_fails() {
    let env = Env::new();

    env.cmd()
        .args(["get", "nothing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No value stored under 'nothing'"));
}

#[test]
fn test_get_non_json_needs_raw() {
    let env = Env::new();
    fs::create_dir_all(env.root()).unwrap();
    fs::write(env.root().join("blob"), b"\x01plain").unwrap();

    env.cmd().args(["get", "blob"]).assert().failure();

    env.cmd()
        .args(["get", "blob", "--raw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plain"));
}

#[test]
fn test_invalid_key_fails() {
    let env = Env::new();

    env.cmd()
        .args(["set", ".hidden", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot start with '.'"));

    env.cmd().args(["get", "a/b"]).assert().failure();
}

#[test]
fn test_rm_then_get_fails() {
    let env = Env::new();

    env.cmd().args(["set", "count", "3"]).assert().success();
    env.cmd()
        .args(["rm", "count"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 'count'"));

    assert!(!env.root().join("count").exists());
    env.cmd().args(["get", "count"]).assert().failure();

    // Removing again is not an error
    env.cmd()
        .args(["rm", "count"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No value stored"));
}

// =============================================================================
// Listing Tests
// =============================================================================

#[test]
fn test_ls_lists_records_and_skips_temp_files() {
    let env = Env::new();

    env.cmd().args(["set", "b", "2"]).assert().success();
    env.cmd().args(["set", "a", "1"]).assert().success();
    fs::write(env.root().join(".a.tmp"), b"partial").unwrap();

    let output = env.cmd().args(["--format", "json", "ls"]).output().unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let keys: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(entries[0]["size"], 1);
    assert_eq!(entries[0]["digest"].as_str().unwrap().len(), 12);
}

#[test]
fn test_ls_empty_root() {
    let env = Env::new();

    env.cmd()
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("No values stored"));
}

#[test]
fn test_ls_text_table() {
    let env = Env::new();
    env.cmd().args(["set", "count", "12"]).assert().success();

    env.cmd()
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("KEY\tSIZE\tMODIFIED\tDIGEST"))
        .stdout(predicate::str::contains("count\t2\t"));
}

// =============================================================================
// Inspect Tests
// =============================================================================

#[test]
fn test_key_derivation() {
    let env = Env::new();

    env.cmd()
        .args(["key", "--owner", "app::Settings", "theme"])
        .assert()
        .success()
        .stdout(predicate::str::diff("app::Settings:theme\n"));

    env.cmd()
        .args(["key", "theme"])
        .assert()
        .success()
        .stdout(predicate::str::diff("theme\n"));

    env.cmd().args(["key", ""]).assert().failure();
}

#[test]
fn test_config_reports_policy_from_file() {
    let env = Env::new();
    fs::write(env.config(), "default_policy = \"on_dispose\"\n").unwrap();

    env.cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Default policy: on_dispose"))
        .stdout(predicate::str::contains("(override)"));
}

#[test]
fn test_bad_config_fails() {
    let env = Env::new();
    fs::write(env.config(), "default_policy = \"sometimes\"\n").unwrap();

    env.cmd()
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_root_from_env() {
    let env = Env::new();

    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("datasaver"));
    cmd.env("DATASAVER_ROOT", env.root())
        .env("DATASAVER_CONFIG", env.config())
        .args(["set", "count", "9"])
        .assert()
        .success();

    assert_eq!(fs::read(env.root().join("count")).unwrap(), b"9");
}

#[test]
fn test_verbose_logs_to_stderr() {
    let env = Env::new();

    env.cmd()
        .args(["--verbose", "set", "count", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 'count'"))
        .stderr(predicate::str::contains("record saved"));
}
