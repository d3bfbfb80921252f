//! Integration tests for the `wanqos` CLI binary.
//!
//! Every test runs against a throwaway SQLite file and a config directory
//! that does not exist, so the user's real registry is never touched.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `wanqos` binary with env isolation.
fn wanqos_cmd(db: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wanqos");
    cmd.env("HOME", "/tmp/wanqos-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/wanqos-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/wanqos-cli-test-nonexistent")
        .env_remove("RUST_LOG")
        .env_remove("WANQOS_CONFIG_FILE")
        .env_remove("WANQOS_DB")
        .env_remove("WANQOS_STORE__BACKEND")
        .env_remove("WANQOS_STORE__PATH")
        .env_remove("WANQOS_ALLOCATOR__FLOOR")
        .env_remove("WANQOS_DEFAULTS__OUTPUT")
        .arg("--db")
        .arg(db);
    cmd
}

fn temp_db() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("wanqos.db");
    (dir, db)
}

/// Run a command that prints JSON on stdout and parse it.
fn json(cmd: &mut assert_cmd::Command) -> serde_json::Value {
    let output = cmd.arg("-o").arg("json").output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn create_class(db: &Path, parent: Option<&str>) -> serde_json::Value {
    let mut cmd = wanqos_cmd(db);
    cmd.args(["classes", "create", "--direction", "egress", "--min", "200kbit"]);
    if let Some(p) = parent {
        cmd.args(["--parent", p]);
    }
    json(&mut cmd)
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let (_dir, db) = temp_db();
    let output = wanqos_cmd(&db).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db).arg("--help").assert().success().stdout(
        predicate::str::contains("classes")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("agent")),
    );
}

#[test]
fn test_completions_zsh() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Classes ─────────────────────────────────────────────────────────

#[test]
fn test_first_class_gets_id_eleven_under_root() {
    let (_dir, db) = temp_db();
    let class = create_class(&db, None);
    assert_eq!(class["class_ext_id"], 11);
    assert_eq!(class["parent"], "root");
    assert_eq!(class["parent_class_ext_id"], 1);
    assert_eq!(class["direction"], "egress");
}

#[test]
fn test_ids_persist_across_invocations() {
    let (_dir, db) = temp_db();
    let first = create_class(&db, None);
    let second = create_class(&db, first["id"].as_str());
    assert_eq!(second["class_ext_id"], 12);
    assert_eq!(second["parent_class_ext_id"], 11);

    let list = json(wanqos_cmd(&db).args(["classes", "list"]));
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[test]
fn test_tree_draws_nested_classes() {
    let (_dir, db) = temp_db();
    let parent = create_class(&db, None);
    create_class(&db, parent["id"].as_str());

    wanqos_cmd(&db)
        .args(["classes", "tree"])
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("root [1] both")
                .and(predicate::str::contains("└── "))
                .and(predicate::str::contains("[12] egress")),
        );
}

#[test]
fn test_update_changes_bounds() {
    let (_dir, db) = temp_db();
    let class = create_class(&db, None);
    let id = class["id"].as_str().unwrap();

    let updated = json(wanqos_cmd(&db).args(["classes", "update", id, "--max", "1mbit"]));
    assert_eq!(updated["min_rate"], "200kbit");
    assert_eq!(updated["max_rate"], "1mbit");
    assert_eq!(updated["class_ext_id"], class["class_ext_id"]);
}

#[test]
fn test_missing_direction_is_usage_error() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .args(["classes", "create"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("direction"));
}

#[test]
fn test_unknown_parent_is_not_found() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .args([
            "classes",
            "create",
            "--direction",
            "both",
            "--parent",
            "550e8400-e29b-41d4-a716-446655440000",
        ])
        .assert()
        .code(4);

    let list = json(wanqos_cmd(&db).args(["classes", "list"]));
    assert!(list.as_array().unwrap().is_empty());
}

#[test]
fn test_get_unknown_class_is_not_found() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .args(["classes", "get", "nope"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("classes list"));
}

#[test]
fn test_delete_is_idempotent_and_keeps_children() {
    let (_dir, db) = temp_db();
    let parent = create_class(&db, None);
    let child = create_class(&db, parent["id"].as_str());
    let parent_id = parent["id"].as_str().unwrap();

    for _ in 0..2 {
        wanqos_cmd(&db)
            .args(["--yes", "classes", "delete", parent_id])
            .assert()
            .success();
    }

    let orphan = json(wanqos_cmd(&db).args(["classes", "get", child["id"].as_str().unwrap()]));
    assert_eq!(orphan["parent"], parent["id"]);
    assert!(orphan["parent_class_ext_id"].is_null());
}

#[test]
fn test_delete_without_yes_fails_non_interactively() {
    let (_dir, db) = temp_db();
    let class = create_class(&db, None);
    wanqos_cmd(&db)
        .args(["classes", "delete", class["id"].as_str().unwrap()])
        .assert()
        .code(2);
}

#[test]
fn test_root_cannot_be_deleted() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .args(["-y", "classes", "delete", "root"])
        .assert()
        .code(2);
}

// ── Devices ─────────────────────────────────────────────────────────

#[test]
fn test_heartbeat_from_unknown_host() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .args(["devices", "heartbeat", "--host", "ghost"])
        .assert()
        .code(9);

    let list = json(wanqos_cmd(&db).args(["devices", "list"]));
    assert!(list.as_array().unwrap().is_empty());
}

#[test]
fn test_device_connect_heartbeat_delete() {
    let (_dir, db) = temp_db();
    let connect = ["devices", "connect", "--host", "edge-1", "--lan-port", "eth0", "--wan-port", "eth1"];
    let first = json(wanqos_cmd(&db).args(connect));
    let again = json(wanqos_cmd(&db).args(connect));
    assert_eq!(first["id"], again["id"]);
    assert_eq!(first["heartbeat_timestamp"], again["heartbeat_timestamp"]);

    wanqos_cmd(&db)
        .args(["devices", "heartbeat", "--host", "edge-1"])
        .assert()
        .success();

    wanqos_cmd(&db)
        .args(["devices", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("edge-1").and(predicate::str::contains("up")));

    let id = first["id"].as_str().unwrap();
    wanqos_cmd(&db)
        .args(["-y", "devices", "delete", id])
        .assert()
        .success();
    wanqos_cmd(&db)
        .args(["-y", "devices", "delete", id])
        .assert()
        .code(4);
}

#[test]
fn test_device_id_must_be_uuid() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .args(["devices", "get", "edge-1"])
        .assert()
        .code(2);
}

// ── Agent ───────────────────────────────────────────────────────────

#[test]
fn test_agent_runs_fixed_ticks() {
    let (_dir, db) = temp_db();
    create_class(&db, None);

    wanqos_cmd(&db)
        .args([
            "-o", "plain", "agent", "--host", "edge-9", "--lan-port", "lan0", "--wan-port",
            "wan0", "--interval", "1", "--ticks", "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("root").count(2));

    let devices = json(wanqos_cmd(&db).args(["devices", "list"]));
    assert_eq!(devices[0]["host"], "edge-9");
}

#[test]
fn test_agent_rejects_zero_ticks() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .args([
            "agent", "--host", "edge-9", "--lan-port", "lan0", "--wan-port", "wan0", "--ticks",
            "0",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ticks"));

    let devices = json(wanqos_cmd(&db).args(["devices", "list"]));
    assert!(devices.as_array().unwrap().is_empty());
}

#[test]
fn test_agent_with_padded_host_keeps_heartbeating() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .args([
            "-o", "plain", "agent", "--host", " edge-9 ", "--lan-port", "lan0", "--wan-port",
            "wan0", "--interval", "1", "--ticks", "1",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("heartbeat failed").not());

    let devices = json(wanqos_cmd(&db).args(["devices", "list"]));
    assert_eq!(devices[0]["host"], "edge-9");
    assert!(!devices[0]["heartbeat_timestamp"].is_null());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_reflects_env() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .env("WANQOS_ALLOCATOR__FLOOR", "500")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("floor = 500"));
}

#[test]
fn test_config_file_floor_applies() {
    let (dir, db) = temp_db();
    let cfg = dir.path().join("wanqos.toml");
    std::fs::write(&cfg, "[allocator]\nfloor = 100\n").unwrap();

    let class = json(
        wanqos_cmd(&db)
            .arg("--config")
            .arg(&cfg)
            .args(["classes", "create", "--direction", "ingress"]),
    );
    assert_eq!(class["class_ext_id"], 101);
}

#[test]
fn test_bad_backend_is_usage_error() {
    let (_dir, db) = temp_db();
    wanqos_cmd(&db)
        .env("WANQOS_STORE__BACKEND", "postgres")
        .args(["classes", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("store.backend"));
}
