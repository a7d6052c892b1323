//! Integration tests for the CLI binary.
//!
//! Drives the `fedmd` binary against a temporary home directory.
//!
//! This test is registered as a [[test]] in the federated-metadata-cli
//! crate so that CARGO_BIN_EXE_fedmd is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `fedmd` binary.
fn fedmd_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_fedmd"))
}

fn fedmd(home: &Path, args: &[&str]) -> Output {
    fedmd_binary()
        .arg("--home")
        .arg(home)
        .args(args)
        .output()
        .expect("failed to execute fedmd")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn write_descriptor(dir: &Path, scope: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("chain.json");
    let descriptor = serde_json::json!([
        {"request": {"scope": ["openid", "email"]}, "requester": "https://sunet.se", "signer": "https://swamid.sunet.se"},
        {"request": {"scope": scope}, "requester": "https://rp.sunet.se", "signer": "https://sunet.se"}
    ]);
    std::fs::write(&path, descriptor.to_string()).unwrap();
    path
}

fn init_keys(home: &Path) {
    let output = fedmd(
        home,
        &[
            "keys",
            "init",
            "https://swamid.sunet.se",
            "https://sunet.se",
            "https://rp.sunet.se",
        ],
    );
    assert!(
        output.status.success(),
        "keys init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn cli_responds_to_help() {
    let output = fedmd_binary()
        .arg("--help")
        .output()
        .expect("failed to execute fedmd --help");

    assert!(
        output.status.success(),
        "fedmd --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let out = stdout(&output);
    assert!(
        out.contains("fedmd") || out.contains("Usage"),
        "fedmd --help output should contain usage information, got: {out}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = fedmd_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute fedmd");

    assert!(
        !output.status.success(),
        "fedmd with unknown flag should exit with error"
    );
}

#[test]
fn cli_keys_init_and_list() {
    let home = tempfile::tempdir().unwrap();
    init_keys(home.path());

    let output = fedmd(home.path(), &["keys", "list"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("https://swamid.sunet.se (1 key(s))"), "got: {out}");
    assert!(out.contains("https://rp.sunet.se"));
}

#[test]
fn cli_build_indirect_then_unpack_and_verify() {
    let home = tempfile::tempdir().unwrap();
    init_keys(home.path());
    let descriptor = write_descriptor(home.path(), serde_json::json!(["openid"]));

    let output = fedmd(
        home.path(),
        &[
            "build",
            descriptor.to_str().unwrap(),
            "--indirect",
            "--base-uri",
            "https://mds.sunet.se/ms",
        ],
    );
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let built: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let uri = built["https://sunet.se"].as_str().unwrap().to_string();
    assert!(uri.starts_with("https://mds.sunet.se/ms/"));

    let output = fedmd(home.path(), &["unpack", &uri]);
    assert!(output.status.success());
    let tree: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(tree["scope"], serde_json::json!(["openid"]));
    assert!(tree["metadata_statements"]["https://swamid.sunet.se"].is_object());

    let output = fedmd(
        home.path(),
        &["verify", &uri, "--fo", "https://swamid.sunet.se"],
    );
    assert!(
        output.status.success(),
        "verify failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let paths: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(paths[0]["fo"], "https://swamid.sunet.se");
    assert_eq!(paths[0]["claims"]["scope"], serde_json::json!(["openid"]));
}

#[test]
fn cli_verify_rejects_escalation() {
    let home = tempfile::tempdir().unwrap();
    init_keys(home.path());
    let descriptor = write_descriptor(
        home.path(),
        serde_json::json!(["openid", "email", "profile"]),
    );

    let output = fedmd(home.path(), &["build", descriptor.to_str().unwrap()]);
    assert!(output.status.success());
    let built: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let token = built["https://sunet.se"].as_str().unwrap().to_string();

    let output = fedmd(home.path(), &["verify", &token]);
    assert!(!output.status.success());
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("scope"), "got: {err}");
}

#[test]
fn cli_verify_reports_untrusted_roots() {
    let home = tempfile::tempdir().unwrap();
    init_keys(home.path());
    let descriptor = write_descriptor(home.path(), serde_json::json!(["openid"]));

    let output = fedmd(home.path(), &["build", descriptor.to_str().unwrap()]);
    assert!(output.status.success());
    let built: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let token = built["https://sunet.se"].as_str().unwrap().to_string();

    let output = fedmd(home.path(), &["verify", &token, "--fo", "https://rp.sunet.se"]);
    assert!(!output.status.success());
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(
        err.contains("Unknown federation operator: https://swamid.sunet.se"),
        "got: {err}"
    );
}

#[test]
fn cli_compare() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    std::fs::write(&a, r#"{"a": 1}"#).unwrap();
    std::fs::write(&b, r#"{"a": 1, "b": 2}"#).unwrap();

    let output = fedmd(dir.path(), &["compare", a.to_str().unwrap(), b.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "true");

    let output = fedmd(dir.path(), &["compare", b.to_str().unwrap(), a.to_str().unwrap()]);
    assert!(!output.status.success());
    assert_eq!(stdout(&output).trim(), "false");
}
