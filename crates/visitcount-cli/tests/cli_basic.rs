//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway home directory and
//! never reach the public counting services.

use std::path::Path;
use std::process::Command;

/// Run a CLI command with `home` as the home directory and return output.
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_visitcount"))
        .args(args)
        .env("HOME", home)
        .env_remove("VISITCOUNT_ENV")
        .env_remove("VISITCOUNT_SESSION")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_cli_success(home: &Path, args: &[&str]) -> String {
    let (code, stdout, stderr) = run_cli(home, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    stdout
}

/// Home whose config has no remote sources, so every lookup is offline.
fn offline_home() -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    run_cli_success(home.path(), &["config", "set", "resolver.sources", "[]"]);
    home
}

#[test]
fn test_key_derivation() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(run_cli_success(home.path(), &["key", "/about"]).trim(), "page-about");
    assert_eq!(run_cli_success(home.path(), &["key", "/Blog/Hello World/"]).trim(), "page-blog-hello-world");
    assert_eq!(run_cli_success(home.path(), &["key", "/"]).trim(), "page-home");
}

#[test]
fn test_deterministic_estimate() {
    let home = tempfile::tempdir().unwrap();
    let out = run_cli_success(
        home.path(),
        &["estimate", "--deterministic", "--at", "2025-07-20T12:00:00Z"],
    );
    assert_eq!(out.trim(), "41");
}

#[test]
fn test_estimate_rejects_bad_timestamp() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["estimate", "--at", "yesterday"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_get_set() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(run_cli_success(home.path(), &["config", "get", "namespace"]).trim(), "example.com");

    run_cli_success(home.path(), &["config", "set", "display.duration_ms", "500"]);
    assert_eq!(
        run_cli_success(home.path(), &["config", "get", "display.duration_ms"]).trim(),
        "500"
    );

    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "no_such_key", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    run_cli_success(home.path(), &["config", "reset"]);
    assert_eq!(
        run_cli_success(home.path(), &["config", "get", "display.duration_ms"]).trim(),
        "2000"
    );
}

#[test]
fn test_config_list_is_json() {
    let home = tempfile::tempdir().unwrap();
    let out = run_cli_success(home.path(), &["config", "list"]);
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["site_key"], "site-total");
    assert_eq!(json["resolver"]["timeout_ms"], 5000);
}

#[test]
fn test_offline_run_counts_locally_until_a_source_answers() {
    let home = offline_home();

    let first: serde_json::Value =
        serde_json::from_str(&run_cli_success(home.path(), &["run", "--session", "s1"])).unwrap();
    assert_eq!(first["operation"], "increment");
    assert_eq!(first["value"], 1);
    assert_eq!(first["origin"]["kind"], "local_increment");

    // nothing remote confirmed the visit, so the session is still uncounted
    let second: serde_json::Value =
        serde_json::from_str(&run_cli_success(home.path(), &["run", "--session", "s1"])).unwrap();
    assert_eq!(second["value"], 2);
}

#[test]
fn test_stats_and_reset() {
    let home = offline_home();
    run_cli_success(home.path(), &["run", "--session", "s1"]);

    let stats: serde_json::Value =
        serde_json::from_str(&run_cli_success(home.path(), &["stats", "--session", "s1"])).unwrap();
    assert_eq!(stats["site"]["cached_count"], 1);
    assert_eq!(stats["site"]["counted_this_session"], false);
    assert_eq!(stats["page"]["key"]["key"], "page-home");
    assert_eq!(stats["sources"], serde_json::json!([]));

    run_cli_success(home.path(), &["reset"]);

    let stats: serde_json::Value =
        serde_json::from_str(&run_cli_success(home.path(), &["stats", "--session", "s1"])).unwrap();
    assert!(stats["site"]["cached_count"].is_null());
}

#[test]
fn test_reset_forgets_every_session() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", mockito::Matcher::Regex(r"^/hit/".into()))
        .with_status(200)
        .with_body(r#"{"value": 5}"#)
        .create();

    let home = tempfile::tempdir().unwrap();
    let sources = format!(
        r#"[{{"name": "mock", "base_url": "{}", "style": {{"kind": "verb_path"}}}}]"#,
        server.url()
    );
    run_cli_success(home.path(), &["config", "set", "resolver.sources", &sources]);

    for session in ["s1", "s2"] {
        let out: serde_json::Value =
            serde_json::from_str(&run_cli_success(home.path(), &["run", "--session", session]))
                .unwrap();
        assert_eq!(out["origin"]["kind"], "remote");
    }
    let counted = |session: &str| -> bool {
        let stats: serde_json::Value = serde_json::from_str(&run_cli_success(
            home.path(),
            &["stats", "--session", session],
        ))
        .unwrap();
        stats["site"]["counted_this_session"].as_bool().unwrap()
    };
    assert!(counted("s1"));
    assert!(counted("s2"));

    let out = run_cli_success(home.path(), &["reset"]);
    assert!(out.contains("4 session flags removed"), "{out}");
    assert!(!counted("s1"));
    assert!(!counted("s2"));
}
