use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn raya_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("raya");
    path
}

/// A config with every network source switched off, so answers come only
/// from the knowledge file and the notes directory.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    let notes_dir = root.join("notes");
    fs::create_dir_all(&notes_dir).unwrap();

    fs::write(
        data_dir.join("knowledge.json"),
        r#"{"knowledge": {
  "capital of france": {"summary": "Paris is the capital and largest city of France, on the Seine."},
  "rct": {"answer": "Relative Cosmological Time is a decimal time scale."}
}}"#,
    )
    .unwrap();
    fs::write(
        notes_dir.join("wifi.md"),
        "Home router: the guest wifi password is on the fridge.",
    )
    .unwrap();

    let config_content = format!(
        r#"[cache]
path = "{root}/data/cache.json"

[knowledge]
path = "{root}/data/knowledge.json"

[notes]
root = "{root}/notes"

[local_model]
enabled = false

[wikipedia]
enabled = false

[web]
enabled = false

[news]
enabled = false

[research]
enabled = false
"#,
        root = root.display()
    );

    let config_path = config_dir.join("raya.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_raya(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = raya_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RAYA_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run raya binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_route_with_cloud_disabled_is_local() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_raya(&config_path, &["route", "research the legal code design"]);
    assert!(success, "route failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("route:   local"));
    assert!(stdout.contains("cloud disabled"));
    assert!(stdout.contains("research"));
}

#[test]
fn test_ask_answers_from_knowledge() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_raya(&config_path, &["ask", "Capital of France?"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.starts_with("Main Answer (Curated Knowledge):"));
    assert!(stdout.contains("Paris is the capital"));
}

#[test]
fn test_ask_second_call_is_cached() {
    let (_tmp, config_path) = setup_test_env();

    run_raya(&config_path, &["ask", "capital of france"]);
    let (stdout, stderr, success) =
        run_raya(&config_path, &["ask", "CAPITAL of France!", "--json"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);

    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["meta"]["cache"], true);
    assert_eq!(result["sources"]["knowledge"], true);
    assert!((result["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-9);
}

#[test]
fn test_ask_unknown_falls_back() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_raya(&config_path, &["ask", "who won the 1930 world cup", "--json"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);

    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["text"], "Sorry, I don't know the answer to that.");
    assert_eq!(result["sources"]["fallback"], true);
    assert!((result["confidence"].as_f64().unwrap() - 0.2).abs() < 1e-9);
    assert_eq!(result["meta"]["cache"], false);
}

#[test]
fn test_ask_no_cache_leaves_file_untouched() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_raya(&config_path, &["ask", "rct", "--no-cache"]);
    assert!(success);
    assert!(stdout.contains("Relative Cosmological Time"));
    assert!(!tmp.path().join("data").join("cache.json").exists());
}

#[test]
fn test_ask_finds_note() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_raya(&config_path, &["ask", "guest wifi password"]);
    assert!(success);
    assert!(stdout.starts_with("Main Answer (Local notes):"));
    assert!(stdout.contains("on the fridge"));
}

#[test]
fn test_cache_list_and_get() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_raya(&config_path, &["cache", "list"]);
    assert!(success);
    assert!(stdout.contains("Cache is empty"));

    run_raya(&config_path, &["ask", "capital of france"]);

    let (stdout, _, success) = run_raya(&config_path, &["cache", "list"]);
    assert!(success);
    assert!(stdout.contains("capital of france"));
    assert!(stdout.contains("knowledge"));

    let (stdout, _, success) = run_raya(&config_path, &["cache", "get", "Capital of France?"]);
    assert!(success);
    assert!(stdout.contains("source:     knowledge"));
    assert!(stdout.contains("Paris is the capital"));

    let (stdout, _, success) = run_raya(&config_path, &["cache", "get", "unknown"]);
    assert!(success);
    assert!(stdout.contains("No cached answer"));
}

#[test]
fn test_sources() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_raya(&config_path, &["sources"]);
    assert!(success, "sources failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("SOURCE"));
    assert!(stdout.contains("knowledge"));
    assert!(stdout.contains("custom_db"));
    assert!(stdout.contains("DISABLED (cloud.enabled = false)"));
}

#[test]
fn test_invalid_config_fails() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("bad.toml");
    fs::write(&bad, "[cache]\nmin_confidence = 2.0\n").unwrap();

    let (_, stderr, success) = run_raya(&bad, &["ask", "anything"]);
    assert!(!success);
    assert!(stderr.contains("cache.min_confidence"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let (tmp, _) = setup_test_env();
    let (_, stderr, success) = run_raya(&tmp.path().join("nope.toml"), &["sources"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_completions_need_no_config() {
    let (tmp, _) = setup_test_env();
    let (stdout, _, success) = run_raya(&tmp.path().join("nope.toml"), &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("raya"));
}
