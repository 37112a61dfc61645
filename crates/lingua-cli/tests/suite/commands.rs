use assert_cmd::Command;
use predicates::prelude::*;

fn lingua() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("lingua"))
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn help_mentions_core_commands() {
    lingua().arg("--help").assert().success().stdout(
        predicate::str::contains("translate")
            .and(predicate::str::contains("speak"))
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("demo"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn translate_json_uses_the_requested_language() {
    let temp = tempfile::tempdir().unwrap();
    let output = lingua()
        .current_dir(temp.path())
        .args(["translate", "Hello!", "--to", "fr", "--json"])
        .output()
        .unwrap();

    let v = json_stdout(&output);
    assert_eq!(v["text"], "bonjour");
    assert_eq!(v["target_language"], "fr");
    assert_eq!(v["script"], "latin");
    assert_eq!(v["cached"], false);
}

#[test]
fn target_language_persists_between_runs() {
    let temp = tempfile::tempdir().unwrap();
    let prefs = temp.path().join("prefs.json");
    let config = temp.path().join("lingua.toml");
    std::fs::write(
        &config,
        format!("[preferences]\npath = {:?}\n", prefs.display().to_string()),
    )
    .unwrap();

    let output = lingua()
        .arg("--config")
        .arg(&config)
        .args(["translate", "goodbye", "--to", "de", "--json"])
        .output()
        .unwrap();
    assert_eq!(json_stdout(&output)["text"], "auf wiedersehen");

    let output = lingua()
        .arg("--config")
        .arg(&config)
        .args(["translate", "thank you", "--json"])
        .output()
        .unwrap();
    let v = json_stdout(&output);
    assert_eq!(v["target_language"], "de");
    assert_eq!(v["text"], "danke");

    let stored: serde_json::Value = serde_json::from_slice(&std::fs::read(&prefs).unwrap()).unwrap();
    assert_eq!(stored["target_language"], "de");
}

#[test]
fn status_json_lists_configured_resources() {
    let temp = tempfile::tempdir().unwrap();
    let output = lingua()
        .current_dir(temp.path())
        .args(["status", "--json"])
        .output()
        .unwrap();

    let v = json_stdout(&output);
    assert_eq!(v["memory"]["budget"]["total"], 512 * 1024 * 1024);
    let ids: Vec<&str> = v["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|resource| resource["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["speech", "translation"]);
    assert_eq!(v["cache"]["item_count"], 0);
}

#[test]
fn status_json_includes_recent_log_lines() {
    let temp = tempfile::tempdir().unwrap();
    let output = lingua()
        .current_dir(temp.path())
        .env_remove("RUST_LOG")
        .args(["status", "--json", "--logs", "5"])
        .output()
        .unwrap();

    let v = json_stdout(&output);
    let lines = v["recent_logs"].as_array().unwrap();
    assert!(!lines.is_empty() && lines.len() <= 5);
    assert!(lines
        .iter()
        .any(|line| line.as_str().unwrap().contains("runtime ready")));
}

#[test]
fn status_log_tail_can_be_disabled() {
    let temp = tempfile::tempdir().unwrap();
    let output = lingua()
        .current_dir(temp.path())
        .args(["status", "--json", "--logs", "0"])
        .output()
        .unwrap();

    let v = json_stdout(&output);
    assert_eq!(v["recent_logs"], serde_json::json!([]));
}

#[test]
fn speak_reports_synthesized_audio() {
    let temp = tempfile::tempdir().unwrap();
    let output = lingua()
        .current_dir(temp.path())
        .args(["speak", "hello", "--json"])
        .output()
        .unwrap();

    let v = json_stdout(&output);
    assert_eq!(v["duration_ms"], 300);
    assert!(v["bytes"].as_u64().unwrap() > 0);
}

#[test]
fn demo_walks_through_background_and_foreground() {
    let temp = tempfile::tempdir().unwrap();
    let output = lingua()
        .current_dir(temp.path())
        .args(["demo", "--json"])
        .output()
        .unwrap();

    let v = json_stdout(&output);
    let actions: Vec<&str> = v["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|step| step["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"background"));
    assert!(actions.contains(&"foreground"));
}

#[test]
fn config_prints_effective_defaults() {
    let temp = tempfile::tempdir().unwrap();
    lingua()
        .current_dir(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[cache]")
                .and(predicate::str::contains("eviction_threshold = 0.8"))
                .and(predicate::str::contains("[[resources]]")),
        );
}

#[test]
fn invalid_config_exits_with_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("lingua.toml");
    std::fs::write(&config, "[cache]\neviction_threshold = 2.0\n").unwrap();

    lingua()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("eviction_threshold"));
}
