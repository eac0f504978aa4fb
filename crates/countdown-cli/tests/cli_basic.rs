//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway settings file and
//! verify outputs.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(settings: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_countdown"))
        .arg("--settings")
        .arg(settings)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn settings_file() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    (dir, path)
}

#[test]
fn test_phrase() {
    let (_dir, path) = settings_file();
    let (code, stdout, _) = run_cli(&path, &["phrase", "65"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "Одна минута пять секунд");
}

#[test]
fn test_config_get_default() {
    let (_dir, path) = settings_file();
    let (code, stdout, _) = run_cli(&path, &["config", "get", "voice_interval"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "10");
}

#[test]
fn test_config_set_then_get() {
    let (_dir, path) = settings_file();
    let (code, _, _) = run_cli(&path, &["config", "set", "beep_interval", "5"]);
    assert_eq!(code, 0, "config set failed");

    let (_, stdout, _) = run_cli(&path, &["config", "get", "beep_interval"]);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_set_rejects_zero_interval() {
    let (_dir, path) = settings_file();
    let (code, _, stderr) = run_cli(&path, &["config", "set", "voice_interval", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("voice_interval"), "{stderr}");
}

#[test]
fn test_config_unknown_key_lists_known_keys() {
    let (_dir, path) = settings_file();
    let (code, _, stderr) = run_cli(&path, &["config", "get", "volume"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("melody_file"), "{stderr}");
}

#[test]
fn test_config_list_json() {
    let (_dir, path) = settings_file();
    let (code, stdout, _) = run_cli(&path, &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["final_beep_window"], 10);
    assert_eq!(parsed["restore_time"], false);
}

#[test]
fn test_config_reset() {
    let (_dir, path) = settings_file();
    run_cli(&path, &["config", "set", "melody_file", "bell.ogg"]);
    let (code, _, _) = run_cli(&path, &["config", "reset"]);
    assert_eq!(code, 0);

    let (_, stdout, _) = run_cli(&path, &["config", "get", "melody_file"]);
    assert_eq!(stdout.trim(), "example.mp3");
}

#[test]
fn test_start_rejects_zero_duration() {
    let (_dir, path) = settings_file();
    let (code, _, stderr) = run_cli(&path, &["start", "--ms", "00:00", "--mute"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"), "{stderr}");
}

#[test]
fn test_start_rejects_out_of_range_hour() {
    let (_dir, path) = settings_file();
    let (code, _, _) = run_cli(&path, &["start", "--hm", "24:00", "--mute"]);
    assert_eq!(code, 1);
}

#[test]
fn test_start_without_duration_fails() {
    let (_dir, path) = settings_file();
    let (code, _, stderr) = run_cli(&path, &["start", "--mute"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no duration given"), "{stderr}");
}

#[test]
fn test_start_json_counts_down() {
    let (_dir, path) = settings_file();
    let (code, stdout, _) = run_cli(&path, &["start", "--ms", "00:02", "--mute", "--json"]);
    assert_eq!(code, 0);

    let ticks: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let remaining: Vec<u64> = ticks
        .iter()
        .map(|t| t["seconds_remaining"].as_u64().unwrap())
        .collect();
    assert_eq!(remaining, vec![2, 1, 0]);
    assert_eq!(ticks[0]["clock"], "00:02");

    // The entered time is remembered.
    let (_, stdout, _) = run_cli(&path, &["config", "get", "ms_s"]);
    assert_eq!(stdout.trim(), "02");
}

#[test]
fn test_start_restores_last_entry() {
    let (_dir, path) = settings_file();
    run_cli(&path, &["config", "set", "restore_time", "true"]);
    run_cli(&path, &["config", "set", "ms_m", "00"]);
    run_cli(&path, &["config", "set", "ms_s", "01"]);

    let (code, stdout, _) = run_cli(&path, &["start", "--mute", "--json"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn test_start_fails_when_speech_command_is_missing() {
    let (_dir, path) = settings_file();
    let (code, stdout, stderr) = run_cli(
        &path,
        &[
            "start",
            "--ms",
            "00:01",
            "--json",
            "--speech-command",
            "definitely-not-a-speech-engine -v ru",
        ],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("definitely-not-a-speech-engine"), "{stderr}");
    assert!(stdout.is_empty());
}
