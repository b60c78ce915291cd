//! Command-line behaviour of the circler binary

#[cfg(unix)]
mod support;

use assert_cmd::Command;
use predicates::prelude::*;

fn circler(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("circler").unwrap();
    cmd.current_dir(dir)
        .env_remove("CIRCLE_CONFIG")
        .env_remove("RUST_LOG")
        .env("CIRCLE_TEMP_ROOT", dir.join("jobs"));
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    circler(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("presets"));
}

#[test]
fn test_presets_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = circler(dir.path())
        .args(["presets", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let presets: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let keys: Vec<&str> = presets
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["fast", "balanced", "quality", "best", "ultra"]);
    assert_eq!(presets[1]["output_size"], 320);
    assert_eq!(presets[1]["timeout_budget"], 40);
}

#[test]
fn test_presets_text_marks_default() {
    let dir = tempfile::tempdir().unwrap();
    circler(dir.path())
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("balanced").and(predicate::str::contains("(default)")));
}

#[test]
fn test_unknown_default_preset_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    circler(dir.path())
        .env("CIRCLE_DEFAULT_PRESET", "huge")
        .arg("presets")
        .assert()
        .failure()
        .stderr(predicate::str::contains("huge"));
}

#[test]
fn test_config_file_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("circle.toml"), "max_duration_secs = 90\n").unwrap();
    circler(dir.path())
        .arg("presets")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_convert_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    circler(dir.path())
        .args(["convert", "-i", "nope.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[cfg(unix)]
#[test]
fn test_convert_with_stub_tools() {
    use support::*;

    let sandbox = Sandbox::new();
    let log = sandbox.path("ffmpeg.log");
    let ffmpeg = encoder_stub(&sandbox.bin(), &log);
    let ffprobe = probe_stub(&sandbox.bin(), LANDSCAPE_PROBE_JSON);
    let source = sandbox.source("holiday.mov", 4096);

    circler(sandbox.dir.path())
        .arg("--ffmpeg")
        .arg(&ffmpeg)
        .arg("--ffprobe")
        .arg(&ffprobe)
        .args(["convert", "-i", "holiday.mov", "--preset", "quality"])
        .assert()
        .success()
        .stdout(predicate::str::contains("holiday_circle.mp4"));

    assert!(source.with_file_name("holiday_circle.mp4").exists());
    assert!(std::fs::read_to_string(&log).unwrap().contains("scale=480:480"));
}

#[cfg(unix)]
#[test]
fn test_probe_reports_planned_crop() {
    use support::*;

    let sandbox = Sandbox::new();
    let ffprobe = probe_stub(&sandbox.bin(), LANDSCAPE_PROBE_JSON);
    sandbox.source("clip.mp4", 10);

    let output = circler(sandbox.dir.path())
        .arg("--ffprobe")
        .arg(&ffprobe)
        .args(["probe", "-i", "clip.mp4", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["width"], 1920);
    assert_eq!(report["has_audio"], true);
    assert_eq!(report["crop"]["size"], 1080);
    assert_eq!(report["crop"]["x_offset"], 420);
}

#[cfg(unix)]
#[test]
fn test_chat_session_over_stdin() {
    use support::*;

    let sandbox = Sandbox::new();
    let log = sandbox.path("ffmpeg.log");
    let ffmpeg = encoder_stub(&sandbox.bin(), &log);
    let ffprobe = probe_stub(&sandbox.bin(), LANDSCAPE_PROBE_JSON);
    let source = sandbox.source("clip.mp4", 2048);

    circler(sandbox.dir.path())
        .arg("--ffmpeg")
        .arg(&ffmpeg)
        .arg("--ffprobe")
        .arg(&ffprobe)
        .args(["chat", "--out-dir", "circles"])
        .write_stdin(format!("/start\n/upload {}\n", source.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("q_balanced"));

    // The choice never came, so nothing was encoded
    assert!(!log.exists());
}
