//! Integration tests for the pxf CLI
//!
//! These tests run the binary against a temporary session directory and
//! check exit codes, output and the stored documents.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run pxf with an explicit (empty) config and session directory
fn run_pxf(workdir: &Path, args: &[&str]) -> Output {
    let config = workdir.join("pxf.toml");
    if !config.exists() {
        fs::write(&config, "").expect("should write config");
    }
    Command::new(env!("CARGO_BIN_EXE_pxf"))
        .current_dir(workdir)
        .arg("--config")
        .arg(&config)
        .arg("--session")
        .arg(workdir.join("session"))
        .args(args)
        .output()
        .expect("Failed to execute pxf")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_show_fresh_session() {
    let temp = TempDir::new().unwrap();
    let output = run_pxf(temp.path(), &["show"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Layers (1):"), "stdout: {}", out);
    assert!(out.contains("Frames (1): 100ms"), "stdout: {}", out);
    assert!(out.contains("History: 1/1"), "stdout: {}", out);

    let written: Vec<_> = fs::read_dir(temp.path().join("session"))
        .unwrap()
        .collect();
    assert!(written.is_empty(), "show wrote {:?}", written);
}

#[test]
fn test_edit_commands_persist() {
    let temp = TempDir::new().unwrap();
    let edits: [&[&str]; 4] = [
        &["add-layer"],
        &["add-frame"],
        &["add-frame"],
        &["duration", "2", "250"],
    ];
    for args in edits {
        let output = run_pxf(temp.path(), args);
        assert!(
            output.status.success(),
            "{:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let out = stdout(&run_pxf(temp.path(), &["show"]));
    assert!(out.contains("Layers (2):"), "stdout: {}", out);
    assert!(out.contains("Frames (3): 100ms 100ms 250ms (total 450ms)"), "stdout: {}", out);
    assert!(out.contains("History: 5/5"), "stdout: {}", out);
    assert!(temp.path().join("session/artworkObject.json").exists());
}

#[test]
fn test_undo_redo() {
    let temp = TempDir::new().unwrap();
    run_pxf(temp.path(), &["add-frame"]);
    assert!(run_pxf(temp.path(), &["undo"]).status.success());
    let out = stdout(&run_pxf(temp.path(), &["show"]));
    assert!(out.contains("Frames (1):"), "stdout: {}", out);

    assert!(run_pxf(temp.path(), &["redo"]).status.success());
    let out = stdout(&run_pxf(temp.path(), &["show"]));
    assert!(out.contains("Frames (2):"), "stdout: {}", out);

    let out = stdout(&run_pxf(temp.path(), &["redo"]));
    assert!(out.contains("Nothing to redo"));
}

#[test]
fn test_out_of_range_index_is_invalid_args() {
    let temp = TempDir::new().unwrap();
    let output = run_pxf(temp.path(), &["delete-layer", "5"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("out of range"));
}

#[test]
fn test_new_uses_canvas_options() {
    let temp = TempDir::new().unwrap();
    run_pxf(temp.path(), &["add-layer"]);
    let output = run_pxf(
        temp.path(),
        &["new", "--width", "4", "--height", "2", "--background", "white"],
    );
    assert!(output.status.success());
    let out = stdout(&run_pxf(temp.path(), &["show"]));
    assert!(out.contains("Layers (1):"), "stdout: {}", out);
    assert!(out.contains("size=4x2"), "stdout: {}", out);
    assert!(out.contains("History: 1/1"), "stdout: {}", out);
}

#[test]
fn test_new_rejects_zero_size() {
    let temp = TempDir::new().unwrap();
    for args in [["new", "--width", "0"], ["new", "--height", "0"]] {
        let output = run_pxf(temp.path(), &args);
        assert_eq!(output.status.code(), Some(2), "{:?}", args);
    }
    let output = run_pxf(temp.path(), &["new", "--width", "0", "--height", "3"]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("canvas.width"));
    assert!(!temp.path().join("session/artworkObject.json").exists());
}

#[test]
fn test_frame_duration_flag() {
    let temp = TempDir::new().unwrap();
    let output = run_pxf(temp.path(), &["--frame-duration", "40", "add-frame"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let out = stdout(&run_pxf(temp.path(), &["show"]));
    assert!(out.contains("Frames (2): 100ms 40ms (total 140ms)"), "stdout: {}", out);

    let output = run_pxf(temp.path(), &["--frame-duration", "0", "add-frame"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_export_frame_png() {
    let temp = TempDir::new().unwrap();
    run_pxf(temp.path(), &["new", "--width", "3", "--height", "3", "--background", "black"]);
    let png = temp.path().join("out/frame.png");
    let output = run_pxf(temp.path(), &["export-frame", "-o", png.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let img = image::open(&png).expect("should open exported png").to_rgba8();
    assert_eq!(img.dimensions(), (3, 3));
    assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0, 255]);
}

#[test]
fn test_export_import_roundtrip() {
    let temp = TempDir::new().unwrap();
    run_pxf(temp.path(), &["new", "--width", "2", "--height", "2"]);
    run_pxf(temp.path(), &["add-frame"]);
    let exported = temp.path().join("art.json");
    assert!(run_pxf(temp.path(), &["export", "-o", exported.to_str().unwrap()])
        .status
        .success());
    assert!(fs::read_to_string(&exported)
        .unwrap()
        .contains("data:image/png;base64,"));

    run_pxf(temp.path(), &["reset"]);
    let output = run_pxf(temp.path(), &["import", exported.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let out = stdout(&run_pxf(temp.path(), &["show"]));
    assert!(out.contains("Frames (2):"), "stdout: {}", out);
    assert!(out.contains("size=2x2"), "stdout: {}", out);
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("pxf.toml"), "[timeline]\ndefault_duration = 0\n").unwrap();
    let output = run_pxf(temp.path(), &["show"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("timeline.default_duration"));
}
