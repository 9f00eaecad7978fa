//! CLI-level tests: argument parsing, config loading, and script replay
//! through temporary files.

use std::io::Write;

use clap::Parser;
use serde_json::Value;
use tempfile::NamedTempFile;
use xstore_demo::{Cli, DemoError, execute};

fn run(args: &[&str]) -> Result<Vec<Value>, DemoError> {
    let cli = Cli::try_parse_from(args).map_err(|e| DemoError::invalid(e.to_string()))?;
    let mut out = Vec::new();
    execute(cli, &mut out)?;
    Ok(String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect())
}

fn temp_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn replay_prints_one_line_per_render() {
    let script = temp_with(
        r#"{
          "window": { "width": 1200, "height": 800 },
          "consumers": [{ "store": "breakpoint" }, { "store": "width" }],
          "steps": [
            { "op": "resize", "width": 800, "height": 800 },
            { "op": "tick" }
          ]
        }"#,
    );
    let lines = run(&["xstore-demo", "replay", script.path().to_str().unwrap()]).unwrap();
    let breakpoint: Vec<_> = lines
        .iter()
        .filter(|l| l["consumer"] == "breakpoint")
        .map(|l| l["value"].clone())
        .collect();
    assert_eq!(breakpoint, vec![Value::from("desktop"), Value::from("tablet")]);
    assert_eq!(lines.len(), 4);
}

#[test]
fn config_breakpoints_change_classification() {
    let config = temp_with("[breakpoints]\ntablet_max = 1299\ndesktop_min = 1300\n");
    let script = temp_with(r#"{"window":{"width":1200},"consumers":[{"store":"breakpoint"}]}"#);
    let lines = run(&[
        "xstore-demo",
        "--config",
        config.path().to_str().unwrap(),
        "replay",
        script.path().to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(lines[0]["value"], "tablet");
}

#[test]
fn replay_writes_output_file() {
    let script = temp_with(r#"{"consumers":[{"store":"online"}],"steps":[{"op":"online","online":false}]}"#);
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("renders.jsonl");
    let stdout = run(&[
        "xstore-demo",
        "replay",
        script.path().to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ])
    .unwrap();
    assert!(stdout.is_empty());
    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.lines().count(), 2);
}

#[test]
fn scenario_runs_by_name() {
    let lines = run(&["xstore-demo", "scenario", "presence"]).unwrap();
    assert!(lines.iter().any(|l| l["consumer"] == "document"));
}

#[test]
fn errors_map_to_exit_codes() {
    let err = run(&["xstore-demo", "replay", "/nonexistent/script.json"]).unwrap_err();
    assert_eq!(err.exit_code(), 1);

    let empty = temp_with("{}");
    let err = run(&["xstore-demo", "replay", empty.path().to_str().unwrap()]).unwrap_err();
    assert_eq!(err.exit_code(), 2);

    let bad = temp_with(r#"{"steps":[{"op":"unmount","consumer":"ghost"}]}"#);
    let err = run(&["xstore-demo", "replay", bad.path().to_str().unwrap()]).unwrap_err();
    assert_eq!(err.exit_code(), 3);

    let config = temp_with("[runtime]\nframe_interval_ms = 0\n");
    let err = run(&["xstore-demo", "--config", config.path().to_str().unwrap(), "list-scenarios"])
        .unwrap_err();
    assert!(matches!(err, DemoError::Config(_)));
}
