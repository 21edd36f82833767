// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_file(prefix: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("sidbus-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = dir.join(format!("{}-{}.yaml", prefix, nonce));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

fn sidbus() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sidbus"))
}

#[test]
fn test_script_unknown_fields_exit_2() {
    let script = write_temp_file(
        "script-unknown",
        r#"
schema_version: "1.0"
ops: []
unexpected_field: 123
"#,
    );

    let output = sidbus()
        .args(["test", "--script", script.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_write_read_expect_passes() {
    let script = write_temp_file(
        "script-roundtrip",
        r#"
schema_version: "1.0"
ops:
  - write: { address: 24, data: 15 }
  - read: { address: 24, expect: 15 }
  - pause
  - pause
  - read: { address: 24, expect: 15 }
"#,
    );

    let output = sidbus()
        .args(["test", "--script", script.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_expect_mismatch_exit_1() {
    let script = write_temp_file(
        "script-mismatch",
        r#"
ops:
  - write: { address: 5, data: 66 }
  - read: { address: 5, expect: 67 }
"#,
    );

    let output = sidbus()
        .args(["test", "--script", script.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_invalid_board_config_exit_2() {
    let board = write_temp_file(
        "board-invalid",
        r#"
name: "too-many-sockets"
sockets:
  - {}
  - {}
  - {}
  - {}
  - {}
"#,
    );
    let script = write_temp_file("script-empty", "ops: []\n");

    let output = sidbus()
        .args([
            "test",
            "--board",
            board.to_str().unwrap(),
            "--script",
            script.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_result_report_written() {
    let script = write_temp_file(
        "script-report",
        r#"
ops:
  - write: { address: 0, data: 170 }
  - read: { address: 0, expect: 170 }
  - timed_write: { address: 255, data: 255, cycles: 50 }
"#,
    );
    let output_path = write_temp_file("result", "").with_extension("json");

    let output = sidbus()
        .args([
            "test",
            "--script",
            script.to_str().unwrap(),
            "--output",
            output_path.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
    let report = std::fs::read_to_string(&output_path).expect("result report missing");
    assert!(report.contains("\"status\": \"pass\""));
    assert!(report.contains("\"ops_executed\": 3"));
}

#[test]
fn test_bringup_with_genuine_board() {
    let board = write_temp_file(
        "board-genuine",
        r#"
name: "dual-6581"
clock_rate: 985248
sockets:
  - chip: "6581"
  - chip: "6581"
"#,
    );

    let output = sidbus()
        .args(["--board", board.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_missing_board_file_exit_2() {
    let output = sidbus()
        .args(["--board", "/nonexistent/board.yaml"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_lifecycle_script_runs_clean() {
    let script = write_temp_file(
        "script-lifecycle",
        r#"
ops:
  - enable
  - write: { address: 24, data: 143 }
  - disable
  - enable
  - read: { address: 24, expect: 143 }
  - reset
  - hard_reset
  - clear_registers: { chip: 0 }
  - read: { address: 24, expect: 0 }
  - clear_bus
"#,
    );

    let output = sidbus()
        .args(["test", "--script", script.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(0));
}
