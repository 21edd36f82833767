// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use sidbus_config::BoardConfig;
use sidbus_core::{BusController, ClockSource};

const EXIT_PASS: u8 = 0;
const EXIT_EXPECT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(author, version, about = "SidBus Controller", long_about = None)]
struct Cli {
    /// Path to the board configuration (YAML). Defaults to a dual-socket
    /// 1 MHz board.
    #[arg(short, long)]
    board: Option<PathBuf>,

    /// Enable bus-level execution tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deterministic, CI-friendly runner driven by a command script (YAML).
    Test(TestArgs),
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the board configuration (YAML)
    #[arg(short, long)]
    board: Option<PathBuf>,

    /// Path to the command script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Optional path to write a result report (JSON)
    #[arg(long)]
    output: Option<PathBuf>,
}

/// One scripted bus command. Externally tagged so unit commands read as
/// bare strings in the YAML list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum ScriptOp {
    Write { address: u8, data: u8 },
    Read { address: u8, expect: Option<u8> },
    TimedWrite { address: u8, data: u8, cycles: u16 },
    Pause,
    ClearBus,
    Enable,
    Disable,
    Reset,
    HardReset,
    ClearRegisters { chip: usize },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandScript {
    #[serde(default)]
    schema_version: Option<String>,
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    ops: Vec<ScriptOp>,
}

#[derive(Debug, Serialize)]
struct ExpectFailure {
    op_index: usize,
    address: u8,
    expected: u8,
    actual: u8,
}

#[derive(Debug, Serialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    ops_executed: usize,
    failures: Vec<ExpectFailure>,
    board: String,
    clock_rate: u32,
    clock_source: ClockSource,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Some(Commands::Test(args)) => run_test(args),
        None => run_bringup(cli),
    }
}

fn load_board(path: Option<&PathBuf>) -> anyhow::Result<BoardConfig> {
    match path {
        Some(path) => BoardConfig::from_file(path),
        None => Ok(BoardConfig::default()),
    }
}

/// Default mode: bring the bus up, probe the clock input, report.
fn run_bringup(cli: Cli) -> ExitCode {
    info!("Starting SidBus Controller");

    let config = match load_board(cli.board.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut bus = match BusController::new(config) {
        Ok(bus) => bus,
        Err(e) => {
            error!("Bus bring-up failed: {}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    let source = bus.detect_clock_source();
    bus.enable();
    info!(
        "Board '{}' up: {} Hz ({:?} clock), {} active chips",
        bus.config().name,
        bus.config().clock_rate,
        source,
        bus.config().active_chips
    );
    ExitCode::from(EXIT_PASS)
}

fn run_test(args: TestArgs) -> ExitCode {
    let config = match load_board(args.board.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let script_text = match std::fs::read_to_string(&args.script) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to read script {:?}: {}", args.script, e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let script: CommandScript = match serde_yaml::from_str(&script_text) {
        Ok(script) => script,
        Err(e) => {
            error!("Failed to parse script {:?}: {}", args.script, e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut bus = match BusController::new(config) {
        Ok(bus) => bus,
        Err(e) => {
            error!("Bus bring-up failed: {}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };
    let clock_source = bus.detect_clock_source();
    bus.enable();

    let mut failures = Vec::new();
    for (index, op) in script.ops.iter().enumerate() {
        tracing::debug!("op {}: {:?}", index, op);
        match *op {
            ScriptOp::Write { address, data } => bus.write(address, data),
            ScriptOp::Read { address, expect } => {
                let actual = bus.read(address);
                if let Some(expected) = expect {
                    if actual != expected {
                        error!(
                            "op {}: read {:#04x} returned {:#04x}, expected {:#04x}",
                            index, address, actual, expected
                        );
                        failures.push(ExpectFailure {
                            op_index: index,
                            address,
                            expected,
                            actual,
                        });
                    }
                }
            }
            ScriptOp::TimedWrite {
                address,
                data,
                cycles,
            } => bus.timed_write(address, data, cycles),
            ScriptOp::Pause => bus.toggle_pause(),
            ScriptOp::ClearBus => bus.clear_bus(),
            ScriptOp::Enable => bus.enable(),
            ScriptOp::Disable => bus.disable(),
            ScriptOp::Reset => bus.reset_sid(),
            ScriptOp::HardReset => bus.hard_reset(),
            ScriptOp::ClearRegisters { chip } => bus.clear_chip_registers(chip),
        }
    }

    let status = if failures.is_empty() { "pass" } else { "fail" };
    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        ops_executed: script.ops.len(),
        failures,
        board: bus.config().name.clone(),
        clock_rate: bus.config().clock_rate,
        clock_source,
    };

    if let Some(path) = &args.output {
        match std::fs::File::create(path) {
            Ok(f) => {
                if let Err(e) = serde_json::to_writer_pretty(f, &result) {
                    error!("Failed to write result {:?}: {}", path, e);
                    return ExitCode::from(EXIT_RUNTIME_ERROR);
                }
            }
            Err(e) => {
                error!("Failed to create result {:?}: {}", path, e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    }

    info!(
        "Script finished: {} ops, {} expect failures",
        result.ops_executed,
        result.failures.len()
    );
    if result.failures.is_empty() {
        ExitCode::from(EXIT_PASS)
    } else {
        ExitCode::from(EXIT_EXPECT_FAIL)
    }
}
