//! Nodal - DC circuit analysis from the command line
//!
//! Solves a schematic snapshot stored as JSON and prints node voltages,
//! element currents and power.
//!
//! # Usage
//!
//! ```bash
//! nodal schematic.json
//! nodal schematic.json --format json | jq .result
//! RUST_LOG=debug nodal schematic.json
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use nodal_core::{error::Result, Analysis, Engine, EngineConfig, Schematic, SolveStatus};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Human-readable tables
    Table,
    /// The full analysis as JSON
    Json,
}

/// DC circuit analysis engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the schematic snapshot (.json)
    #[arg(value_name = "SCHEMATIC_FILE")]
    schematic_file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Leakage conductance added from every node to ground (siemens)
    #[arg(long, default_value_t = nodal_core::solver::MIN_CONDUCTANCE)]
    leakage: f64,

    /// Current magnitude flagged as a likely short circuit (amps)
    #[arg(long, default_value_t = nodal_core::solver::DEFAULT_SATURATION_THRESHOLD)]
    saturation: f64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_table(analysis: &Analysis) {
    match analysis.status {
        SolveStatus::Empty => {
            println!("Nothing to solve.");
            return;
        }
        SolveStatus::Singular => {
            println!("Circuit has no unique solution (conflicting sources or a source loop).");
            return;
        }
        SolveStatus::Solved => {}
    }

    let result = &analysis.result;

    println!("{:<8} {:>14}", "Node", "Voltage (V)");
    for (node, v) in &result.node_voltages {
        println!("{:<8} {:>14.6}", node.to_string(), v);
    }

    println!();
    println!("{:<12} {:>14} {:>14}", "Element", "Current (A)", "Power (W)");
    for (id, i) in &result.element_currents {
        let p = result.power(id).unwrap_or(0.0);
        println!("{:<12} {:>14.6e} {:>14.6e}", id.as_str(), i, p);
    }

    if let Some(anomaly) = &analysis.anomaly {
        println!();
        println!(
            "Warning: {:?} result, likely short circuit near {}",
            anomaly.kind,
            anomaly
                .suspect_elements
                .iter()
                .map(|e| e.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    for diagnostic in &analysis.diagnostics {
        println!("Note: {diagnostic}");
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Load the snapshot
    let schematic = Schematic::from_file(&args.schematic_file)?;

    // Configure the engine
    let config = EngineConfig::new()
        .with_leakage_conductance(args.leakage)
        .with_saturation_threshold(args.saturation);
    let engine = Engine::with_config(config)?;

    let analysis = engine.analyze(&schematic);

    match args.format {
        Format::Table => print_table(&analysis),
        Format::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
    }

    Ok(())
}
