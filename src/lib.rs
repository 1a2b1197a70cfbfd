//! # Nodal Core
//!
//! A DC circuit analysis engine for interactive schematic editors.
//!
//! This library provides:
//! - Topology extraction from wired terminals into electrical nodes
//! - Modified Nodal Analysis (MNA) assembly and LU solving
//! - Per-element current and power, with a single sign convention
//! - Short-circuit style anomaly detection for the presentation layer
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Schematic snapshot, topology extraction and validation
//! - [`solver`] - MNA matrix assembly, solving and derived quantities
//! - [`error`] - Error types
//!
//! ## Usage
//!
//! ### Library
//!
//! ```
//! use nodal_core::{solve, Connection, Element};
//!
//! let elements = vec![
//!     Element::voltage_source("V1", 5.0, ["V1.n", "V1.p"]),
//!     Element::resistor("R1", 1000.0, ["R1.a", "R1.b"]),
//! ];
//! let connections = vec![
//!     Connection::new("V1.p", "R1.b"),
//!     Connection::new("R1.a", "V1.n"),
//! ];
//!
//! let result = solve(&elements, &connections).unwrap();
//! let current = result.current(&"R1".into()).unwrap();
//! assert!((current - 0.005).abs() < 1e-9);
//! ```
//!
//! ### Native CLI
//!
//! ```bash
//! nodal schematic.json --format table
//! ```
//!
//! ## Analysis Method
//!
//! Every call recomputes from scratch:
//!
//! 1. Union-find over wires groups terminals into nodes; the largest group is ground
//! 2. Assemble the system matrix A and source vector z
//! 3. Solve Ax = z for node voltages and source branch currents
//! 4. Derive element currents and power, then flag non-finite or saturating values

pub mod circuit;
pub mod error;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{Connection, Element, ElementId, ElementKind, NodeId, NodeMap, Schematic, TerminalId};
pub use error::{NodalError, Result};
pub use solver::{analyze, solve, Analysis, Engine, EngineConfig, SolveStatus, SolverResult};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmEngine;
