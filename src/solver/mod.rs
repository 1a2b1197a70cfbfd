//! MNA (Modified Nodal Analysis) solver.
//!
//! This module provides the numerical engine for DC circuit analysis.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C connect voltage sources and VCVSs to nodes
//! - D is 0 for ideal sources
//! - v is the vector of non-ground node voltages
//! - j is the vector of voltage source branch currents
//! - i is the sum of current sources into each node
//! - e is the vector of voltage source values (0 for a VCVS row)

mod anomaly;
mod derived;
mod engine;
mod mna;

pub use anomaly::{detect_anomaly, AnomalyKind, AnomalyReport};
pub use derived::{derive_quantities, SolverResult};
pub use engine::{analyze, solve, Analysis, Engine, EngineConfig, SolveStatus};
pub use mna::{assemble, MnaMatrix, MnaSystem};

/// Minimum conductance to ground on every node, to prevent a singular
/// matrix from a floating node.
///
/// It only holds a node whose own conductance stays below roughly
/// `MIN_CONDUCTANCE / f64::EPSILON` (about 1e3 to 1e4 S). Above that the
/// leakage is lost to rounding in the diagonal, and a floating island of
/// such elements (for example an unwired 1e-5 ohm resistor) is reported
/// as singular.
pub const MIN_CONDUCTANCE: f64 = 1e-12;

/// LU pivots smaller than this are treated as zero. The factorization
/// also applies a threshold scaled to the largest matrix entry.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-15;

/// Current magnitude (amps) above which a result is flagged as saturated.
pub const DEFAULT_SATURATION_THRESHOLD: f64 = 9999.0;
