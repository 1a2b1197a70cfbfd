//! Main analysis interface.

use serde::Serialize;
use tracing::{debug, warn};

use crate::circuit::{validate_schematic, Connection, Diagnostic, Element, NodeMap, Schematic};
use crate::error::{NodalError, Result};

use super::anomaly::{detect_anomaly, AnomalyReport};
use super::derived::{derive_quantities, SolverResult};
use super::mna::assemble;
use super::{DEFAULT_PIVOT_TOLERANCE, DEFAULT_SATURATION_THRESHOLD, MIN_CONDUCTANCE};

/// Configuration for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Conductance to ground added to every node (siemens).
    pub leakage_conductance: f64,
    /// Smallest pivot magnitude accepted by the LU factorization.
    pub pivot_tolerance: f64,
    /// Current magnitude above which a result is flagged as saturated (amps).
    pub saturation_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            leakage_conductance: MIN_CONDUCTANCE,
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
            saturation_threshold: DEFAULT_SATURATION_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the leakage conductance added to each node diagonal.
    ///
    /// Zero disables it; a node with no DC path to ground then makes the
    /// system singular.
    pub fn with_leakage_conductance(mut self, g: f64) -> Self {
        self.leakage_conductance = g;
        self
    }

    /// Set the LU pivot tolerance.
    pub fn with_pivot_tolerance(mut self, tolerance: f64) -> Self {
        self.pivot_tolerance = tolerance;
        self
    }

    /// Set the saturation threshold (in amps).
    pub fn with_saturation_threshold(mut self, threshold: f64) -> Self {
        self.saturation_threshold = threshold;
        self
    }

    /// Reject negative or non-finite settings.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("leakage conductance", self.leakage_conductance),
            ("pivot tolerance", self.pivot_tolerance),
            ("saturation threshold", self.saturation_threshold),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(NodalError::invalid_config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// How an analysis ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    /// The system was solved; the result may still carry an anomaly.
    Solved,
    /// No elements, or no node other than ground.
    Empty,
    /// The assembled matrix has no unique solution.
    Singular,
}

/// Everything the presentation layer needs after an edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub status: SolveStatus,
    pub result: SolverResult,
    pub anomaly: Option<AnomalyReport>,
    pub diagnostics: Vec<Diagnostic>,
    pub nodes: NodeMap,
}

impl Analysis {
    pub fn is_singular(&self) -> bool {
        self.status == SolveStatus::Singular
    }
}

/// The DC analysis engine.
///
/// Holds configuration only; every call recomputes from the snapshot.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Solve a snapshot. Fails only with [`NodalError::SingularMatrix`].
    pub fn solve(&self, elements: &[Element], connections: &[Connection]) -> Result<SolverResult> {
        let nodes = NodeMap::build(elements, connections);
        self.solve_with_nodes(elements, &nodes)
    }

    fn solve_with_nodes(&self, elements: &[Element], nodes: &NodeMap) -> Result<SolverResult> {
        if elements.is_empty() || nodes.node_count() == 0 {
            debug!(elements = elements.len(), "nothing to solve");
            return Ok(SolverResult::empty());
        }

        let mut system = assemble(elements, nodes, self.config.leakage_conductance);
        system.matrix.factor(self.config.pivot_tolerance)?;
        system.matrix.solve();

        Ok(derive_quantities(&system, elements, nodes))
    }

    /// Validate, solve and inspect a snapshot. Never fails: a singular
    /// system yields an empty result with [`SolveStatus::Singular`].
    pub fn analyze(&self, schematic: &Schematic) -> Analysis {
        let Schematic {
            elements,
            connections,
        } = schematic;

        let diagnostics = validate_schematic(elements, connections);
        let nodes = NodeMap::build(elements, connections);

        let (status, result) = match self.solve_with_nodes(elements, &nodes) {
            Ok(result) if result.is_empty() => (SolveStatus::Empty, result),
            Ok(result) => (SolveStatus::Solved, result),
            Err(e) => {
                warn!(error = %e, "analysis failed");
                (SolveStatus::Singular, SolverResult::empty())
            }
        };

        let anomaly = match status {
            SolveStatus::Solved => {
                detect_anomaly(&result, elements, connections, self.config.saturation_threshold)
            }
            SolveStatus::Empty | SolveStatus::Singular => None,
        };

        Analysis {
            status,
            result,
            anomaly,
            diagnostics,
            nodes,
        }
    }
}

/// Solve a snapshot with the default configuration.
pub fn solve(elements: &[Element], connections: &[Connection]) -> Result<SolverResult> {
    Engine::new().solve(elements, connections)
}

/// Analyze a snapshot with the default configuration.
pub fn analyze(schematic: &Schematic) -> Analysis {
    Engine::new().analyze(schematic)
}
