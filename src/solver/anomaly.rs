//! Short-circuit style anomaly detection on solved results.
//!
//! Detection only annotates a result; it never changes the numbers.

use serde::Serialize;
use tracing::warn;

use super::derived::SolverResult;
use crate::circuit::{Connection, Element, ElementId, ElementKind};

/// What made a result anomalous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalyKind {
    /// A voltage or current is NaN or infinite.
    NonFinite,
    /// A current magnitude exceeds the saturation threshold.
    Saturated,
}

/// Diagnostic annotation for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    pub kind: AnomalyKind,
    /// Elements on the likely fault path
    pub suspect_elements: Vec<ElementId>,
    /// Indices into the snapshot's connection list
    pub suspect_connections: Vec<usize>,
}

/// Inspect a result for non-finite or saturating values.
///
/// A non-finite node voltage means the whole topology is suspect. Otherwise
/// the wires touching independent voltage source terminals are flagged as
/// the likely short path.
pub fn detect_anomaly(
    result: &SolverResult,
    elements: &[Element],
    connections: &[Connection],
    saturation_threshold: f64,
) -> Option<AnomalyReport> {
    let voltage_broken = result.node_voltages.values().any(|v| !v.is_finite());
    let current_broken = result.element_currents.values().any(|i| !i.is_finite());
    let saturated = result
        .element_currents
        .values()
        .any(|i| i.abs() > saturation_threshold);

    let kind = if voltage_broken || current_broken {
        AnomalyKind::NonFinite
    } else if saturated {
        AnomalyKind::Saturated
    } else {
        return None;
    };

    let report = if voltage_broken {
        AnomalyReport {
            kind,
            suspect_elements: elements.iter().map(|e| e.id.clone()).collect(),
            suspect_connections: (0..connections.len()).collect(),
        }
    } else {
        let sources: Vec<&Element> = elements
            .iter()
            .filter(|e| matches!(e.kind, ElementKind::VoltageSource { .. }))
            .collect();
        let suspect_connections = connections
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                sources
                    .iter()
                    .any(|s| s.terminals().into_iter().any(|t| c.touches(t)))
            })
            .map(|(i, _)| i)
            .collect();
        AnomalyReport {
            kind,
            suspect_elements: sources.iter().map(|e| e.id.clone()).collect(),
            suspect_connections,
        }
    };

    warn!(
        kind = ?report.kind,
        elements = report.suspect_elements.len(),
        connections = report.suspect_connections.len(),
        "anomalous result"
    );

    Some(report)
}
