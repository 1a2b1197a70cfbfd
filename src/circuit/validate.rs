//! Schematic validation.
//!
//! None of these findings stop a solve. They exist so the editor can show
//! why a wire is ignored or a terminal was folded into ground.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::warn;

use super::element::{Connection, Element, ElementKind};
use super::types::{ElementId, TerminalId};

/// A non-fatal finding about a schematic snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Diagnostic {
    /// Connection endpoint names no element terminal; the wire is ignored.
    UnresolvedTerminal {
        connection: usize,
        terminal: TerminalId,
    },
    /// Wire still being drawn; ignored.
    IncompleteConnection { connection: usize },
    /// Two element slots share one terminal id and are treated as one terminal.
    DuplicateTerminal { terminal: TerminalId },
    /// Two elements share an id; the later one wins in the result maps.
    DuplicateElement { element: ElementId },
    /// Resistance is zero, negative or not finite.
    NonPositiveResistance { element: ElementId, resistance: f64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnresolvedTerminal {
                connection,
                terminal,
            } => write!(
                f,
                "connection #{connection} references unknown terminal '{terminal}'"
            ),
            Diagnostic::IncompleteConnection { connection } => {
                write!(f, "connection #{connection} has a missing endpoint")
            }
            Diagnostic::DuplicateTerminal { terminal } => {
                write!(f, "terminal '{terminal}' is listed by more than one element slot")
            }
            Diagnostic::DuplicateElement { element } => {
                write!(f, "element id '{element}' is used more than once")
            }
            Diagnostic::NonPositiveResistance {
                element,
                resistance,
            } => write!(f, "resistor '{element}' has non-positive resistance {resistance}"),
        }
    }
}

/// Collect diagnostics for a snapshot.
pub fn validate_schematic(elements: &[Element], connections: &[Connection]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let mut element_ids = HashSet::new();
    let mut terminals: HashMap<&TerminalId, usize> = HashMap::new();
    for element in elements {
        if !element_ids.insert(&element.id) {
            diagnostics.push(Diagnostic::DuplicateElement {
                element: element.id.clone(),
            });
        }
        for terminal in element.terminals() {
            let seen = terminals.entry(terminal).or_insert(0);
            *seen += 1;
            if *seen == 2 {
                diagnostics.push(Diagnostic::DuplicateTerminal {
                    terminal: terminal.clone(),
                });
            }
        }
        if let ElementKind::Resistor { resistance, .. } = element.kind {
            if !(resistance.is_finite() && resistance > 0.0) {
                diagnostics.push(Diagnostic::NonPositiveResistance {
                    element: element.id.clone(),
                    resistance,
                });
            }
        }
    }

    for (i, connection) in connections.iter().enumerate() {
        let Some((a, b)) = connection.endpoints() else {
            diagnostics.push(Diagnostic::IncompleteConnection { connection: i });
            continue;
        };
        for terminal in [a, b] {
            if !terminals.contains_key(terminal) {
                diagnostics.push(Diagnostic::UnresolvedTerminal {
                    connection: i,
                    terminal: terminal.clone(),
                });
            }
        }
    }

    for diagnostic in &diagnostics {
        warn!(%diagnostic, "schematic diagnostic");
    }

    diagnostics
}
