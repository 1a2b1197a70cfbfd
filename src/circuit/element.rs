//! Elements, connections and the schematic snapshot handed to the engine.
//!
//! The external document model describes every element with the same flat
//! record (`id`, `kind`, `value`, `terminals`). Inside the engine the kind
//! carries its own payload, so stamping can match exhaustively instead of
//! indexing into a terminal list and hoping the length is right.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{ElementId, TerminalId};
use crate::error::{NodalError, Result};

/// A pair of terminals with a polarity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub positive: TerminalId,
    pub negative: TerminalId,
}

impl Port {
    pub fn new(positive: impl Into<TerminalId>, negative: impl Into<TerminalId>) -> Self {
        Self {
            positive: positive.into(),
            negative: negative.into(),
        }
    }
}

/// Element kind with its kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Resistance in ohms.
    Resistor { resistance: f64, port: Port },
    /// Enforces `V(positive) - V(negative) = voltage`.
    VoltageSource { voltage: f64, port: Port },
    /// Pushes `current` amps out of the positive terminal into the circuit.
    CurrentSource { current: f64, port: Port },
    /// Enforces `V(out+) - V(out-) = gain * (V(in+) - V(in-))`.
    Vcvs { gain: f64, output: Port, input: Port },
}

/// Flat element kind tag used by the external data contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Resistor,
    VoltageSource,
    CurrentSource,
    #[serde(rename = "VCVS")]
    Vcvs,
}

impl ElementType {
    /// Number of terminal slots this kind expects.
    pub fn terminal_count(&self) -> usize {
        match self {
            ElementType::Resistor | ElementType::VoltageSource | ElementType::CurrentSource => 2,
            ElementType::Vcvs => 4,
        }
    }
}

/// An element of the schematic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ElementDef", into = "ElementDef")]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
}

impl Element {
    /// Create a resistor. Terminals are given as `[negative, positive]`.
    pub fn resistor(
        id: impl Into<ElementId>,
        resistance: f64,
        terminals: [&str; 2],
    ) -> Self {
        Self {
            id: id.into(),
            kind: ElementKind::Resistor {
                resistance,
                port: Port::new(terminals[1], terminals[0]),
            },
        }
    }

    /// Create an independent voltage source. Terminals are given as `[negative, positive]`.
    pub fn voltage_source(id: impl Into<ElementId>, voltage: f64, terminals: [&str; 2]) -> Self {
        Self {
            id: id.into(),
            kind: ElementKind::VoltageSource {
                voltage,
                port: Port::new(terminals[1], terminals[0]),
            },
        }
    }

    /// Create an independent current source. Terminals are given as `[negative, positive]`.
    pub fn current_source(id: impl Into<ElementId>, current: f64, terminals: [&str; 2]) -> Self {
        Self {
            id: id.into(),
            kind: ElementKind::CurrentSource {
                current,
                port: Port::new(terminals[1], terminals[0]),
            },
        }
    }

    /// Create a VCVS. Terminals are given as `[out+, out-, in+, in-]`.
    pub fn vcvs(id: impl Into<ElementId>, gain: f64, terminals: [&str; 4]) -> Self {
        Self {
            id: id.into(),
            kind: ElementKind::Vcvs {
                gain,
                output: Port::new(terminals[0], terminals[1]),
                input: Port::new(terminals[2], terminals[3]),
            },
        }
    }

    /// Build an element from the flat external record.
    ///
    /// Two-terminal kinds list their terminals as `[negative, positive]`,
    /// a VCVS as `[out+, out-, in+, in-]`.
    pub fn from_terminals(
        id: impl Into<ElementId>,
        element_type: ElementType,
        value: f64,
        terminals: &[TerminalId],
    ) -> Result<Self> {
        let id = id.into();
        if terminals.len() != element_type.terminal_count() {
            return Err(NodalError::invalid_element(
                id.as_str(),
                format!(
                    "{:?} requires {} terminals, got {}",
                    element_type,
                    element_type.terminal_count(),
                    terminals.len()
                ),
            ));
        }

        let two = || Port {
            positive: terminals[1].clone(),
            negative: terminals[0].clone(),
        };

        let kind = match element_type {
            ElementType::Resistor => ElementKind::Resistor {
                resistance: value,
                port: two(),
            },
            ElementType::VoltageSource => ElementKind::VoltageSource {
                voltage: value,
                port: two(),
            },
            ElementType::CurrentSource => ElementKind::CurrentSource {
                current: value,
                port: two(),
            },
            ElementType::Vcvs => ElementKind::Vcvs {
                gain: value,
                output: Port {
                    positive: terminals[0].clone(),
                    negative: terminals[1].clone(),
                },
                input: Port {
                    positive: terminals[2].clone(),
                    negative: terminals[3].clone(),
                },
            },
        };

        Ok(Self { id, kind })
    }

    /// Flat kind tag.
    pub fn element_type(&self) -> ElementType {
        match self.kind {
            ElementKind::Resistor { .. } => ElementType::Resistor,
            ElementKind::VoltageSource { .. } => ElementType::VoltageSource,
            ElementKind::CurrentSource { .. } => ElementType::CurrentSource,
            ElementKind::Vcvs { .. } => ElementType::Vcvs,
        }
    }

    /// Scalar value: ohms, volts, amps or gain.
    pub fn value(&self) -> f64 {
        match self.kind {
            ElementKind::Resistor { resistance, .. } => resistance,
            ElementKind::VoltageSource { voltage, .. } => voltage,
            ElementKind::CurrentSource { current, .. } => current,
            ElementKind::Vcvs { gain, .. } => gain,
        }
    }

    /// Terminals in slot order of the flat contract.
    pub fn terminals(&self) -> Vec<&TerminalId> {
        match &self.kind {
            ElementKind::Resistor { port, .. }
            | ElementKind::VoltageSource { port, .. }
            | ElementKind::CurrentSource { port, .. } => vec![&port.negative, &port.positive],
            ElementKind::Vcvs { output, input, .. } => vec![
                &output.positive,
                &output.negative,
                &input.positive,
                &input.negative,
            ],
        }
    }

    /// The port across which this element's voltage and current are reported.
    pub fn primary_port(&self) -> &Port {
        match &self.kind {
            ElementKind::Resistor { port, .. }
            | ElementKind::VoltageSource { port, .. }
            | ElementKind::CurrentSource { port, .. } => port,
            ElementKind::Vcvs { output, .. } => output,
        }
    }

    /// Whether this element adds a branch-current unknown to the MNA system.
    pub fn is_voltage_type(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::VoltageSource { .. } | ElementKind::Vcvs { .. }
        )
    }
}

/// Flat element record as exchanged with the document model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDef {
    pub id: ElementId,
    pub kind: ElementType,
    pub value: f64,
    pub terminals: Vec<TerminalId>,
}

impl TryFrom<ElementDef> for Element {
    type Error = NodalError;

    fn try_from(def: ElementDef) -> Result<Self> {
        Element::from_terminals(def.id, def.kind, def.value, &def.terminals)
    }
}

impl From<Element> for ElementDef {
    fn from(element: Element) -> Self {
        ElementDef {
            kind: element.element_type(),
            value: element.value(),
            terminals: element.terminals().into_iter().cloned().collect(),
            id: element.id,
        }
    }
}

/// A wire between two terminals. Either endpoint may be missing while the
/// wire is still being drawn; such connections are ignored by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default)]
    pub terminal_a: Option<TerminalId>,
    #[serde(default)]
    pub terminal_b: Option<TerminalId>,
}

impl Connection {
    /// Create a connection with both endpoints bound.
    pub fn new(a: impl Into<TerminalId>, b: impl Into<TerminalId>) -> Self {
        Self {
            terminal_a: Some(a.into()),
            terminal_b: Some(b.into()),
        }
    }

    /// Both endpoints, if the wire is complete.
    pub fn endpoints(&self) -> Option<(&TerminalId, &TerminalId)> {
        match (&self.terminal_a, &self.terminal_b) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    /// Whether the wire ends on the given terminal.
    pub fn touches(&self, terminal: &TerminalId) -> bool {
        self.terminal_a.as_ref() == Some(terminal) || self.terminal_b.as_ref() == Some(terminal)
    }
}

/// Immutable snapshot of a schematic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schematic {
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Schematic {
    pub fn new(elements: Vec<Element>, connections: Vec<Connection>) -> Self {
        Self {
            elements,
            connections,
        }
    }

    /// Parse a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a snapshot from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| NodalError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&json)
    }
}
