//! Per-element currents and power from a solved MNA vector.
//!
//! ## Sign convention
//!
//! - Resistor current flows through the element from its positive terminal
//!   to its negative terminal: `I = (V+ - V-) / R`.
//! - Source current is the current leaving the positive terminal into the
//!   external circuit. For a current source this is its fixed value; for a
//!   voltage source or VCVS it is the negated branch unknown, since the MNA
//!   branch variable is the current entering the positive terminal.
//! - Power is always power absorbed: `P = -(V+ - V-) * I` for sources,
//!   `I^2 * R` for resistors. A negative value means the element supplies
//!   energy.

use std::collections::BTreeMap;

use serde::Serialize;

use super::mna::MnaSystem;
use crate::circuit::{Element, ElementId, ElementKind, NodeId, NodeMap, Port, TerminalId};

/// Node voltages, element currents and element powers of one solve.
///
/// All three maps are empty when there was nothing to solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverResult {
    pub node_voltages: BTreeMap<NodeId, f64>,
    pub element_currents: BTreeMap<ElementId, f64>,
    pub element_power: BTreeMap<ElementId, f64>,
}

impl SolverResult {
    /// Result with all maps empty.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.node_voltages.is_empty()
            && self.element_currents.is_empty()
            && self.element_power.is_empty()
    }

    pub fn voltage(&self, node: NodeId) -> Option<f64> {
        self.node_voltages.get(&node).copied()
    }

    pub fn current(&self, element: &ElementId) -> Option<f64> {
        self.element_currents.get(element).copied()
    }

    pub fn power(&self, element: &ElementId) -> Option<f64> {
        self.element_power.get(element).copied()
    }

    /// Voltage of the node a terminal belongs to.
    pub fn terminal_voltage(&self, nodes: &NodeMap, terminal: &TerminalId) -> Option<f64> {
        self.voltage(nodes.node_of(terminal))
    }

    /// `V(positive) - V(negative)` of a port.
    pub fn port_voltage(&self, nodes: &NodeMap, port: &Port) -> Option<f64> {
        Some(self.terminal_voltage(nodes, &port.positive)? - self.terminal_voltage(nodes, &port.negative)?)
    }

    /// Sum of absorbed power over all elements. Zero up to rounding and
    /// leakage for any solved circuit.
    pub fn power_balance(&self) -> f64 {
        self.element_power.values().sum()
    }
}

/// Read node voltages out of the solution vector and compute element
/// currents and power.
pub fn derive_quantities(system: &MnaSystem, elements: &[Element], nodes: &NodeMap) -> SolverResult {
    let x = &system.matrix.x;

    let node_voltages: BTreeMap<NodeId, f64> = nodes
        .node_ids()
        .map(|node| {
            let v = node.matrix_index().map_or(0.0, |i| x[i]);
            (node, v)
        })
        .collect();

    let v = |t: &TerminalId| node_voltages.get(&nodes.node_of(t)).copied().unwrap_or(0.0);
    let across = |port: &Port| v(&port.positive) - v(&port.negative);

    let mut element_currents = BTreeMap::new();
    let mut element_power = BTreeMap::new();

    for (element, branch) in elements.iter().zip(&system.branches) {
        let (current, power) = match &element.kind {
            ElementKind::Resistor { resistance, port } => {
                let i = across(port) / resistance;
                (i, i * i * resistance)
            }
            ElementKind::CurrentSource { current, port } => (*current, -across(port) * current),
            ElementKind::VoltageSource { port, .. } => {
                let i = branch.map_or(0.0, |br| -x[system.branch_index(br)]);
                (i, -across(port) * i)
            }
            ElementKind::Vcvs { output, .. } => {
                let i = branch.map_or(0.0, |br| -x[system.branch_index(br)]);
                (i, -across(output) * i)
            }
        };
        element_currents.insert(element.id.clone(), current);
        element_power.insert(element.id.clone(), power);
    }

    SolverResult {
        node_voltages,
        element_currents,
        element_power,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Connection;
    use crate::solver::mna::assemble;
    use approx::assert_relative_eq;

    fn solve(elements: &[Element], connections: &[Connection]) -> (SolverResult, NodeMap) {
        let nodes = NodeMap::build(elements, connections);
        let mut system = assemble(elements, &nodes, 0.0);
        system.matrix.factor(1e-15).unwrap();
        system.matrix.solve();
        (derive_quantities(&system, elements, &nodes), nodes)
    }

    #[test]
    fn test_source_supplies_negative_power() {
        let elements = vec![
            Element::voltage_source("V1", 12.0, ["V1.n", "V1.p"]),
            Element::resistor("R1", 4.0, ["R1.a", "R1.b"]),
        ];
        let connections = vec![
            Connection::new("V1.p", "R1.b"),
            Connection::new("R1.a", "V1.n"),
        ];
        let (result, _) = solve(&elements, &connections);
        let v1 = ElementId::from("V1");
        let r1 = ElementId::from("R1");

        assert_relative_eq!(result.current(&v1).unwrap(), 3.0, max_relative = 1e-12);
        assert_relative_eq!(result.power(&v1).unwrap(), -36.0, max_relative = 1e-12);
        assert_relative_eq!(result.current(&r1).unwrap(), 3.0, max_relative = 1e-12);
        assert_relative_eq!(result.power(&r1).unwrap(), 36.0, max_relative = 1e-12);
    }

    #[test]
    fn test_current_source_into_resistor() {
        // 2 A pushed out of I1.p through 5 ohms back into I1.n.
        let elements = vec![
            Element::current_source("I1", 2.0, ["I1.n", "I1.p"]),
            Element::resistor("R1", 5.0, ["R1.a", "R1.b"]),
        ];
        let connections = vec![
            Connection::new("I1.p", "R1.b"),
            Connection::new("R1.a", "I1.n"),
        ];
        let (result, nodes) = solve(&elements, &connections);

        let top = result.terminal_voltage(&nodes, &"I1.p".into()).unwrap();
        assert_relative_eq!(top, 10.0, max_relative = 1e-12);
        assert_relative_eq!(result.current(&"R1".into()).unwrap(), 2.0, max_relative = 1e-12);
        assert_relative_eq!(result.power(&"I1".into()).unwrap(), -20.0, max_relative = 1e-12);
        assert_relative_eq!(result.power(&"R1".into()).unwrap(), 20.0, max_relative = 1e-12);
    }

    #[test]
    fn test_resistor_power_is_never_negative() {
        // Reversed resistor orientation gives a negative current but positive power.
        let elements = vec![
            Element::voltage_source("V1", 3.0, ["V1.n", "V1.p"]),
            Element::resistor("R1", 1.5, ["R1.a", "R1.b"]),
        ];
        let connections = vec![
            Connection::new("V1.p", "R1.a"),
            Connection::new("R1.b", "V1.n"),
        ];
        let (result, _) = solve(&elements, &connections);
        assert_relative_eq!(result.current(&"R1".into()).unwrap(), -2.0, max_relative = 1e-12);
        assert_relative_eq!(result.power(&"R1".into()).unwrap(), 6.0, max_relative = 1e-12);
    }

    #[test]
    fn test_empty_result() {
        let result = SolverResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.power_balance(), 0.0);
    }
}
