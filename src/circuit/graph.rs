//! Node numbering and ground assignment.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::element::{Connection, Element};
use super::topology::{extract_topology, Topology};
use super::types::{NodeId, TerminalId};

/// Terminal to electrical node lookup for one snapshot.
///
/// The largest terminal group becomes ground. Equal-size groups keep
/// creation order, so the group holding the earliest-created terminal wins.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeMap {
    /// Terminals of each node, indexed by node id
    nodes: Vec<Vec<TerminalId>>,
    #[serde(skip)]
    lookup: HashMap<TerminalId, NodeId>,
}

impl NodeMap {
    /// Extract the topology of a snapshot and number its nodes.
    pub fn build(elements: &[Element], connections: &[Connection]) -> Self {
        Self::from_topology(&extract_topology(elements, connections))
    }

    /// Number the groups of an extracted topology.
    pub fn from_topology(topology: &Topology) -> Self {
        let mut order: Vec<usize> = (0..topology.groups.len()).collect();
        // Stable: ties stay in first-terminal order.
        order.sort_by(|&a, &b| topology.groups[b].len().cmp(&topology.groups[a].len()));

        let mut nodes = Vec::with_capacity(order.len());
        let mut lookup = HashMap::with_capacity(topology.terminals.len());
        for (id, &group) in order.iter().enumerate() {
            let members: Vec<TerminalId> = topology.group_terminals(group).cloned().collect();
            for terminal in &members {
                lookup.insert(terminal.clone(), NodeId(id));
            }
            nodes.push(members);
        }

        let map = Self { nodes, lookup };
        debug!(
            nodes = map.node_count(),
            ground_terminals = map.terminals_of(NodeId::GROUND).len(),
            "numbered nodes"
        );
        map
    }

    /// Node of a terminal, if the terminal belongs to the snapshot.
    pub fn resolve(&self, terminal: &TerminalId) -> Option<NodeId> {
        self.lookup.get(terminal).copied()
    }

    /// Node of a terminal. A terminal unknown to the snapshot resolves to
    /// ground instead of failing; `validate_schematic` reports such references.
    pub fn node_of(&self, terminal: &TerminalId) -> NodeId {
        self.resolve(terminal).unwrap_or(NodeId::GROUND)
    }

    /// Number of non-ground nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Total number of nodes including ground.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Terminals belonging to a node, in creation order.
    pub fn terminals_of(&self, node: NodeId) -> &[TerminalId] {
        self.nodes.get(node.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All node ids, ground first.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }
}
