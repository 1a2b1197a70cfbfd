//! Topology extraction: grouping wired terminals into electrical nodes.

use std::collections::HashMap;

use tracing::debug;

use super::element::{Connection, Element};
use super::types::TerminalId;

/// Disjoint-set forest over densely numbered terminals.
///
/// `find` is iterative with path halving, so deep chains of wires never
/// touch the call stack.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    /// Create `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Representative of the set containing `x`.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets containing `a` and `b`. Returns false if already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let mut ra = self.find(a);
        let mut rb = self.find(b);
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] || (self.size[ra] == self.size[rb] && rb < ra) {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }
}

/// Terminals of a snapshot, numbered in creation order (element order,
/// then slot order).
#[derive(Debug, Clone, Default)]
pub struct TerminalIndex {
    ids: Vec<TerminalId>,
    index: HashMap<TerminalId, usize>,
}

impl TerminalIndex {
    pub fn from_elements(elements: &[Element]) -> Self {
        let mut terminals = Self::default();
        for element in elements {
            for terminal in element.terminals() {
                if !terminals.index.contains_key(terminal) {
                    terminals.index.insert(terminal.clone(), terminals.ids.len());
                    terminals.ids.push(terminal.clone());
                }
            }
        }
        terminals
    }

    pub fn get(&self, terminal: &TerminalId) -> Option<usize> {
        self.index.get(terminal).copied()
    }

    pub fn id(&self, index: usize) -> &TerminalId {
        &self.ids[index]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Equivalence classes of terminals.
#[derive(Debug, Clone)]
pub struct Topology {
    /// Dense terminal numbering
    pub terminals: TerminalIndex,
    /// Groups of terminal indices, ordered by their first terminal.
    /// Each group lists its terminals in creation order.
    pub groups: Vec<Vec<usize>>,
}

impl Topology {
    /// Terminal ids of group `i`.
    pub fn group_terminals(&self, i: usize) -> impl Iterator<Item = &TerminalId> + '_ {
        self.groups[i].iter().map(move |&t| self.terminals.id(t))
    }
}

/// Group terminals into electrical nodes.
///
/// Connections with a missing endpoint, or an endpoint that names no element
/// terminal, are skipped.
pub fn extract_topology(elements: &[Element], connections: &[Connection]) -> Topology {
    let terminals = TerminalIndex::from_elements(elements);
    let mut sets = UnionFind::new(terminals.len());

    let mut joined = 0usize;
    for connection in connections {
        let Some((a, b)) = connection.endpoints() else {
            continue;
        };
        if let (Some(ia), Some(ib)) = (terminals.get(a), terminals.get(b)) {
            sets.union(ia, ib);
            joined += 1;
        }
    }

    let mut root_to_group: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for t in 0..terminals.len() {
        let root = sets.find(t);
        let group = *root_to_group.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(t);
    }

    debug!(
        terminals = terminals.len(),
        connections = joined,
        groups = groups.len(),
        "extracted topology"
    );

    Topology { terminals, groups }
}
