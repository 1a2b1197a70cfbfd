//! Schematic snapshot model, topology extraction and validation.
//!
//! This module turns the editor's elements and wires into electrical nodes.
//! The [`NodeMap`] it produces is the only view of connectivity the solver
//! uses.

mod element;
mod graph;
mod topology;
mod types;
mod validate;

pub use element::{Connection, Element, ElementDef, ElementKind, ElementType, Port, Schematic};
pub use graph::NodeMap;
pub use topology::{extract_topology, TerminalIndex, Topology, UnionFind};
pub use types::*;
pub use validate::{validate_schematic, Diagnostic};
