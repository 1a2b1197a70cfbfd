//! MNA matrix assembly and solving.

use tracing::debug;

use crate::circuit::{BranchId, Element, ElementKind, NodeMap, TerminalId};
use crate::error::{NodalError, Result};

/// MNA matrix system Ax = z.
#[derive(Debug, Clone)]
pub struct MnaMatrix {
    /// System matrix A (row-major)
    pub a: Vec<f64>,
    /// Source vector z
    pub z: Vec<f64>,
    /// Solution vector x
    pub x: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
    /// LU decomposition of A
    pub lu: Vec<f64>,
    /// Pivot indices for LU decomposition
    pub pivots: Vec<usize>,
}

impl MnaMatrix {
    /// Create a zeroed system of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            x: vec![0.0; size],
            size,
            lu: vec![0.0; size * size],
            pivots: vec![0; size],
        }
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.a[row * self.size + col]
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] += value;
    }

    /// Add to source vector element.
    pub fn add_source(&mut self, row: usize, value: f64) {
        self.z[row] += value;
    }

    /// Stamp a conductance between two nodes.
    /// For a conductance G between nodes n1 and n2:
    ///   A[n1,n1] += G
    ///   A[n2,n2] += G
    ///   A[n1,n2] -= G
    ///   A[n2,n1] -= G
    pub fn stamp_conductance(&mut self, n1: Option<usize>, n2: Option<usize>, g: f64) {
        if let Some(i) = n1 {
            self.add(i, i, g);
        }
        if let Some(j) = n2 {
            self.add(j, j, g);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -g);
            self.add(j, i, -g);
        }
    }

    /// Stamp a current source that pushes `current` into `n_into` and draws
    /// it out of `n_from`.
    pub fn stamp_current_source(&mut self, n_into: Option<usize>, n_from: Option<usize>, current: f64) {
        if let Some(i) = n_into {
            self.add_source(i, current);
        }
        if let Some(j) = n_from {
            self.add_source(j, -current);
        }
    }

    /// Stamp a voltage source between two nodes with branch current at index br.
    /// V[n+] - V[n-] = E
    pub fn stamp_voltage_source(
        &mut self,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        br: usize,
        voltage: f64,
    ) {
        self.stamp_branch(n_pos, n_neg, br);
        self.z[br] = voltage;
    }

    /// Stamp a VCVS (Voltage-Controlled Voltage Source).
    /// V[out+] - V[out-] - A * (V[ctrl+] - V[ctrl-]) = 0
    pub fn stamp_vcvs(
        &mut self,
        n_out_pos: Option<usize>,
        n_out_neg: Option<usize>,
        n_ctrl_pos: Option<usize>,
        n_ctrl_neg: Option<usize>,
        br: usize,
        gain: f64,
    ) {
        self.stamp_branch(n_out_pos, n_out_neg, br);

        if let Some(i) = n_ctrl_pos {
            self.add(br, i, -gain);
        }
        if let Some(j) = n_ctrl_neg {
            self.add(br, j, gain);
        }
        self.z[br] = 0.0;
    }

    /// B and C blocks shared by every voltage-type source.
    fn stamp_branch(&mut self, n_pos: Option<usize>, n_neg: Option<usize>, br: usize) {
        if let Some(i) = n_pos {
            self.add(i, br, 1.0);
            self.add(br, i, 1.0);
        }
        if let Some(j) = n_neg {
            self.add(j, br, -1.0);
            self.add(br, j, -1.0);
        }
    }

    /// Add a tiny conductance to ground on the first `node_count` diagonals,
    /// so a node with no DC path to ground still has a nonzero pivot.
    pub fn stamp_leakage(&mut self, node_count: usize, g: f64) {
        for i in 0..node_count {
            self.add(i, i, g);
        }
    }

    /// Perform LU decomposition with partial pivoting.
    ///
    /// Fails with [`NodalError::SingularMatrix`] when
    /// - the largest candidate pivot of a column is below
    ///   `max(tolerance, n * eps * max|A|)`, or
    /// - elimination leaves a row at rounding level relative to its original
    ///   magnitude, i.e. the row is a combination of rows already pivoted.
    ///   This catches dependent constraint rows (a VCVS loop with unit loop
    ///   gain) whose rounding residue would otherwise be scaled up into a
    ///   plausible pivot by a leakage-only node row.
    ///
    /// Non-finite entries are left to propagate so the result can be
    /// flagged downstream instead of reported as singular.
    pub fn factor(&mut self, tolerance: f64) -> Result<()> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);

        let eps = n as f64 * f64::EPSILON;
        let threshold = tolerance.max(eps * finite_max(&self.a));
        let mut row_scale: Vec<f64> = (0..n)
            .map(|i| finite_max(&self.a[i * n..(i + 1) * n]))
            .collect();

        for i in 0..n {
            self.pivots[i] = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val < threshold {
                debug!(column = k, pivot = max_val, threshold, "pivot below tolerance");
                return Err(NodalError::SingularMatrix);
            }

            if max_row != k {
                self.pivots.swap(k, max_row);
                row_scale.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }

                let rest = &self.lu[i * n + k + 1..(i + 1) * n];
                if rest.iter().all(|v| v.is_finite()) && finite_max(rest) <= eps * row_scale[i] {
                    debug!(column = k, row = i, "row eliminated to rounding level");
                    return Err(NodalError::SingularMatrix);
                }
            }
        }

        Ok(())
    }

    /// Solve the system using the pre-computed LU decomposition.
    pub fn solve(&mut self) {
        let n = self.size;

        // Apply pivot permutation to z
        for i in 0..n {
            self.x[i] = self.z[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                self.x[i] -= self.lu[i * n + j] * self.x[j];
            }
            self.x[i] /= self.lu[i * n + i];
        }
    }
}

/// Largest finite magnitude in a slice, 0 if there is none.
fn finite_max(values: &[f64]) -> f64 {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0f64, |m, v| m.max(v.abs()))
}

/// An assembled MNA system together with the bookkeeping needed to read
/// branch currents back out of the solution.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    pub matrix: MnaMatrix,
    /// Non-ground node count `n`
    pub node_count: usize,
    /// Branch of each element, `None` for elements without a branch unknown
    pub branches: Vec<Option<BranchId>>,
}

impl MnaSystem {
    /// Get the matrix index for a branch current.
    pub fn branch_index(&self, branch: BranchId) -> usize {
        self.node_count + branch.0
    }
}

/// Stamp every element into a fresh `(n + m)` system.
///
/// Branches are numbered in element order over voltage sources and VCVSs.
pub fn assemble(elements: &[Element], nodes: &NodeMap, leakage: f64) -> MnaSystem {
    let node_count = nodes.node_count();
    let branch_count = elements.iter().filter(|e| e.is_voltage_type()).count();

    let mut matrix = MnaMatrix::new(node_count + branch_count);
    let mut branches = Vec::with_capacity(elements.len());
    let index = |t: &TerminalId| nodes.node_of(t).matrix_index();

    let mut next_branch = 0usize;

    for element in elements {
        let branch = if element.is_voltage_type() {
            next_branch += 1;
            Some(BranchId(next_branch - 1))
        } else {
            None
        };
        branches.push(branch);
        let row = branch.map(|br| node_count + br.0);

        match (&element.kind, row) {
            (ElementKind::Resistor { resistance, port }, _) => {
                matrix.stamp_conductance(index(&port.positive), index(&port.negative), 1.0 / resistance);
            }

            (ElementKind::CurrentSource { current, port }, _) => {
                matrix.stamp_current_source(index(&port.positive), index(&port.negative), *current);
            }

            (ElementKind::VoltageSource { voltage, port }, Some(br)) => {
                matrix.stamp_voltage_source(index(&port.positive), index(&port.negative), br, *voltage);
            }

            (ElementKind::Vcvs { gain, output, input }, Some(br)) => {
                matrix.stamp_vcvs(
                    index(&output.positive),
                    index(&output.negative),
                    index(&input.positive),
                    index(&input.negative),
                    br,
                    *gain,
                );
            }

            // is_voltage_type() always yields a branch for these kinds
            (ElementKind::VoltageSource { .. } | ElementKind::Vcvs { .. }, None) => {}
        }
    }

    matrix.stamp_leakage(node_count, leakage);

    debug!(
        nodes = node_count,
        branches = branch_count,
        size = matrix.size,
        "assembled MNA system"
    );

    MnaSystem {
        matrix,
        node_count,
        branches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Connection;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lu_solves_small_system() {
        // [2 1] [x0]   [3]
        // [1 3] [x1] = [5]
        let mut m = MnaMatrix::new(2);
        m.add(0, 0, 2.0);
        m.add(0, 1, 1.0);
        m.add(1, 0, 1.0);
        m.add(1, 1, 3.0);
        m.z = vec![3.0, 5.0];
        m.factor(1e-15).unwrap();
        m.solve();
        assert_abs_diff_eq!(m.x[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(m.x[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_lu_needs_pivoting() {
        // Zero on the leading diagonal, as every voltage source row has.
        let mut m = MnaMatrix::new(2);
        m.add(0, 1, 1.0);
        m.add(1, 0, 1.0);
        m.z = vec![4.0, 7.0];
        m.factor(1e-15).unwrap();
        m.solve();
        assert_abs_diff_eq!(m.x[0], 7.0);
        assert_abs_diff_eq!(m.x[1], 4.0);
    }

    #[test]
    fn test_singular_matrix_detected() {
        let mut m = MnaMatrix::new(2);
        m.add(0, 0, 1.0);
        m.add(0, 1, 2.0);
        m.add(1, 0, 2.0);
        m.add(1, 1, 4.0);
        assert!(matches!(m.factor(1e-15), Err(NodalError::SingularMatrix)));
    }

    #[test]
    fn test_dependent_row_left_as_rounding_is_singular() {
        // Second row is the first scaled by -1/49, which does not cancel
        // exactly in floating point.
        let k = 49.0;
        let mut m = MnaMatrix::new(2);
        m.add(0, 0, 1.0);
        m.add(0, 1, -k);
        m.add(1, 0, -1.0 / k);
        m.add(1, 1, 1.0);
        assert!(matches!(m.factor(1e-15), Err(NodalError::SingularMatrix)));
    }

    #[test]
    fn test_small_pivot_relative_to_matrix_is_singular() {
        // Above the absolute tolerance, but far below rounding of the big entries.
        let mut m = MnaMatrix::new(2);
        m.add(0, 0, 1e6);
        m.add(1, 1, 1e-12);
        assert!(matches!(m.factor(1e-15), Err(NodalError::SingularMatrix)));
    }

    #[test]
    fn test_non_finite_entries_propagate() {
        // A zero-ohm resistor between nodes 0 and 1, driven by a source on node 0.
        let mut m = MnaMatrix::new(3);
        m.stamp_conductance(Some(0), Some(1), f64::INFINITY);
        m.stamp_voltage_source(Some(0), None, 2, 5.0);
        m.factor(1e-15).unwrap();
        m.solve();
        assert!(m.x.iter().any(|v| !v.is_finite()));
    }

    #[test]
    fn test_assemble_voltage_source_and_resistor() {
        let elements = vec![
            Element::voltage_source("V1", 5.0, ["V1.n", "V1.p"]),
            Element::resistor("R1", 100.0, ["R1.a", "R1.b"]),
        ];
        let connections = vec![
            Connection::new("V1.p", "R1.b"),
            Connection::new("R1.a", "V1.n"),
        ];
        let nodes = NodeMap::build(&elements, &connections);
        let system = assemble(&elements, &nodes, 0.0);

        assert_eq!(system.node_count, 1);
        assert_eq!(system.matrix.size, 2);
        assert_eq!(system.branches, vec![Some(BranchId(0)), None]);

        let m = &system.matrix;
        assert_abs_diff_eq!(m.get(0, 0), 0.01);
        assert_abs_diff_eq!(m.get(0, 1), 1.0);
        assert_abs_diff_eq!(m.get(1, 0), 1.0);
        assert_abs_diff_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.z, vec![0.0, 5.0]);
    }

    #[test]
    fn test_assemble_vcvs_constraint_row() {
        // Every terminal unwired: V1.n (first created) becomes ground.
        let elements = vec![
            Element::voltage_source("V1", 1.0, ["V1.n", "V1.p"]),
            Element::vcvs("E1", 3.0, ["op", "on", "ip", "in"]),
        ];
        let nodes = NodeMap::build(&elements, &[]);
        let system = assemble(&elements, &nodes, 0.0);

        assert_eq!(system.node_count, 5);
        let row = system.branch_index(BranchId(1));
        let m = &system.matrix;
        let col = |t: &str| nodes.node_of(&t.into()).matrix_index().unwrap();
        assert_abs_diff_eq!(m.get(row, col("op")), 1.0);
        assert_abs_diff_eq!(m.get(row, col("on")), -1.0);
        assert_abs_diff_eq!(m.get(row, col("ip")), -3.0);
        assert_abs_diff_eq!(m.get(row, col("in")), 3.0);
        assert_abs_diff_eq!(m.get(col("op"), row), 1.0);
        assert_abs_diff_eq!(m.get(col("on"), row), -1.0);
        assert_abs_diff_eq!(m.z[row], 0.0);
    }

    #[test]
    fn test_current_source_injects_into_positive_node() {
        let elements = vec![Element::current_source("I1", 2.0, ["I1.n", "I1.p"])];
        let nodes = NodeMap::build(&elements, &[]);
        let system = assemble(&elements, &nodes, 0.0);
        // I1.n is ground, I1.p is node 1.
        assert_eq!(system.matrix.z, vec![2.0]);
    }

    #[test]
    fn test_leakage_only_on_node_block() {
        let elements = vec![Element::voltage_source("V1", 1.0, ["V1.n", "V1.p"])];
        let nodes = NodeMap::build(&elements, &[]);
        let system = assemble(&elements, &nodes, 1e-12);
        assert_abs_diff_eq!(system.matrix.get(0, 0), 1e-12);
        assert_abs_diff_eq!(system.matrix.get(1, 1), 0.0);
    }
}
