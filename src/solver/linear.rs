//! Sparse linear solver over a fixed topology, and the diagonal-Markowitz
//! preordering that shrinks its fill-in.
//!
//! Solving L·(U·x) = b splits into a forward sweep L·y = b and a backward
//! sweep U·x = y. Both sweeps run off flat schedules of (element id,
//! column) pairs recorded at construction, so the per-cell inner loops do
//! no pattern lookups.

use std::sync::Arc;

use crate::error::Error;
use crate::matrix::{DenseMatrix, SparseMatrix, SparsityPattern, StoragePolicy};
use crate::solver::lu::LuDecomposition;
use crate::Float;

/// Linear solver for one Jacobian sparsity structure.
///
/// Owns the symbolic decomposition and the L/U value matrices; `factor`
/// refreshes the values from a stage matrix, `solve` runs the two
/// triangular sweeps for every cell independently.
#[derive(Clone, Debug)]
pub struct LinearSolver<P: StoragePolicy = crate::matrix::BlockOrdering> {
    lu: LuDecomposition,
    lower: SparseMatrix<P>,
    upper: SparseMatrix<P>,
    /// Off-diagonal term count and diagonal element id per row of L.
    l_rows: Vec<(usize, usize)>,
    /// (L element id, column) pairs for the forward sweep.
    l_terms: Vec<(usize, usize)>,
    /// Off-diagonal term count and diagonal element id per row of U, in
    /// bottom-up sweep order.
    u_rows: Vec<(usize, usize)>,
    /// (U element id, column) pairs for the backward sweep.
    u_terms: Vec<(usize, usize)>,
}

impl<P: StoragePolicy> LinearSolver<P> {
    /// Build the solver for `pattern` over `cells` cells.
    pub fn new(pattern: &SparsityPattern, cells: usize) -> Self {
        let lu = LuDecomposition::new(pattern);
        let l_pattern = lu.l_pattern();
        let u_pattern = lu.u_pattern();
        let n = pattern.dimension();

        let mut l_rows = Vec::with_capacity(n);
        let mut l_terms = Vec::new();
        for row in 0..n {
            let mut count = 0;
            for &col in l_pattern.row_columns(row) {
                if col < row {
                    l_terms.push((l_pattern.entry(row, col).expect("recorded slot"), col));
                    count += 1;
                }
            }
            l_rows.push((count, l_pattern.entry(row, row).expect("unit diagonal")));
        }

        let mut u_rows = Vec::with_capacity(n);
        let mut u_terms = Vec::new();
        for row in (0..n).rev() {
            let mut count = 0;
            for &col in u_pattern.row_columns(row) {
                if col > row {
                    u_terms.push((u_pattern.entry(row, col).expect("recorded slot"), col));
                    count += 1;
                }
            }
            u_rows.push((
                count,
                u_pattern
                    .entry(row, row)
                    .unwrap_or_else(|| panic!("pattern has no diagonal slot in row {row}")),
            ));
        }

        let lower = SparseMatrix::zeros(Arc::clone(&l_pattern), cells);
        let upper = SparseMatrix::zeros(Arc::clone(&u_pattern), cells);
        Self {
            lu,
            lower,
            upper,
            l_rows,
            l_terms,
            u_rows,
            u_terms,
        }
    }

    /// Refresh the L/U values from `matrix`.
    pub fn factor(&mut self, matrix: &SparseMatrix<P>, pivot_threshold: Float) -> Result<(), Error> {
        self.lu
            .decompose(matrix, &mut self.lower, &mut self.upper, pivot_threshold)
    }

    /// Solve L·(U·x) = b for every cell using the current factors.
    pub fn solve(&self, b: &DenseMatrix, x: &mut DenseMatrix) {
        debug_assert_eq!(b.rows(), x.rows());
        debug_assert_eq!(b.cols(), x.cols());
        let n = b.cols();
        let l_nnz = self.lower.number_of_non_zeros();
        let u_nnz = self.upper.number_of_non_zeros();
        let l_values = self.lower.as_flat_slice();
        let u_values = self.upper.as_flat_slice();

        for cell in 0..b.rows() {
            let b_row = b.row(cell);
            // Forward: L·y = b, y stored into x.
            let mut term_cursor = 0;
            for (row, &(count, diagonal)) in self.l_rows.iter().enumerate() {
                let mut sum = b_row[row];
                for _ in 0..count {
                    let (element, col) = self.l_terms[term_cursor];
                    term_cursor += 1;
                    sum -= l_values[P::flat_offset(l_nnz, cell, element)] * x[(cell, col)];
                }
                x[(cell, row)] = sum / l_values[P::flat_offset(l_nnz, cell, diagonal)];
            }
            // Backward: U·x = y, in place.
            let mut term_cursor = 0;
            for (sweep, &(count, diagonal)) in self.u_rows.iter().enumerate() {
                let row = n - 1 - sweep;
                let mut sum = x[(cell, row)];
                for _ in 0..count {
                    let (element, col) = self.u_terms[term_cursor];
                    term_cursor += 1;
                    sum -= u_values[P::flat_offset(u_nnz, cell, element)] * x[(cell, col)];
                }
                x[(cell, row)] = sum / u_values[P::flat_offset(u_nnz, cell, diagonal)];
            }
        }
    }

    /// The unit-lower factor from the latest `factor` call.
    pub fn lower(&self) -> &SparseMatrix<P> {
        &self.lower
    }

    /// The upper factor from the latest `factor` call.
    pub fn upper(&self) -> &SparseMatrix<P> {
        &self.upper
    }
}

/// Reorder the rows/columns of `pattern` with the diagonal Markowitz rule.
///
/// Repeatedly selects the remaining diagonal whose Markowitz cost
/// (nrow − 1)·(ncol − 1) is minimal, ties broken by lowest original index,
/// then simulates the elimination fill before the next selection. Returns
/// the permutation as `reordered[i] = original[perm[i]]`.
pub fn diagonal_markowitz_reorder(pattern: &SparsityPattern) -> Vec<usize> {
    let n = pattern.dimension();
    let mut filled = vec![false; n * n];
    for row in 0..n {
        for &col in pattern.row_columns(row) {
            filled[row * n + col] = true;
        }
        // Diagonal entries always pivot, present or not.
        filled[row * n + row] = true;
    }

    let mut removed = vec![false; n];
    let mut perm = Vec::with_capacity(n);
    for _ in 0..n {
        let mut best = usize::MAX;
        let mut best_cost = usize::MAX;
        for candidate in 0..n {
            if removed[candidate] {
                continue;
            }
            let row_count = (0..n)
                .filter(|&col| !removed[col] && filled[candidate * n + col])
                .count();
            let col_count = (0..n)
                .filter(|&row| !removed[row] && filled[row * n + candidate])
                .count();
            let cost = (row_count - 1) * (col_count - 1);
            if cost < best_cost {
                best_cost = cost;
                best = candidate;
            }
        }
        removed[best] = true;
        perm.push(best);
        for row in 0..n {
            if removed[row] || !filled[row * n + best] {
                continue;
            }
            for col in 0..n {
                if !removed[col] && filled[best * n + col] {
                    filled[row * n + col] = true;
                }
            }
        }
    }
    perm
}
