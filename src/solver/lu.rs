//! Symbolic and numeric sparse LU decomposition.
//!
//! The decomposition follows the Doolittle algorithm. The dense pseudo-code
//! for a matrix A with unit-lower L and upper U is:
//!
//! ```text
//! for i = 0..n
//!   for k = i..n                       // upper row i
//!     U[i][k] = A[i][k] − Σ_{j<i} L[i][j]·U[j][k]
//!   L[i][i] = 1
//!   for k = i+1..n                     // lower column i
//!     L[k][i] = (A[k][i] − Σ_{j<i} L[k][j]·U[j][i]) / U[i][i]
//! ```
//!
//! The symbolic phase runs this once over the pattern alone, recording the
//! fill-in and every index combination as a flat straight-line schedule.
//! The numeric phase replays the schedule per cell with no pattern lookups.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::Error;
use crate::matrix::{SparseMatrix, SparsityPattern, StoragePolicy};
use crate::Float;

/// One middle-loop entry of the upper (or lower) triangle.
///
/// `source` is the element id in A when A holds the slot, `None` for pure
/// fill-in. `products` is how many (L, U) pairs to consume from the shared
/// product list.
#[derive(Clone, Debug)]
struct EntryOp {
    dest: usize,
    source: Option<usize>,
    products: usize,
}

/// Symbolic LU factorization of one fixed sparsity pattern.
///
/// Built once at solver construction; immutable and shareable afterwards.
/// The input pattern must contain every diagonal slot — the solver
/// guarantees this by adding the full diagonal to the Jacobian pattern.
#[derive(Clone, Debug)]
pub struct LuDecomposition {
    /// Upper and lower middle-loop entry counts per pivot row.
    row_ops: Vec<(usize, usize)>,
    upper_ops: Vec<EntryOp>,
    lower_ops: Vec<EntryOp>,
    /// (L element id, U element id) pairs, consumed in schedule order.
    products: Vec<(usize, usize)>,
    u_diagonal_ids: Vec<usize>,
    l_diagonal_ids: Vec<usize>,
    l_pattern: Arc<SparsityPattern>,
    u_pattern: Arc<SparsityPattern>,
}

impl LuDecomposition {
    /// Run the symbolic factorization of `pattern`.
    pub fn new(pattern: &SparsityPattern) -> Self {
        let n = pattern.dimension();

        // Grow the L/U row patterns with fill-in. When pivot row i is
        // reached, L[i][j] for j < i and all of U's rows j < i are final,
        // so a single forward pass suffices.
        let mut l_rows: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut u_rows: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        for (i, row) in l_rows.iter_mut().enumerate() {
            row.insert(i);
        }
        for i in 0..n {
            for &k in pattern.row_columns(i) {
                if k >= i {
                    u_rows[i].insert(k);
                }
            }
            let l_row_i: Vec<usize> =
                l_rows[i].iter().copied().filter(|&j| j < i).collect();
            for &j in &l_row_i {
                let fill: Vec<usize> =
                    u_rows[j].iter().copied().filter(|&k| k >= i).collect();
                for k in fill {
                    u_rows[i].insert(k);
                }
            }
            for k in (i + 1)..n {
                let exists = pattern.contains(k, i)
                    || l_rows[k]
                        .iter()
                        .any(|&j| j < i && u_rows[j].contains(&i));
                if exists {
                    l_rows[k].insert(i);
                }
            }
        }

        let l_pattern = Arc::new(SparsityPattern::from_entries(
            n,
            l_rows
                .iter()
                .enumerate()
                .flat_map(|(row, cols)| cols.iter().map(move |&col| (row, col))),
        ));
        let u_pattern = Arc::new(SparsityPattern::from_entries(
            n,
            u_rows
                .iter()
                .enumerate()
                .flat_map(|(row, cols)| cols.iter().map(move |&col| (row, col))),
        ));

        // Record the straight-line schedule over the final patterns.
        let mut row_ops = Vec::with_capacity(n);
        let mut upper_ops = Vec::new();
        let mut lower_ops = Vec::new();
        let mut products = Vec::new();
        let mut u_diagonal_ids = Vec::with_capacity(n);
        let mut l_diagonal_ids = Vec::with_capacity(n);
        for i in 0..n {
            let mut n_upper = 0;
            for &k in u_rows[i].iter() {
                let mut n_products = 0;
                for &j in l_rows[i].iter().filter(|&&j| j < i) {
                    if let Some(u_id) = u_pattern.entry(j, k) {
                        let l_id = l_pattern.entry(i, j).expect("L slot recorded above");
                        products.push((l_id, u_id));
                        n_products += 1;
                    }
                }
                upper_ops.push(EntryOp {
                    dest: u_pattern.entry(i, k).expect("U slot recorded above"),
                    source: pattern.entry(i, k),
                    products: n_products,
                });
                n_upper += 1;
            }
            u_diagonal_ids.push(
                u_pattern
                    .entry(i, i)
                    .unwrap_or_else(|| panic!("pattern has no diagonal slot in row {i}")),
            );
            l_diagonal_ids.push(l_pattern.entry(i, i).expect("L diagonal recorded above"));

            let mut n_lower = 0;
            for k in (i + 1)..n {
                if !l_rows[k].contains(&i) {
                    continue;
                }
                let mut n_products = 0;
                for &j in l_rows[k].iter().filter(|&&j| j < i) {
                    if let Some(u_id) = u_pattern.entry(j, i) {
                        let l_id = l_pattern.entry(k, j).expect("L slot recorded above");
                        products.push((l_id, u_id));
                        n_products += 1;
                    }
                }
                lower_ops.push(EntryOp {
                    dest: l_pattern.entry(k, i).expect("L slot recorded above"),
                    source: pattern.entry(k, i),
                    products: n_products,
                });
                n_lower += 1;
            }
            row_ops.push((n_upper, n_lower));
        }

        Self {
            row_ops,
            upper_ops,
            lower_ops,
            products,
            u_diagonal_ids,
            l_diagonal_ids,
            l_pattern,
            u_pattern,
        }
    }

    /// Sparsity of the unit-lower factor, fill-in included.
    pub fn l_pattern(&self) -> Arc<SparsityPattern> {
        Arc::clone(&self.l_pattern)
    }

    /// Sparsity of the upper factor, fill-in included.
    pub fn u_pattern(&self) -> Arc<SparsityPattern> {
        Arc::clone(&self.u_pattern)
    }

    /// Numeric factorization of `a` into `l` and `u`, per cell.
    ///
    /// `l` and `u` must have been created over [`Self::l_pattern`] and
    /// [`Self::u_pattern`] with the same cell count as `a`. Fails with
    /// [`Error::SingularMatrix`] when any cell's pivot magnitude drops
    /// below `pivot_threshold`.
    pub fn decompose<P: StoragePolicy>(
        &self,
        a: &SparseMatrix<P>,
        l: &mut SparseMatrix<P>,
        u: &mut SparseMatrix<P>,
        pivot_threshold: Float,
    ) -> Result<(), Error> {
        let cells = a.number_of_cells();
        let a_nnz = a.number_of_non_zeros();
        let l_nnz = l.number_of_non_zeros();
        let u_nnz = u.number_of_non_zeros();
        debug_assert_eq!(l.number_of_cells(), cells);
        debug_assert_eq!(u.number_of_cells(), cells);

        for cell in 0..cells {
            let mut upper_cursor = 0;
            let mut lower_cursor = 0;
            let mut product_cursor = 0;
            for (i, &(n_upper, n_lower)) in self.row_ops.iter().enumerate() {
                for _ in 0..n_upper {
                    let op = &self.upper_ops[upper_cursor];
                    upper_cursor += 1;
                    let mut value = op
                        .source
                        .map_or(0.0, |s| a.as_flat_slice()[P::flat_offset(a_nnz, cell, s)]);
                    for _ in 0..op.products {
                        let (l_id, u_id) = self.products[product_cursor];
                        product_cursor += 1;
                        value -= l.as_flat_slice()[P::flat_offset(l_nnz, cell, l_id)]
                            * u.as_flat_slice()[P::flat_offset(u_nnz, cell, u_id)];
                    }
                    u.as_flat_slice_mut()[P::flat_offset(u_nnz, cell, op.dest)] = value;
                }

                l.as_flat_slice_mut()
                    [P::flat_offset(l_nnz, cell, self.l_diagonal_ids[i])] = 1.0;
                let pivot =
                    u.as_flat_slice()[P::flat_offset(u_nnz, cell, self.u_diagonal_ids[i])];
                if pivot.abs() < pivot_threshold {
                    return Err(Error::SingularMatrix { row: i });
                }

                for _ in 0..n_lower {
                    let op = &self.lower_ops[lower_cursor];
                    lower_cursor += 1;
                    let mut value = op
                        .source
                        .map_or(0.0, |s| a.as_flat_slice()[P::flat_offset(a_nnz, cell, s)]);
                    for _ in 0..op.products {
                        let (l_id, u_id) = self.products[product_cursor];
                        product_cursor += 1;
                        value -= l.as_flat_slice()[P::flat_offset(l_nnz, cell, l_id)]
                            * u.as_flat_slice()[P::flat_offset(u_nnz, cell, u_id)];
                    }
                    l.as_flat_slice_mut()[P::flat_offset(l_nnz, cell, op.dest)] =
                        value / pivot;
                }
            }
        }
        Ok(())
    }
}
