//! Sparse topology and the batched sparse matrix.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use crate::Float;

/// Immutable non-zero structure of a square sparse matrix.
///
/// Stored as the usual compressed-row triple minus the values: `row_starts`
/// has one entry per row plus a terminator, `col_indices` holds the sorted
/// column indices of each row. The position of a column index inside
/// `col_indices` is the *element id* of that non-zero; batched containers
/// and the LU schedules address values exclusively through element ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparsityPattern {
    dimension: usize,
    row_starts: Vec<usize>,
    col_indices: Vec<usize>,
}

impl SparsityPattern {
    /// Build a pattern from an arbitrary set of (row, col) coordinates.
    ///
    /// Duplicates are merged; entries are sorted row-major. Coordinates
    /// outside the square dimension panic: the topology is fixed by the
    /// mechanism, so an out-of-range entry is a construction bug.
    pub fn from_entries(
        dimension: usize,
        entries: impl IntoIterator<Item = (usize, usize)>,
    ) -> Self {
        let mut coords: Vec<(usize, usize)> = entries.into_iter().collect();
        for &(row, col) in &coords {
            assert!(
                row < dimension && col < dimension,
                "non-zero ({row}, {col}) outside a {dimension}x{dimension} pattern"
            );
        }
        coords.sort_unstable();
        coords.dedup();

        let mut row_starts = Vec::with_capacity(dimension + 1);
        let mut col_indices = Vec::with_capacity(coords.len());
        row_starts.push(0);
        let mut cursor = 0;
        for row in 0..dimension {
            while cursor < coords.len() && coords[cursor].0 == row {
                col_indices.push(coords[cursor].1);
                cursor += 1;
            }
            row_starts.push(col_indices.len());
        }
        Self {
            dimension,
            row_starts,
            col_indices,
        }
    }

    /// Side length of the square pattern.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of structural non-zeros.
    pub fn number_of_non_zeros(&self) -> usize {
        self.col_indices.len()
    }

    /// Flat element id of (row, col), or `None` when the slot is
    /// structurally absent.
    pub fn entry(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_starts[row];
        let end = self.row_starts[row + 1];
        self.col_indices[start..end]
            .binary_search(&col)
            .ok()
            .map(|pos| start + pos)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.entry(row, col).is_some()
    }

    /// Column indices of one row, sorted ascending.
    pub fn row_columns(&self, row: usize) -> &[usize] {
        &self.col_indices[self.row_starts[row]..self.row_starts[row + 1]]
    }

    /// Element ids of the diagonal slots that exist, row by row.
    pub fn diagonal_ids(&self) -> Vec<usize> {
        (0..self.dimension)
            .filter_map(|row| self.entry(row, row))
            .collect()
    }
}

/// Value layout of a batched sparse matrix.
///
/// The policy maps a (cell, element id) pair to an offset in the flat
/// value vector. Two layouts are provided; all numeric kernels are
/// generic over the policy so neither requires its own implementation.
pub trait StoragePolicy: Copy + Clone + Default + 'static {
    /// Number of cells stored contiguously per element (1 for the block
    /// layout, the group length for the interleaved layout).
    fn group_vector_size() -> usize;

    /// Cell count rounded up to a whole number of groups.
    fn padded_cells(cells: usize) -> usize {
        let group = Self::group_vector_size();
        cells.div_ceil(group) * group
    }

    /// Offset of (cell, element) in the flat value vector of a matrix
    /// with `non_zeros` structural non-zeros.
    fn flat_offset(non_zeros: usize, cell: usize, element: usize) -> usize;
}

/// All non-zeros of one cell stored contiguously: offset = cell·nnz + elem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockOrdering;

impl StoragePolicy for BlockOrdering {
    fn group_vector_size() -> usize {
        1
    }

    fn flat_offset(non_zeros: usize, cell: usize, element: usize) -> usize {
        cell * non_zeros + element
    }
}

/// Cells interleaved in groups of `L`: within a group, the `L` values of
/// one element are contiguous, so per-element loops over cells vectorize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InterleavedOrdering<const L: usize>;

impl<const L: usize> StoragePolicy for InterleavedOrdering<L> {
    fn group_vector_size() -> usize {
        L
    }

    fn flat_offset(non_zeros: usize, cell: usize, element: usize) -> usize {
        (cell / L) * non_zeros * L + element * L + cell % L
    }
}

/// Batched sparse matrix: one immutable pattern, one value set per cell.
///
/// The pattern is shared (`Arc`) between the Jacobian, the LU factors and
/// the solver's schedules; only `values` ever mutates. Reading or writing
/// a structurally absent slot through the indexing operators panics — an
/// off-pattern access is a topology bug, not a runtime condition.
#[derive(Clone, Debug)]
pub struct SparseMatrix<P: StoragePolicy = BlockOrdering> {
    pattern: Arc<SparsityPattern>,
    cells: usize,
    values: Vec<Float>,
    ordering: PhantomData<P>,
}

impl<P: StoragePolicy> SparseMatrix<P> {
    /// A zero-valued matrix over `pattern` for `cells` cells.
    pub fn zeros(pattern: Arc<SparsityPattern>, cells: usize) -> Self {
        let len = P::padded_cells(cells) * pattern.number_of_non_zeros();
        Self {
            pattern,
            cells,
            values: vec![0.0; len],
            ordering: PhantomData,
        }
    }

    pub fn pattern(&self) -> &SparsityPattern {
        &self.pattern
    }

    pub fn pattern_arc(&self) -> Arc<SparsityPattern> {
        Arc::clone(&self.pattern)
    }

    pub fn number_of_cells(&self) -> usize {
        self.cells
    }

    pub fn number_of_non_zeros(&self) -> usize {
        self.pattern.number_of_non_zeros()
    }

    /// Cells stored per contiguous element run (the policy's group size).
    pub fn group_vector_size(&self) -> usize {
        P::group_vector_size()
    }

    /// All values, padding included, in layout order.
    pub fn as_flat_slice(&self) -> &[Float] {
        &self.values
    }

    pub fn as_flat_slice_mut(&mut self) -> &mut [Float] {
        &mut self.values
    }

    /// Element id of (row, col) if the slot exists.
    pub fn non_zero_offset(&self, row: usize, col: usize) -> Option<usize> {
        self.pattern.entry(row, col)
    }

    /// Element id of the diagonal slot in `row` if it exists.
    pub fn non_zero_offset_diagonal(&self, row: usize) -> Option<usize> {
        self.pattern.entry(row, row)
    }

    /// Offset of (cell, element id) in the flat value vector.
    pub fn cell_offset(&self, cell: usize, element: usize) -> usize {
        debug_assert!(cell < self.cells);
        P::flat_offset(self.pattern.number_of_non_zeros(), cell, element)
    }

    /// Overwrite every stored value (padding included) with `value`.
    pub fn fill(&mut self, value: Float) {
        self.values.fill(value);
    }

    /// Copy all values from `other`, which must share pattern and cells.
    pub fn copy_values_from(&mut self, other: &SparseMatrix<P>) {
        debug_assert_eq!(
            self.pattern.number_of_non_zeros(),
            other.pattern.number_of_non_zeros()
        );
        debug_assert_eq!(self.cells, other.cells);
        self.values.copy_from_slice(&other.values);
    }

    fn checked_offset(&self, cell: usize, row: usize, col: usize) -> usize {
        let element = self.pattern.entry(row, col).unwrap_or_else(|| {
            panic!("access to structurally absent slot ({row}, {col})")
        });
        self.cell_offset(cell, element)
    }
}

impl<P: StoragePolicy> Index<(usize, usize, usize)> for SparseMatrix<P> {
    type Output = Float;

    fn index(&self, (cell, row, col): (usize, usize, usize)) -> &Float {
        &self.values[self.checked_offset(cell, row, col)]
    }
}

impl<P: StoragePolicy> IndexMut<(usize, usize, usize)> for SparseMatrix<P> {
    fn index_mut(&mut self, (cell, row, col): (usize, usize, usize)) -> &mut Float {
        let offset = self.checked_offset(cell, row, col);
        &mut self.values[offset]
    }
}
