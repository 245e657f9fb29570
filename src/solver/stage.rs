//! Stage-matrix assembly: H = αI − J in place over the sparse Jacobian.

use log::warn;

use crate::error::Error;
use crate::matrix::{SparseMatrix, StoragePolicy};
use crate::Float;

/// Form H = αI − J in place: negate every stored non-zero, then add α to
/// each diagonal slot. The pattern is untouched; structurally absent
/// entries stay absent.
pub fn alpha_minus_jacobian<P: StoragePolicy>(jacobian: &mut SparseMatrix<P>, alpha: Float) {
    for value in jacobian.as_flat_slice_mut() {
        *value = -*value;
    }
    add_alpha_generic(jacobian, alpha);
}

fn add_alpha_generic<P: StoragePolicy>(matrix: &mut SparseMatrix<P>, alpha: Float) {
    let non_zeros = matrix.number_of_non_zeros();
    let cells = matrix.number_of_cells();
    let diagonal_ids = matrix.pattern().diagonal_ids();
    let values = matrix.as_flat_slice_mut();
    for cell in 0..cells {
        for &element in &diagonal_ids {
            values[P::flat_offset(non_zeros, cell, element)] += alpha;
        }
    }
}

/// Runtime-selected implementation of the diagonal update in
/// [`alpha_minus_jacobian`].
///
/// The specialized variant is generated at solver construction: the flat
/// offset of every diagonal slot of every cell (padding cells included —
/// their values are never read) is enumerated once and merged into
/// contiguous runs, so the per-step hot loop is a straight-line sweep with
/// no pattern lookups. With the interleaved storage each run covers a
/// whole cell group. The generic variant re-derives offsets from the
/// pattern on every call and is the fallback when generation fails.
#[derive(Clone, Debug)]
pub(crate) enum StageMatrixKernel {
    Generic,
    Specialized { runs: Vec<(usize, usize)> },
}

impl StageMatrixKernel {
    /// Generate the straight-line diagonal schedule for `matrix`.
    pub fn specialized<P: StoragePolicy>(matrix: &SparseMatrix<P>) -> Result<Self, Error> {
        let pattern = matrix.pattern();
        let non_zeros = pattern.number_of_non_zeros();
        let mut diagonal_ids = Vec::with_capacity(pattern.dimension());
        for row in 0..pattern.dimension() {
            diagonal_ids.push(pattern.entry(row, row).ok_or_else(|| {
                Error::SpecializationFailed(format!("row {row} has no diagonal slot"))
            })?);
        }

        let padded = P::padded_cells(matrix.number_of_cells());
        let mut offsets: Vec<usize> = (0..padded)
            .flat_map(|cell| {
                diagonal_ids
                    .iter()
                    .map(move |&element| P::flat_offset(non_zeros, cell, element))
            })
            .collect();
        offsets.sort_unstable();

        let mut runs: Vec<(usize, usize)> = Vec::new();
        for offset in offsets {
            match runs.last_mut() {
                Some((start, length)) if *start + *length == offset => *length += 1,
                _ => runs.push((offset, 1)),
            }
        }
        Ok(Self::Specialized { runs })
    }

    /// Generate the specialization, or fall back to the generic kernel.
    pub fn for_matrix<P: StoragePolicy>(matrix: &SparseMatrix<P>) -> Self {
        match Self::specialized(matrix) {
            Ok(kernel) => kernel,
            Err(error) => {
                warn!("stage-matrix specialization unavailable, using generic path: {error}");
                Self::Generic
            }
        }
    }

    /// Add α to every diagonal slot of every cell.
    pub fn add_alpha<P: StoragePolicy>(&self, matrix: &mut SparseMatrix<P>, alpha: Float) {
        match self {
            Self::Generic => add_alpha_generic(matrix, alpha),
            Self::Specialized { runs } => {
                let values = matrix.as_flat_slice_mut();
                for &(start, length) in runs {
                    for value in &mut values[start..start + length] {
                        *value += alpha;
                    }
                }
            }
        }
    }
}
