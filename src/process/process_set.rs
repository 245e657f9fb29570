//! Flattened process tables for forcing and Jacobian assembly.

use std::collections::HashMap;

use crate::error::Error;
use crate::matrix::{DenseMatrix, SparseMatrix, SparsityPattern, StoragePolicy};
use crate::process::Process;
use crate::Float;

/// Solver-internal view of the process list.
///
/// Species references are resolved to column indices once, and laid out in
/// flat arrays walked with cursors so the per-cell assembly loops touch no
/// maps or nested vectors. `jacobian_flat_ids` caches the element id of
/// every Jacobian contribution in assembly order; it must be rebuilt
/// (`set_jacobian_flat_ids`) whenever the pattern changes.
#[derive(Clone, Debug)]
pub(crate) struct ProcessSet {
    number_of_reactants: Vec<usize>,
    reactant_ids: Vec<usize>,
    number_of_products: Vec<usize>,
    product_ids: Vec<usize>,
    yields: Vec<Float>,
    jacobian_flat_ids: Vec<usize>,
}

impl ProcessSet {
    /// Resolve species names against `variable_map`.
    pub fn new(
        processes: &[Process],
        variable_map: &HashMap<String, usize>,
    ) -> Result<Self, Error> {
        let mut set = Self {
            number_of_reactants: Vec::with_capacity(processes.len()),
            reactant_ids: Vec::new(),
            number_of_products: Vec::with_capacity(processes.len()),
            product_ids: Vec::new(),
            yields: Vec::new(),
            jacobian_flat_ids: Vec::new(),
        };
        for process in processes {
            set.number_of_reactants.push(process.reactants.len());
            for species in &process.reactants {
                let id = variable_map
                    .get(&species.name)
                    .ok_or_else(|| Error::UnknownSpecies(species.name.clone()))?;
                set.reactant_ids.push(*id);
            }
            set.number_of_products.push(process.products.len());
            for (species, coefficient) in &process.products {
                let id = variable_map
                    .get(&species.name)
                    .ok_or_else(|| Error::UnknownSpecies(species.name.clone()))?;
                set.product_ids.push(*id);
                set.yields.push(*coefficient);
            }
        }
        Ok(set)
    }

    /// Every (dependent row, independent column) pair the Jacobian of the
    /// reaction network can populate.
    pub fn non_zero_jacobian_elements(&self) -> Vec<(usize, usize)> {
        let mut elements = Vec::new();
        self.for_each_jacobian_slot(|row, col| elements.push((row, col)));
        elements
    }

    /// Cache the flat element id of each Jacobian contribution.
    ///
    /// Every slot must exist in `pattern`; a missing slot is a topology
    /// construction bug, so it panics rather than erroring.
    pub fn set_jacobian_flat_ids(&mut self, pattern: &SparsityPattern) {
        let mut ids = Vec::new();
        self.for_each_jacobian_slot(|row, col| {
            let id = pattern.entry(row, col).unwrap_or_else(|| {
                panic!("Jacobian pattern is missing required slot ({row}, {col})")
            });
            ids.push(id);
        });
        self.jacobian_flat_ids = ids;
    }

    /// Walk the Jacobian contribution slots in assembly order.
    ///
    /// For each process and each reactant position treated as the
    /// independent variable: the row of every reactant, then the row of
    /// every product, at the independent reactant's column.
    fn for_each_jacobian_slot(&self, mut visit: impl FnMut(usize, usize)) {
        let mut react_cursor = 0;
        let mut prod_cursor = 0;
        for (p, &n_react) in self.number_of_reactants.iter().enumerate() {
            let n_prod = self.number_of_products[p];
            let reactants = &self.reactant_ids[react_cursor..react_cursor + n_react];
            let products = &self.product_ids[prod_cursor..prod_cursor + n_prod];
            for &independent in reactants {
                for &row in reactants {
                    visit(row, independent);
                }
                for &row in products {
                    visit(row, independent);
                }
            }
            react_cursor += n_react;
            prod_cursor += n_prod;
        }
    }

    /// Accumulate f(y, k) into `forcing`, fused per cell.
    pub fn add_forcing_terms(
        &self,
        rate_constants: &DenseMatrix,
        variables: &DenseMatrix,
        forcing: &mut DenseMatrix,
    ) {
        for cell in 0..variables.rows() {
            let rates = rate_constants.row(cell);
            let concentrations = variables.row(cell);
            let cell_forcing = forcing.row_mut(cell);
            let mut react_cursor = 0;
            let mut prod_cursor = 0;
            for (p, &n_react) in self.number_of_reactants.iter().enumerate() {
                let n_prod = self.number_of_products[p];
                let mut rate = rates[p];
                for &id in &self.reactant_ids[react_cursor..react_cursor + n_react] {
                    rate *= concentrations[id];
                }
                for &id in &self.reactant_ids[react_cursor..react_cursor + n_react] {
                    cell_forcing[id] -= rate;
                }
                for k in 0..n_prod {
                    cell_forcing[self.product_ids[prod_cursor + k]] +=
                        self.yields[prod_cursor + k] * rate;
                }
                react_cursor += n_react;
                prod_cursor += n_prod;
            }
        }
    }

    /// Accumulate ∂f/∂y into `jacobian` on the pre-resolved slots.
    ///
    /// The partial of a process rate with respect to one reactant is the
    /// rate constant times the product of the *other* reactant
    /// concentrations; enumerating reactant positions rather than distinct
    /// species makes repeated reactants contribute their multiplicity.
    pub fn add_jacobian_terms<P: StoragePolicy>(
        &self,
        rate_constants: &DenseMatrix,
        variables: &DenseMatrix,
        jacobian: &mut SparseMatrix<P>,
    ) {
        debug_assert!(!self.jacobian_flat_ids.is_empty() || self.reactant_ids.is_empty());
        let non_zeros = jacobian.number_of_non_zeros();
        for cell in 0..variables.rows() {
            let rates = rate_constants.row(cell);
            let concentrations = variables.row(cell);
            let values = jacobian.as_flat_slice_mut();
            let mut react_cursor = 0;
            let mut prod_cursor = 0;
            let mut flat_cursor = 0;
            for (p, &n_react) in self.number_of_reactants.iter().enumerate() {
                let n_prod = self.number_of_products[p];
                let reactants = &self.reactant_ids[react_cursor..react_cursor + n_react];
                for independent in 0..n_react {
                    let mut d_rate = rates[p];
                    for (position, &id) in reactants.iter().enumerate() {
                        if position != independent {
                            d_rate *= concentrations[id];
                        }
                    }
                    for _ in 0..n_react {
                        let element = self.jacobian_flat_ids[flat_cursor];
                        flat_cursor += 1;
                        values[P::flat_offset(non_zeros, cell, element)] -= d_rate;
                    }
                    for k in 0..n_prod {
                        let element = self.jacobian_flat_ids[flat_cursor];
                        flat_cursor += 1;
                        values[P::flat_offset(non_zeros, cell, element)] +=
                            self.yields[prod_cursor + k] * d_rate;
                    }
                }
                react_cursor += n_react;
                prod_cursor += n_prod;
            }
        }
    }
}
