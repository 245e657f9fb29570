//! Per-call integration state.

use std::collections::HashMap;

use crate::error::Error;
use crate::matrix::DenseMatrix;
use crate::Float;

/// Thermodynamic conditions of one reaction cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Conditions {
    /// Temperature [K].
    pub temperature: Float,
    /// Pressure [Pa].
    pub pressure: Float,
    /// Air number density [mol m⁻³].
    pub air_density: Float,
}

/// Everything a `solve` call advances or consumes, shaped for one solver.
///
/// `variables` maps (cell, species) to concentration and is the vector the
/// stepper integrates; `rate_constants` is refreshed from `conditions` and
/// `custom_rate_parameters` by [`crate::solver::RosenbrockSolver::update_state`].
/// `variable_map` translates species names to columns of `variables` —
/// the solver may have reordered the species, so code outside the solver
/// must go through the map rather than assume construction order.
#[derive(Clone, Debug)]
pub struct State {
    /// Concentrations, cells × species [mol m⁻³]. Non-negative after
    /// every accepted step.
    pub variables: DenseMatrix,
    /// Rate constants, cells × processes.
    pub rate_constants: DenseMatrix,
    /// Per-cell thermodynamic conditions.
    pub conditions: Vec<Conditions>,
    /// Per-cell inputs consumed by the rate-constant evaluators, in
    /// process order (photolysis frequencies and the like).
    pub custom_rate_parameters: DenseMatrix,
    /// Species name → column of `variables`.
    pub variable_map: HashMap<String, usize>,
}

impl State {
    pub(crate) fn new(
        variable_names: &[String],
        initial_values: &[Float],
        processes: usize,
        custom_parameters: usize,
        cells: usize,
    ) -> Self {
        let mut variables = DenseMatrix::zeros(cells, variable_names.len());
        for cell in 0..cells {
            variables.row_mut(cell).copy_from_slice(initial_values);
        }
        Self {
            variables,
            rate_constants: DenseMatrix::zeros(cells, processes),
            conditions: vec![Conditions::default(); cells],
            custom_rate_parameters: DenseMatrix::zeros(cells, custom_parameters),
            variable_map: variable_names
                .iter()
                .enumerate()
                .map(|(index, name)| (name.clone(), index))
                .collect(),
        }
    }

    pub fn number_of_cells(&self) -> usize {
        self.variables.rows()
    }

    /// Set one species' concentration in every cell.
    pub fn set_concentration(&mut self, name: &str, values: &[Float]) -> Result<(), Error> {
        let column = *self
            .variable_map
            .get(name)
            .ok_or_else(|| Error::UnknownSpecies(name.to_string()))?;
        if values.len() != self.number_of_cells() {
            return Err(Error::ShapeMismatch {
                name: "concentration values",
                rows: values.len(),
                cols: 1,
                expected_rows: self.number_of_cells(),
                expected_cols: 1,
            });
        }
        for (cell, &value) in values.iter().enumerate() {
            self.variables[(cell, column)] = value;
        }
        Ok(())
    }

    /// Set one species' concentration to the same value in every cell.
    pub fn set_uniform_concentration(&mut self, name: &str, value: Float) -> Result<(), Error> {
        let values = vec![value; self.number_of_cells()];
        self.set_concentration(name, &values)
    }

    /// Replace one cell's custom rate parameters.
    pub fn set_custom_rate_parameters(
        &mut self,
        cell: usize,
        values: &[Float],
    ) -> Result<(), Error> {
        if values.len() != self.custom_rate_parameters.cols() {
            return Err(Error::ShapeMismatch {
                name: "custom rate parameters",
                rows: 1,
                cols: values.len(),
                expected_rows: 1,
                expected_cols: self.custom_rate_parameters.cols(),
            });
        }
        self.custom_rate_parameters
            .row_mut(cell)
            .copy_from_slice(values);
        Ok(())
    }
}
