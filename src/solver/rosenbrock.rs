//! Rosenbrock W-method stepper for batched reaction systems.
//!
//! Formulated from Hairer & Wanner, Solving Ordinary Differential
//! Equations II (1996), with the stage coupling written in the
//! implementation-oriented form of Sandu et al. (1997): every stage of a
//! step solves one linear system with the same matrix
//! H = (h·γ)⁻¹·I − J, so the Jacobian is assembled and factored once per
//! attempted step.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::error::Error;
use crate::matrix::{BlockOrdering, DenseMatrix, SparseMatrix, SparsityPattern, StoragePolicy};
use crate::process::{Process, ProcessSet};
use crate::solver::linear::{diagonal_markowitz_reorder, LinearSolver};
use crate::solver::parameters::{RosenbrockParameters, Tolerance};
use crate::solver::stage::{alpha_minus_jacobian, StageMatrixKernel};
use crate::solver::state::State;
use crate::system::{Species, System};
use crate::Float;

/// Error norms below this floor are clamped so a vanishing estimate
/// cannot drive unbounded step growth.
const ERROR_MIN: Float = 1.0e-10;

/// Fallback initial step size when none is configured.
const DELTA_MIN: Float = 1.0e-6;

/// Retry budget for singular factorizations within one step; each retry
/// halves h, which strengthens the αI term until the pivots recover.
const MAX_FACTOR_RETRIES: usize = 30;

/// Terminal status of a `solve` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// The interval was covered.
    Converged,
    /// `max_steps` attempts were spent before reaching the end; the state
    /// reflects the partial progress made.
    MaxStepsExceeded,
    /// The step size hit its floor or the rejection budget ran out.
    StepSizeTooSmall,
    /// The stage matrix stayed singular down to the minimum step size.
    RepeatedSingularMatrix,
    /// A non-finite value persisted down to the minimum step size.
    NonFiniteState,
}

/// Work counters accumulated over one `solve` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// Forcing evaluations.
    pub function_calls: usize,
    /// Jacobian assemblies.
    pub jacobian_updates: usize,
    /// LU factorizations.
    pub decompositions: usize,
    /// Triangular solve pairs.
    pub solves: usize,
    /// Step attempts.
    pub steps: usize,
    /// Accepted steps.
    pub accepted: usize,
    /// Rejected steps.
    pub rejected: usize,
    /// Singular factorizations recovered by shrinking h.
    pub singular: usize,
}

/// Outcome of a `solve` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveResult {
    /// The time actually reached; equals the requested end time when
    /// `status` is [`SolverStatus::Converged`].
    pub t_reached: Float,
    pub status: SolverStatus,
    pub stats: SolverStats,
}

impl SolveResult {
    pub fn succeeded(&self) -> bool {
        self.status == SolverStatus::Converged
    }
}

/// Clamped step-size scale factor from a finite error norm.
pub(crate) fn step_size_factor(error: Float, parameters: &RosenbrockParameters) -> Float {
    (parameters.safety_factor * error.powf(-1.0 / parameters.estimator_of_local_order))
        .clamp(parameters.h_factor_min, parameters.h_factor_max)
}

/// Rosenbrock solver for one chemical mechanism over a fixed batch of
/// cells.
///
/// Construction resolves the species ordering (optionally reordered by
/// the diagonal-Markowitz rule), the Jacobian sparsity, the symbolic LU,
/// and all scratch buffers; `solve` allocates nothing.
pub struct RosenbrockSolver<P: StoragePolicy = BlockOrdering> {
    parameters: RosenbrockParameters,
    processes: Vec<Process>,
    variable_names: Vec<String>,
    initial_values: Vec<Float>,
    /// Absolute tolerances in the internal species ordering.
    abs_tol: Vec<Float>,
    custom_parameter_len: usize,
    process_set: ProcessSet,
    jacobian_pattern: Arc<SparsityPattern>,
    linear_solver: LinearSolver<P>,
    stage_kernel: StageMatrixKernel,
    jacobian: SparseMatrix<P>,
    stage_matrix: SparseMatrix<P>,
    stage_forcing: DenseMatrix,
    rhs: DenseMatrix,
    ynew: DenseMatrix,
    error_vector: DenseMatrix,
    k: Vec<DenseMatrix>,
}

impl<P: StoragePolicy> RosenbrockSolver<P> {
    /// Wire a solver for `system` driven by `processes`.
    pub fn new(
        system: System,
        processes: Vec<Process>,
        parameters: RosenbrockParameters,
    ) -> Result<Self, Error> {
        let n_species = system.number_of_species();
        parameters.validate(n_species)?;
        let n_cells = parameters.number_of_cells;

        let mut species: Vec<Species> = system.species().to_vec();
        let mut permutation: Vec<usize> = (0..n_species).collect();
        if parameters.reorder_state && n_species > 1 {
            let provisional_map = name_map(&species);
            let provisional_set = ProcessSet::new(&processes, &provisional_map)?;
            let mut entries = provisional_set.non_zero_jacobian_elements();
            entries.extend((0..n_species).map(|i| (i, i)));
            let pattern = SparsityPattern::from_entries(n_species, entries);
            permutation = diagonal_markowitz_reorder(&pattern);
            species = permutation
                .iter()
                .map(|&original| species[original].clone())
                .collect();
        }

        let variable_map = name_map(&species);
        let mut process_set = ProcessSet::new(&processes, &variable_map)?;
        let mut entries = process_set.non_zero_jacobian_elements();
        entries.extend((0..n_species).map(|i| (i, i)));
        let jacobian_pattern = Arc::new(SparsityPattern::from_entries(n_species, entries));
        process_set.set_jacobian_flat_ids(&jacobian_pattern);

        let abs_tol = match &parameters.abs_tol {
            Tolerance::Scalar(value) => vec![*value; n_species],
            Tolerance::Vector(values) => {
                permutation.iter().map(|&original| values[original]).collect()
            }
        };

        let jacobian = SparseMatrix::zeros(Arc::clone(&jacobian_pattern), n_cells);
        let stage_matrix = SparseMatrix::zeros(Arc::clone(&jacobian_pattern), n_cells);
        let stage_kernel = StageMatrixKernel::for_matrix(&stage_matrix);
        let linear_solver = LinearSolver::new(&jacobian_pattern, n_cells);

        let variable_names: Vec<String> = species.iter().map(|s| s.name.clone()).collect();
        let initial_values: Vec<Float> =
            species.iter().map(|s| s.initial_concentration).collect();
        let custom_parameter_len = processes
            .iter()
            .map(|p| p.rate_constant.custom_parameter_count())
            .sum();

        let dense = || DenseMatrix::zeros(n_cells, n_species);
        let k = (0..parameters.stages).map(|_| dense()).collect();
        Ok(Self {
            parameters,
            processes,
            variable_names,
            initial_values,
            abs_tol,
            custom_parameter_len,
            process_set,
            jacobian_pattern,
            linear_solver,
            stage_kernel,
            jacobian,
            stage_matrix,
            stage_forcing: dense(),
            rhs: dense(),
            ynew: dense(),
            error_vector: dense(),
            k,
        })
    }

    /// Species names in the internal (possibly reordered) column order.
    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    /// A fresh, correctly shaped state seeded with the species' initial
    /// concentrations.
    pub fn get_state(&self) -> State {
        State::new(
            &self.variable_names,
            &self.initial_values,
            self.processes.len(),
            self.custom_parameter_len,
            self.parameters.number_of_cells,
        )
    }

    /// A zeroed Jacobian container over the solver's sparsity.
    pub fn new_jacobian_matrix(&self) -> SparseMatrix<P> {
        SparseMatrix::zeros(
            Arc::clone(&self.jacobian_pattern),
            self.parameters.number_of_cells,
        )
    }

    /// Recompute `state.rate_constants` from the current conditions and
    /// custom rate parameters.
    pub fn update_state(&self, state: &mut State) -> Result<(), Error> {
        self.check_state(state)?;
        for cell in 0..state.number_of_cells() {
            let conditions = &state.conditions[cell];
            let custom = state.custom_rate_parameters.row(cell);
            let rates = state.rate_constants.row_mut(cell);
            let mut offset = 0;
            for (index, process) in self.processes.iter().enumerate() {
                let count = process.rate_constant.custom_parameter_count();
                rates[index] = process
                    .rate_constant
                    .calculate(conditions, &custom[offset..offset + count]);
                offset += count;
            }
        }
        Ok(())
    }

    /// Write f(y, k) = dy/dt into `forcing`.
    pub fn calculate_forcing(
        &self,
        rate_constants: &DenseMatrix,
        variables: &DenseMatrix,
        forcing: &mut DenseMatrix,
    ) -> Result<(), Error> {
        let cells = variables.rows();
        check_shape("variables", variables, cells, self.variable_names.len())?;
        check_shape("rate_constants", rate_constants, cells, self.processes.len())?;
        check_shape("forcing", forcing, cells, self.variable_names.len())?;
        forcing.fill(0.0);
        self.process_set
            .add_forcing_terms(rate_constants, variables, forcing);
        Ok(())
    }

    /// Write J = ∂f/∂y into `jacobian`, sign-correct.
    pub fn calculate_jacobian(
        &self,
        rate_constants: &DenseMatrix,
        variables: &DenseMatrix,
        jacobian: &mut SparseMatrix<P>,
    ) -> Result<(), Error> {
        let cells = variables.rows();
        check_shape("variables", variables, cells, self.variable_names.len())?;
        check_shape("rate_constants", rate_constants, cells, self.processes.len())?;
        if jacobian.number_of_cells() != cells
            || jacobian.number_of_non_zeros() != self.jacobian_pattern.number_of_non_zeros()
        {
            return Err(Error::ShapeMismatch {
                name: "jacobian",
                rows: jacobian.number_of_cells(),
                cols: jacobian.number_of_non_zeros(),
                expected_rows: cells,
                expected_cols: self.jacobian_pattern.number_of_non_zeros(),
            });
        }
        jacobian.fill(0.0);
        self.process_set
            .add_jacobian_terms(rate_constants, variables, jacobian);
        Ok(())
    }

    /// Form H = αI − J in place over `jacobian`.
    ///
    /// Uses the construction-time specialized kernel when `jacobian` has
    /// the solver's own shape; the generic path is used otherwise and is
    /// functionally identical.
    pub fn alpha_minus_jacobian(&self, jacobian: &mut SparseMatrix<P>, alpha: Float) {
        let solver_shaped = jacobian.number_of_cells() == self.parameters.number_of_cells
            && jacobian.number_of_non_zeros() == self.jacobian_pattern.number_of_non_zeros();
        if solver_shaped {
            for value in jacobian.as_flat_slice_mut() {
                *value = -*value;
            }
            self.stage_kernel.add_alpha(jacobian, alpha);
        } else {
            alpha_minus_jacobian(jacobian, alpha);
        }
    }

    /// Advance `state.variables` from `t_start` to `t_end`.
    ///
    /// Construction-level inconsistencies surface as `Err`; numerical
    /// failures end the integration early and are reported in the
    /// returned status together with the last consistent `(t, y)`.
    pub fn solve(
        &mut self,
        state: &mut State,
        t_start: Float,
        t_end: Float,
    ) -> Result<SolveResult, Error> {
        self.check_state(state)?;
        let mut stats = SolverStats::default();
        let time_len = t_end - t_start;
        if time_len <= 0.0 {
            return Ok(SolveResult {
                t_reached: t_start,
                status: SolverStatus::Converged,
                stats,
            });
        }

        let h_min = self.parameters.h_min.max(0.0);
        let h_max = if self.parameters.h_max > 0.0 {
            self.parameters.h_max
        } else {
            time_len
        };
        let mut h = if self.parameters.h_start > 0.0 {
            self.parameters.h_start
        } else {
            DELTA_MIN.max(h_min)
        };
        h = h.min(h_max).min(time_len);

        let gamma0 = self.parameters.gamma[0];
        let stages = self.parameters.stages;
        let t_eps = 10.0 * Float::EPSILON * t_end.abs().max(time_len);
        let mut t = t_start;
        let mut consecutive_rejections = 0usize;

        let status = loop {
            if t_end - t <= t_eps {
                break SolverStatus::Converged;
            }
            if stats.steps >= self.parameters.max_steps {
                break SolverStatus::MaxStepsExceeded;
            }
            h = h.min(t_end - t);

            // One Jacobian and one factorization per attempted step.
            self.jacobian.fill(0.0);
            self.process_set.add_jacobian_terms(
                &state.rate_constants,
                &state.variables,
                &mut self.jacobian,
            );
            stats.jacobian_updates += 1;
            match self.factor_stage_matrix(&mut h, h_min, gamma0, &mut stats) {
                Ok(()) => {}
                Err(status) => break status,
            }

            // Stages: H·K_i = f(y + Σ a_ij K_j) + Σ (c_ij/h) K_j.
            for stage in 0..stages {
                if stage == 0 {
                    self.stage_forcing.fill(0.0);
                    self.process_set.add_forcing_terms(
                        &state.rate_constants,
                        &state.variables,
                        &mut self.stage_forcing,
                    );
                    stats.function_calls += 1;
                } else if self.parameters.new_function_evaluation[stage] {
                    self.ynew.copy_from(&state.variables);
                    for j in 0..stage {
                        let a = self.parameters.a_at(stage, j);
                        if a != 0.0 {
                            self.ynew.axpy(a, &self.k[j]);
                        }
                    }
                    self.stage_forcing.fill(0.0);
                    self.process_set.add_forcing_terms(
                        &state.rate_constants,
                        &self.ynew,
                        &mut self.stage_forcing,
                    );
                    stats.function_calls += 1;
                }
                self.rhs.copy_from(&self.stage_forcing);
                for j in 0..stage {
                    let c = self.parameters.c_at(stage, j);
                    if c != 0.0 {
                        self.rhs.axpy(c / h, &self.k[j]);
                    }
                }
                self.linear_solver.solve(&self.rhs, &mut self.k[stage]);
                stats.solves += 1;
            }

            // Solution, error vector, and scaled error norm.
            self.ynew.copy_from(&state.variables);
            for (weight, k) in self.parameters.m.iter().zip(&self.k) {
                if *weight != 0.0 {
                    self.ynew.axpy(*weight, k);
                }
            }
            self.error_vector.fill(0.0);
            for (weight, k) in self.parameters.e.iter().zip(&self.k) {
                if *weight != 0.0 {
                    self.error_vector.axpy(*weight, k);
                }
            }
            // The max() below would swallow a NaN, so the finiteness
            // sentinel must run on the raw norm.
            let error = self.normalized_error(&state.variables);
            stats.steps += 1;

            if !error.is_finite() {
                // Non-finite values are handled like a rejection so the
                // state never absorbs them; persisting at the floor is
                // fatal.
                stats.rejected += 1;
                consecutive_rejections += 1;
                debug!("non-finite error norm at t = {t:.6e}, h = {h:.6e}");
                if (h_min > 0.0 && h <= h_min)
                    || consecutive_rejections > self.parameters.max_rejections
                {
                    break SolverStatus::NonFiniteState;
                }
                h = (h * self.parameters.h_factor_reject).max(h_min);
                continue;
            }

            let error = error.max(ERROR_MIN);
            let factor = step_size_factor(error, &self.parameters);
            if error <= 1.0 {
                // Accepted: clamp stray negative concentrations before the
                // state absorbs the step.
                for value in self.ynew.as_mut_slice() {
                    if *value < 0.0 {
                        *value = 0.0;
                    }
                }
                state.variables.copy_from(&self.ynew);
                t += h;
                h = (h * factor).min(h_max).max(h_min);
                consecutive_rejections = 0;
                stats.accepted += 1;
            } else {
                stats.rejected += 1;
                consecutive_rejections += 1;
                if consecutive_rejections > self.parameters.max_rejections {
                    break SolverStatus::StepSizeTooSmall;
                }
                let mut h_new = h * factor.min(1.0);
                if consecutive_rejections > 1 {
                    h_new = h * self.parameters.h_factor_reject;
                }
                if h_new < h_min {
                    if h <= h_min {
                        break SolverStatus::StepSizeTooSmall;
                    }
                    h_new = h_min;
                }
                debug!(
                    "step rejected at t = {t:.6e}: error = {error:.3e}, h {h:.3e} -> {h_new:.3e}"
                );
                h = h_new;
            }
        };

        Ok(SolveResult {
            t_reached: t,
            status,
            stats,
        })
    }

    /// Build and factor H = (h·γ)⁻¹I − J, halving h while pivots
    /// underflow.
    fn factor_stage_matrix(
        &mut self,
        h: &mut Float,
        h_min: Float,
        gamma0: Float,
        stats: &mut SolverStats,
    ) -> Result<(), SolverStatus> {
        for _ in 0..MAX_FACTOR_RETRIES {
            let alpha = 1.0 / (*h * gamma0);
            self.stage_matrix.copy_values_from(&self.jacobian);
            for value in self.stage_matrix.as_flat_slice_mut() {
                *value = -*value;
            }
            self.stage_kernel.add_alpha(&mut self.stage_matrix, alpha);
            stats.decompositions += 1;
            match self
                .linear_solver
                .factor(&self.stage_matrix, self.parameters.pivot_threshold)
            {
                Ok(()) => return Ok(()),
                Err(_) => {
                    stats.singular += 1;
                    if h_min > 0.0 && *h <= h_min {
                        return Err(SolverStatus::RepeatedSingularMatrix);
                    }
                    debug!("singular stage matrix, halving h from {h:.6e}");
                    *h = (*h * 0.5).max(h_min);
                }
            }
        }
        Err(SolverStatus::RepeatedSingularMatrix)
    }

    /// E = sqrt( (1/n) Σ (err / (atol + rtol·max(|y|, |y_new|)))² ).
    fn normalized_error(&self, y: &DenseMatrix) -> Float {
        let rel_tol = self.parameters.rel_tol;
        let n_species = self.variable_names.len();
        let mut sum = 0.0;
        for cell in 0..y.rows() {
            let y_row = y.row(cell);
            let ynew_row = self.ynew.row(cell);
            let err_row = self.error_vector.row(cell);
            for i in 0..n_species {
                let scale = self.abs_tol[i] + rel_tol * y_row[i].abs().max(ynew_row[i].abs());
                let ratio = err_row[i] / scale;
                sum += ratio * ratio;
            }
        }
        (sum / (y.rows() * n_species) as Float).sqrt()
    }

    fn check_state(&self, state: &State) -> Result<(), Error> {
        let cells = self.parameters.number_of_cells;
        check_shape("variables", &state.variables, cells, self.variable_names.len())?;
        check_shape(
            "rate_constants",
            &state.rate_constants,
            cells,
            self.processes.len(),
        )?;
        check_shape(
            "custom_rate_parameters",
            &state.custom_rate_parameters,
            cells,
            self.custom_parameter_len,
        )?;
        if state.conditions.len() != cells {
            return Err(Error::ShapeMismatch {
                name: "conditions",
                rows: state.conditions.len(),
                cols: 1,
                expected_rows: cells,
                expected_cols: 1,
            });
        }
        Ok(())
    }
}

fn name_map(species: &[Species]) -> HashMap<String, usize> {
    species
        .iter()
        .enumerate()
        .map(|(index, s)| (s.name.clone(), index))
        .collect()
}

fn check_shape(
    name: &'static str,
    matrix: &DenseMatrix,
    rows: usize,
    cols: usize,
) -> Result<(), Error> {
    if matrix.rows() != rows || matrix.cols() != cols {
        return Err(Error::ShapeMismatch {
            name,
            rows: matrix.rows(),
            cols: matrix.cols(),
            expected_rows: rows,
            expected_cols: cols,
        });
    }
    Ok(())
}
