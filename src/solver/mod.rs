//! The numerical core: LU machinery, stage-matrix assembly, parameters,
//! state, and the Rosenbrock stepper.

pub mod linear;
pub mod lu;
pub mod parameters;
pub mod rosenbrock;
pub mod stage;
pub mod state;

pub use linear::{diagonal_markowitz_reorder, LinearSolver};
pub use lu::LuDecomposition;
pub use parameters::{RosenbrockParameters, Tolerance};
pub use rosenbrock::{RosenbrockSolver, SolveResult, SolverStats, SolverStatus};
pub use stage::alpha_minus_jacobian;
pub use state::{Conditions, State};
