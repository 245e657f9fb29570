//! Convenient imports for common usage.
//!
//! ```rust
//! use stiffchem::prelude::*;
//! ```

pub use crate::matrix::{
    BlockOrdering, DenseMatrix, InterleavedOrdering, SparseMatrix, SparsityPattern,
};
pub use crate::process::{
    ArrheniusParameters, PhotolysisParameters, Process, RateConstant,
    TernaryChemicalActivationParameters, TroeParameters, TunnelingParameters,
};
pub use crate::solver::{
    Conditions, RosenbrockParameters, RosenbrockSolver, SolveResult, SolverStats, SolverStatus,
    State, Tolerance,
};
pub use crate::system::{Species, System};
pub use crate::{Error, Float};
