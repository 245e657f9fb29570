//! Errors for solver construction and the runtime API.

use thiserror::Error;

use crate::Float;

/// Errors surfaced by solver construction, state updates, and the
/// assembly entry points.
///
/// Numerical failures inside a `solve` call (singular stage matrix,
/// non-finite state, exhausted step budget) are reported through
/// [`crate::solver::SolverStatus`] instead, so the caller still receives
/// the last consistent `(t, y)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The system contains no species.
    #[error("system must contain at least one species")]
    EmptySystem,

    /// Two species share the same name.
    #[error("duplicate species name `{0}`")]
    DuplicateSpecies(String),

    /// A process references a species that is not part of the system.
    #[error("species `{0}` is not part of the system")]
    UnknownSpecies(String),

    /// Input container dimensions do not match the constructed topology.
    #[error("{name} has shape {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    ShapeMismatch {
        name: &'static str,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    /// A pivot fell below the configured threshold during factorization.
    #[error("pivot in row {row} underflowed the threshold during LU factorization")]
    SingularMatrix { row: usize },

    /// The stage-matrix specialization could not be generated; callers
    /// fall back to the generic builder.
    #[error("stage-matrix specialization could not be generated: {0}")]
    SpecializationFailed(String),

    /// `max_steps` must be positive.
    #[error("max_steps must be positive")]
    MaxStepsMustBePositive,

    /// The safety factor is outside (0, 1).
    #[error("safety_factor must be in (0, 1) (got {0})")]
    SafetyFactorOutOfRange(Float),

    /// Step-size scale factors must satisfy 0 < min <= max.
    #[error("step factors must satisfy 0 < h_factor_min <= h_factor_max (got min={0}, max={1})")]
    InvalidStepFactors(Float, Float),

    /// A coefficient table has the wrong length for the stage count.
    #[error("parameter table `{name}` has length {len}, expected {expected}")]
    BadParameterTable {
        name: &'static str,
        len: usize,
        expected: usize,
    },

    /// A per-species absolute tolerance vector has the wrong length.
    #[error("abs_tol has {len} entries, expected one per species ({expected})")]
    BadToleranceLength { len: usize, expected: usize },
}
