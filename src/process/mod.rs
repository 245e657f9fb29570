//! Chemical processes and their rate-constant evaluators.

mod process_set;
mod rate_constants;

pub(crate) use process_set::ProcessSet;
pub use rate_constants::{
    ArrheniusParameters, PhotolysisParameters, RateConstant, TernaryChemicalActivationParameters,
    TroeParameters, TunnelingParameters,
};

use bon::Builder;

use crate::system::Species;
use crate::Float;

/// One chemical process: reactants are consumed with multiplicity,
/// products are produced with a (possibly non-integer) yield.
///
/// A species appearing more than once in `reactants` reacts at second
/// (or higher) order in its own concentration.
#[derive(Builder, Clone, Debug)]
pub struct Process {
    /// Reactant multiset; repeats encode multiplicity.
    pub reactants: Vec<Species>,
    /// Products with stoichiometric yields.
    #[builder(default)]
    pub products: Vec<(Species, Float)>,
    /// Evaluator producing k per cell.
    pub rate_constant: RateConstant,
}
