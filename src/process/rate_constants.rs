//! Rate-constant evaluator families.
//!
//! Each family is a parameter struct plus one arm of [`RateConstant`].
//! Evaluators are stateless after construction: `calculate` maps the
//! per-cell thermodynamic conditions and the evaluator's slice of the
//! per-cell custom parameters to a scalar k.

use bon::Builder;

use crate::solver::Conditions;
use crate::Float;

/// Modified Arrhenius law: k = a·exp(c/T)·(T/d)^b·(1 + e·P).
///
/// The classic two-parameter form maps onto `a` and `c = −Eₐ/k_B`.
#[derive(Builder, Clone, Copy, Debug, PartialEq)]
pub struct ArrheniusParameters {
    #[builder(default = 1.0)]
    pub a: Float,
    #[builder(default = 0.0)]
    pub b: Float,
    #[builder(default = 0.0)]
    pub c: Float,
    /// Reference temperature [K] for the power-law term.
    #[builder(default = 300.0)]
    pub d: Float,
    /// Pressure coefficient [Pa⁻¹].
    #[builder(default = 0.0)]
    pub e: Float,
}

/// Troe fall-off: blends low- and high-pressure limits against air density.
#[derive(Builder, Clone, Copy, Debug, PartialEq)]
pub struct TroeParameters {
    #[builder(default = 1.0)]
    pub k0_a: Float,
    #[builder(default = 0.0)]
    pub k0_b: Float,
    #[builder(default = 0.0)]
    pub k0_c: Float,
    #[builder(default = 1.0)]
    pub kinf_a: Float,
    #[builder(default = 0.0)]
    pub kinf_b: Float,
    #[builder(default = 0.0)]
    pub kinf_c: Float,
    #[builder(default = 0.6)]
    pub fc: Float,
    #[builder(default = 1.0)]
    pub n: Float,
}

/// Ternary chemical activation: like Troe but without the extra factor of
/// air density in the numerator.
#[derive(Builder, Clone, Copy, Debug, PartialEq)]
pub struct TernaryChemicalActivationParameters {
    #[builder(default = 1.0)]
    pub k0_a: Float,
    #[builder(default = 0.0)]
    pub k0_b: Float,
    #[builder(default = 0.0)]
    pub k0_c: Float,
    #[builder(default = 1.0)]
    pub kinf_a: Float,
    #[builder(default = 0.0)]
    pub kinf_b: Float,
    #[builder(default = 0.0)]
    pub kinf_c: Float,
    #[builder(default = 0.6)]
    pub fc: Float,
    #[builder(default = 1.0)]
    pub n: Float,
}

/// Quantum tunneling correction: k = a·exp(−b/T)·exp(c/T³).
#[derive(Builder, Clone, Copy, Debug, PartialEq)]
pub struct TunnelingParameters {
    #[builder(default = 1.0)]
    pub a: Float,
    #[builder(default = 0.0)]
    pub b: Float,
    #[builder(default = 0.0)]
    pub c: Float,
}

/// Externally supplied photolysis frequency, scaled by a constant.
///
/// The frequency itself arrives through one slot of the state's custom
/// rate parameters, so callers can update it every `update_state` without
/// rebuilding the solver.
#[derive(Builder, Clone, Copy, Debug, PartialEq)]
pub struct PhotolysisParameters {
    #[builder(default = 1.0)]
    pub scaling_factor: Float,
}

/// Tagged rate-constant evaluator.
#[derive(Clone, Debug, PartialEq)]
pub enum RateConstant {
    Arrhenius(ArrheniusParameters),
    Troe(TroeParameters),
    TernaryChemicalActivation(TernaryChemicalActivationParameters),
    Tunneling(TunnelingParameters),
    Photolysis(PhotolysisParameters),
}

impl RateConstant {
    pub fn arrhenius(parameters: ArrheniusParameters) -> Self {
        Self::Arrhenius(parameters)
    }

    pub fn troe(parameters: TroeParameters) -> Self {
        Self::Troe(parameters)
    }

    pub fn ternary_chemical_activation(parameters: TernaryChemicalActivationParameters) -> Self {
        Self::TernaryChemicalActivation(parameters)
    }

    pub fn tunneling(parameters: TunnelingParameters) -> Self {
        Self::Tunneling(parameters)
    }

    pub fn photolysis(parameters: PhotolysisParameters) -> Self {
        Self::Photolysis(parameters)
    }

    /// Number of per-cell custom parameter slots this evaluator consumes.
    pub fn custom_parameter_count(&self) -> usize {
        match self {
            Self::Photolysis(_) => 1,
            _ => 0,
        }
    }

    /// Evaluate k for one cell.
    ///
    /// `custom` is this evaluator's slice of the cell's custom rate
    /// parameters, `custom_parameter_count` entries long.
    pub fn calculate(&self, conditions: &Conditions, custom: &[Float]) -> Float {
        let t = conditions.temperature;
        match self {
            Self::Arrhenius(p) => {
                p.a * (p.c / t).exp() * (t / p.d).powf(p.b) * (1.0 + p.e * conditions.pressure)
            }
            Self::Troe(p) => {
                let m = conditions.air_density;
                let k0 = p.k0_a * (p.k0_c / t).exp() * (t / 300.0).powf(p.k0_b);
                let kinf = p.kinf_a * (p.kinf_c / t).exp() * (t / 300.0).powf(p.kinf_b);
                let ratio = k0 * m / kinf;
                k0 * m / (1.0 + ratio)
                    * p.fc.powf(1.0 / (1.0 + 1.0 / p.n * ratio.log10().powi(2)))
            }
            Self::TernaryChemicalActivation(p) => {
                let m = conditions.air_density;
                let k0 = p.k0_a * (p.k0_c / t).exp() * (t / 300.0).powf(p.k0_b);
                let kinf = p.kinf_a * (p.kinf_c / t).exp() * (t / 300.0).powf(p.kinf_b);
                let ratio = k0 * m / kinf;
                k0 / (1.0 + ratio) * p.fc.powf(1.0 / (1.0 + 1.0 / p.n * ratio.log10().powi(2)))
            }
            Self::Tunneling(p) => p.a * (-p.b / t).exp() * (p.c / (t * t * t)).exp(),
            Self::Photolysis(p) => p.scaling_factor * custom[0],
        }
    }
}
