//! Rosenbrock method coefficients and step-control settings.
//!
//! The published parameter sets follow Hairer & Wanner, Solving Ordinary
//! Differential Equations II (1996), and the Rosenbrock solvers of Sandu
//! et al. (1997), Benchmarking stiff ODE solvers for atmospheric
//! chemistry problems II.

use std::ops::{Index, IndexMut};

use bon::Builder;

use crate::error::Error;
use crate::Float;

/// Scalar or per-species tolerance.
///
/// [`Into`] conversions let callers pass a bare `Float`, an array, or a
/// `Vec` without caring which variant they produce.
#[derive(Clone, Debug, PartialEq)]
pub enum Tolerance {
    Scalar(Float),
    Vector(Vec<Float>),
}

impl From<Float> for Tolerance {
    fn from(val: Float) -> Self {
        Tolerance::Scalar(val)
    }
}

impl From<&[Float]> for Tolerance {
    fn from(val: &[Float]) -> Self {
        Tolerance::Vector(val.to_vec())
    }
}

impl<const N: usize> From<[Float; N]> for Tolerance {
    fn from(val: [Float; N]) -> Self {
        Tolerance::Vector(val.to_vec())
    }
}

impl From<Vec<Float>> for Tolerance {
    fn from(val: Vec<Float>) -> Self {
        Tolerance::Vector(val)
    }
}

impl Index<usize> for Tolerance {
    type Output = Float;

    fn index(&self, index: usize) -> &Self::Output {
        match self {
            Tolerance::Scalar(v) => v,
            Tolerance::Vector(vs) => &vs[index],
        }
    }
}

impl IndexMut<usize> for Tolerance {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match self {
            Tolerance::Scalar(v) => v,
            Tolerance::Vector(vs) => &mut vs[index],
        }
    }
}

/// Coefficients and controls of one Rosenbrock W-method.
///
/// `a` and `c` are the strictly lower-triangular stage couplings, packed
/// row-major (a21; a31, a32; …). `gamma[0]` is the shared diagonal of the
/// Γ matrix and enters the stage matrix as α = 1/(h·γ). `alpha` holds the
/// stage time offsets of the published tableaus; the reaction forcing is
/// autonomous so they do not enter the stage loop. `m` are the solution
/// weights and `e` the error-estimate weights.
///
/// Use a named constructor for a published set, or the builder for a
/// custom one; fields stay public so individual controls can be adjusted
/// after construction.
#[derive(Builder, Clone, Debug, PartialEq)]
pub struct RosenbrockParameters {
    /// Number of stages s.
    pub stages: usize,
    /// Stage coupling a_ij, packed strictly lower triangular.
    pub a: Vec<Float>,
    /// Stage coupling c_ij (applied as c_ij/h), packed strictly lower
    /// triangular.
    pub c: Vec<Float>,
    /// Solution weights m_i.
    pub m: Vec<Float>,
    /// Error-estimate weights e_i.
    pub e: Vec<Float>,
    /// Stage time offsets of the published tableau.
    pub alpha: Vec<Float>,
    /// Per-stage γ_i; `gamma[0]` is the stage-matrix diagonal.
    pub gamma: Vec<Float>,
    /// Order used in the step-size exponent E^(−1/order).
    pub estimator_of_local_order: Float,
    /// Whether stage i needs a fresh forcing evaluation; when false the
    /// previous stage's forcing is reused (its stage state is identical).
    pub new_function_evaluation: Vec<bool>,

    /// Absolute tolerance, scalar or one per species (in system order).
    #[builder(default = Tolerance::Scalar(1.0e-12), into)]
    pub abs_tol: Tolerance,
    /// Relative tolerance.
    #[builder(default = 1.0e-4)]
    pub rel_tol: Float,
    /// Initial step size; 0 selects a small default.
    #[builder(default = 0.0)]
    pub h_start: Float,
    /// Minimum step size; going below it is fatal.
    #[builder(default = 0.0)]
    pub h_min: Float,
    /// Maximum step size; 0 means the full interval.
    #[builder(default = 0.0)]
    pub h_max: Float,
    /// Lower bound on h_new/h.
    #[builder(default = 0.2)]
    pub h_factor_min: Float,
    /// Upper bound on h_new/h after an accepted step.
    #[builder(default = 6.0)]
    pub h_factor_max: Float,
    /// Extra shrink factor applied from the second consecutive rejection.
    #[builder(default = 0.1)]
    pub h_factor_reject: Float,
    /// Safety factor in the step-size prediction.
    #[builder(default = 0.9)]
    pub safety_factor: Float,
    /// Maximum number of step attempts per `solve` call.
    #[builder(default = 10_000)]
    pub max_steps: usize,
    /// Consecutive rejections allowed before the step fails for good.
    #[builder(default = 5)]
    pub max_rejections: usize,
    /// Pivot magnitudes below this fail the factorization as singular.
    #[builder(default = 1.0e-30)]
    pub pivot_threshold: Float,
    /// Number of independent reaction cells integrated together.
    #[builder(default = 1)]
    pub number_of_cells: usize,
    /// Apply the diagonal-Markowitz reordering to the species ordering.
    #[builder(default = true)]
    pub reorder_state: bool,
}

impl RosenbrockParameters {
    /// 2-stage, order 2(1), L-stable (ROS2).
    pub fn two_stage() -> Self {
        let g: Float = 1.0 + 1.0 / std::f64::consts::SQRT_2;
        Self::builder()
            .stages(2)
            .a(vec![1.0 / g])
            .c(vec![-2.0 / g])
            .m(vec![3.0 / (2.0 * g), 1.0 / (2.0 * g)])
            .e(vec![1.0 / (2.0 * g), 1.0 / (2.0 * g)])
            .alpha(vec![0.0, 1.0])
            .gamma(vec![g, -g])
            .estimator_of_local_order(2.0)
            .new_function_evaluation(vec![true, true])
            .build()
    }

    /// 3-stage, order 3(2), L-stable (ROS3).
    pub fn three_stage() -> Self {
        Self::builder()
            .stages(3)
            .a(vec![1.0, 1.0, 0.0])
            .c(vec![
                -1.0156171083877702091975600115545,
                4.0759956452537699824805835358067,
                9.2076794298330791242156818474003,
            ])
            .m(vec![
                1.0,
                6.1697947043828245592553615689730,
                -0.42772256543218573326238373806514,
            ])
            .e(vec![
                0.5,
                -2.9079558716805469821718236208017,
                0.22354069897811569627360909276199,
            ])
            .alpha(vec![
                0.0,
                0.43586652150845899941601945119356,
                0.43586652150845899941601945119356,
            ])
            .gamma(vec![
                0.43586652150845899941601945119356,
                0.24291996454816804366592249683314,
                2.1851380027664058511513169485832,
            ])
            .estimator_of_local_order(3.0)
            .new_function_evaluation(vec![true, true, false])
            .build()
    }

    /// 4-stage, order 4(3), L-stable (ROS4).
    pub fn four_stage() -> Self {
        Self::builder()
            .stages(4)
            .a(vec![
                2.0,
                1.867943637803922,
                0.2344449711399156,
                1.867943637803922,
                0.2344449711399156,
                0.0,
            ])
            .c(vec![
                -7.137615036412310,
                2.580708087951457,
                0.6515950076447975,
                -2.137148994382534,
                -0.3214669691237626,
                -0.6949742501781779,
            ])
            .m(vec![
                2.255570073418735,
                0.2870493262186792,
                0.4353179431840180,
                1.093502252409163,
            ])
            .e(vec![
                -0.2815431932141155,
                -0.07276199124938920,
                -0.1082196201495311,
                -1.093502252409163,
            ])
            .alpha(vec![0.0, 1.145640000000000, 0.6552168638155900, 0.6552168638155900])
            .gamma(vec![
                0.5728200000000000,
                -1.769193891319233,
                0.7592633437920482,
                -0.1049021087100450,
            ])
            .estimator_of_local_order(4.0)
            .new_function_evaluation(vec![true, true, true, false])
            .build()
    }

    /// 4-stage, order 3(2), stiffly accurate (RODAS3).
    pub fn four_stage_differential_algebraic() -> Self {
        Self::builder()
            .stages(4)
            .a(vec![0.0, 2.0, 0.0, 2.0, 0.0, 1.0])
            .c(vec![4.0, 1.0, -1.0, 1.0, -1.0, -8.0 / 3.0])
            .m(vec![2.0, 0.0, 1.0, 1.0])
            .e(vec![0.0, 0.0, 0.0, 1.0])
            .alpha(vec![0.0, 0.0, 1.0, 1.0])
            .gamma(vec![0.5, 1.5, 0.0, 0.0])
            .estimator_of_local_order(3.0)
            .new_function_evaluation(vec![true, false, true, true])
            .build()
    }

    /// 6-stage, order 4(3), stiffly accurate (RODAS4).
    pub fn six_stage_differential_algebraic() -> Self {
        Self::builder()
            .stages(6)
            .a(vec![
                1.544,
                0.9466785280815826,
                0.2557011698983284,
                3.314825187068521,
                2.896124015972201,
                0.9986419139977817,
                1.221224509226641,
                6.019134481288629,
                12.53708332932087,
                -0.6878860361058950,
                1.221224509226641,
                6.019134481288629,
                12.53708332932087,
                -0.6878860361058950,
                1.0,
            ])
            .c(vec![
                -5.6688,
                -2.430093356833875,
                -0.2063599157091915,
                -0.1073529058151375,
                -9.594562251023355,
                -20.47028614809616,
                7.496443313967647,
                -10.24680431464352,
                -33.99990352819905,
                11.70890893206160,
                8.083246795921522,
                -7.981132988064893,
                -31.52159432874371,
                16.31930543123136,
                -6.058818238906821,
            ])
            .m(vec![
                1.221224509226641,
                6.019134481288629,
                12.53708332932087,
                -0.6878860361058950,
                1.0,
                1.0,
            ])
            .e(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0])
            .alpha(vec![0.0, 0.386, 0.21, 0.63, 1.0, 1.0])
            .gamma(vec![0.25, -0.1043, 0.1035, -0.03620000000000023, 0.0, 0.0])
            .estimator_of_local_order(4.0)
            .new_function_evaluation(vec![true; 6])
            .build()
    }

    /// a_ij for stage i > j.
    pub(crate) fn a_at(&self, i: usize, j: usize) -> Float {
        self.a[i * (i - 1) / 2 + j]
    }

    /// c_ij for stage i > j.
    pub(crate) fn c_at(&self, i: usize, j: usize) -> Float {
        self.c[i * (i - 1) / 2 + j]
    }

    /// Validate table lengths and control ranges against `n_species`.
    pub(crate) fn validate(&self, n_species: usize) -> Result<(), Error> {
        let s = self.stages;
        let packed = s * (s - 1) / 2;
        let tables: [(&'static str, usize, usize); 6] = [
            ("a", self.a.len(), packed),
            ("c", self.c.len(), packed),
            ("m", self.m.len(), s),
            ("e", self.e.len(), s),
            ("alpha", self.alpha.len(), s),
            ("gamma", self.gamma.len(), s),
        ];
        for (name, len, expected) in tables {
            if len != expected {
                return Err(Error::BadParameterTable {
                    name,
                    len,
                    expected,
                });
            }
        }
        if self.new_function_evaluation.len() != s {
            return Err(Error::BadParameterTable {
                name: "new_function_evaluation",
                len: self.new_function_evaluation.len(),
                expected: s,
            });
        }
        if self.max_steps == 0 {
            return Err(Error::MaxStepsMustBePositive);
        }
        if !(0.0 < self.safety_factor && self.safety_factor < 1.0) {
            return Err(Error::SafetyFactorOutOfRange(self.safety_factor));
        }
        if !(0.0 < self.h_factor_min && self.h_factor_min <= self.h_factor_max) {
            return Err(Error::InvalidStepFactors(
                self.h_factor_min,
                self.h_factor_max,
            ));
        }
        if let Tolerance::Vector(v) = &self.abs_tol {
            if v.len() != n_species {
                return Err(Error::BadToleranceLength {
                    len: v.len(),
                    expected: n_species,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn published_sets_are_consistently_sized() {
        for params in [
            RosenbrockParameters::two_stage(),
            RosenbrockParameters::three_stage(),
            RosenbrockParameters::four_stage(),
            RosenbrockParameters::four_stage_differential_algebraic(),
            RosenbrockParameters::six_stage_differential_algebraic(),
        ] {
            params.validate(1).unwrap();
            assert_eq!(params.a.len(), params.stages * (params.stages - 1) / 2);
            assert!(params.gamma[0] > 0.0);
        }
    }

    #[test]
    fn packed_triangular_indexing() {
        let params = RosenbrockParameters::four_stage();
        assert_relative_eq!(params.a_at(1, 0), 2.0);
        assert_relative_eq!(params.a_at(2, 0), 1.867943637803922);
        assert_relative_eq!(params.a_at(2, 1), 0.2344449711399156);
        assert_relative_eq!(params.a_at(3, 2), 0.0);
        assert_relative_eq!(params.c_at(3, 0), -2.137148994382534);
    }

    #[test]
    fn two_stage_set_reproduces_its_closed_form() {
        let g: Float = 1.0 + 1.0 / std::f64::consts::SQRT_2;
        let params = RosenbrockParameters::two_stage();
        assert_relative_eq!(params.m[0], 3.0 / (2.0 * g));
        assert_relative_eq!(params.m[1], 1.0 / (2.0 * g));
        assert_relative_eq!(params.gamma[1], -g);
    }

    #[test]
    fn validation_catches_bad_tables() {
        let mut params = RosenbrockParameters::three_stage();
        params.m.pop();
        assert!(matches!(
            params.validate(1),
            Err(Error::BadParameterTable { name: "m", .. })
        ));

        let mut params = RosenbrockParameters::three_stage();
        params.abs_tol = Tolerance::Vector(vec![1.0e-12; 4]);
        assert!(matches!(
            params.validate(3),
            Err(Error::BadToleranceLength { len: 4, expected: 3 })
        ));

        let mut params = RosenbrockParameters::three_stage();
        params.safety_factor = 1.2;
        assert_eq!(
            params.validate(1),
            Err(Error::SafetyFactorOutOfRange(1.2))
        );
    }
}
