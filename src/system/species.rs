//! A single chemical species.

use bon::Builder;

use crate::Float;

/// One chemical species, identified by name.
///
/// The initial concentration seeds the `variables` column of a fresh
/// [`crate::solver::State`]; it defaults to zero.
#[derive(Builder, Clone, Debug, PartialEq)]
pub struct Species {
    /// Unique name within a system.
    #[builder(into)]
    pub name: String,
    /// Concentration written into fresh states [mol m⁻³].
    #[builder(default = 0.0)]
    pub initial_concentration: Float,
}

impl Species {
    /// A species with the given name and zero initial concentration.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            initial_concentration: 0.0,
        }
    }
}

impl From<&str> for Species {
    fn from(name: &str) -> Self {
        Species::named(name)
    }
}
