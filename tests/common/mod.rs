//! Shared test mechanisms and hand-coded references.

#![allow(dead_code)]

use stiffchem::prelude::*;

/// Boltzmann constant [J K⁻¹].
pub const BOLTZMANN: Float = 1.380649e-23;

/// Air number density [molecule cm⁻³] for the given conditions; the
/// Chapman rate constants below carry cm-based units.
pub fn air_number_density(temperature: Float, pressure: Float) -> Float {
    pressure / (BOLTZMANN * temperature) * 1.0e-6
}

/// Reference species ordering used by the hand-coded Chapman functions.
pub const REF_SPECIES: [&str; 6] = ["M", "N2", "O", "O1D", "O2", "O3"];

/// The Chapman stratospheric mechanism:
///
/// ```text
/// O2 + hv -> 2 O             j1
/// O3 + hv -> O1D + O2        j2
/// O3 + hv -> O + O2          j3
/// O1D + N2 -> O + N2         2.15e-11 · exp(110/T)
/// O1D + O2 -> O + O2         3.3e-11 · exp(55/T)
/// O + O3 -> 2 O2             8e-12 · exp(-2060/T)
/// O + O2 + M -> O3 + M       6e-34 · (T/300)^-2.4
/// ```
pub fn chapman_system() -> (System, Vec<Process>) {
    let m = Species::named("M");
    let n2 = Species::named("N2");
    let o = Species::named("O");
    let o1d = Species::named("O1D");
    let o2 = Species::named("O2");
    let o3 = Species::named("O3");

    let photolysis =
        || RateConstant::photolysis(PhotolysisParameters::builder().build());
    let arrhenius = |a: Float, b: Float, c: Float| {
        RateConstant::arrhenius(ArrheniusParameters::builder().a(a).b(b).c(c).build())
    };

    let processes = vec![
        Process::builder()
            .reactants(vec![o2.clone()])
            .products(vec![(o.clone(), 2.0)])
            .rate_constant(photolysis())
            .build(),
        Process::builder()
            .reactants(vec![o3.clone()])
            .products(vec![(o1d.clone(), 1.0), (o2.clone(), 1.0)])
            .rate_constant(photolysis())
            .build(),
        Process::builder()
            .reactants(vec![o3.clone()])
            .products(vec![(o.clone(), 1.0), (o2.clone(), 1.0)])
            .rate_constant(photolysis())
            .build(),
        Process::builder()
            .reactants(vec![o1d.clone(), n2.clone()])
            .products(vec![(o.clone(), 1.0), (n2.clone(), 1.0)])
            .rate_constant(arrhenius(2.15e-11, 0.0, 110.0))
            .build(),
        Process::builder()
            .reactants(vec![o1d.clone(), o2.clone()])
            .products(vec![(o.clone(), 1.0), (o2.clone(), 1.0)])
            .rate_constant(arrhenius(3.3e-11, 0.0, 55.0))
            .build(),
        Process::builder()
            .reactants(vec![o.clone(), o3.clone()])
            .products(vec![(o2.clone(), 2.0)])
            .rate_constant(arrhenius(8.0e-12, 0.0, -2060.0))
            .build(),
        Process::builder()
            .reactants(vec![o.clone(), o2.clone(), m.clone()])
            .products(vec![(o3.clone(), 1.0), (m.clone(), 1.0)])
            .rate_constant(arrhenius(6.0e-34, -2.4, 0.0))
            .build(),
    ];

    let system = System::new(vec![m, n2, o, o1d, o2, o3]).unwrap();
    (system, processes)
}

/// Hand-coded Chapman rate constants for one cell.
pub fn reference_rate_constants(temperature: Float, photo_rates: [Float; 3]) -> [Float; 7] {
    [
        photo_rates[0],
        photo_rates[1],
        photo_rates[2],
        2.15e-11 * (110.0 / temperature).exp(),
        3.3e-11 * (55.0 / temperature).exp(),
        8.0e-12 * (-2060.0 / temperature).exp(),
        6.0e-34 * (temperature / 300.0).powf(-2.4),
    ]
}

/// Hand-coded Chapman forcing for one cell, in [`REF_SPECIES`] order.
pub fn reference_forcing(k: &[Float; 7], y: &[Float; 6]) -> [Float; 6] {
    let [m, n2, o, o1d, o2, o3] = *y;
    let r0 = k[0] * o2;
    let r1 = k[1] * o3;
    let r2 = k[2] * o3;
    let r3 = k[3] * o1d * n2;
    let r4 = k[4] * o1d * o2;
    let r5 = k[5] * o * o3;
    let r6 = k[6] * o * o2 * m;
    [
        0.0,
        0.0,
        2.0 * r0 + r2 + r3 + r4 - r5 - r6,
        r1 - r3 - r4,
        -r0 + r1 + r2 + 2.0 * r5 - r6,
        -r1 - r2 - r5 + r6,
    ]
}

/// The Robertson problem as a reaction network:
///
/// ```text
/// A -> B           0.04
/// B + C -> A + C   1.0e4
/// 2 B -> B + C     3.0e7
/// ```
pub fn robertson_system() -> (System, Vec<Process>) {
    let a = Species::builder().name("A").initial_concentration(1.0).build();
    let b = Species::named("B");
    let c = Species::named("C");
    let rate = |value: Float| {
        RateConstant::arrhenius(ArrheniusParameters::builder().a(value).build())
    };
    let processes = vec![
        Process::builder()
            .reactants(vec![a.clone()])
            .products(vec![(b.clone(), 1.0)])
            .rate_constant(rate(0.04))
            .build(),
        Process::builder()
            .reactants(vec![b.clone(), c.clone()])
            .products(vec![(a.clone(), 1.0), (c.clone(), 1.0)])
            .rate_constant(rate(1.0e4))
            .build(),
        Process::builder()
            .reactants(vec![b.clone(), b.clone()])
            .products(vec![(b.clone(), 1.0), (c.clone(), 1.0)])
            .rate_constant(rate(3.0e7))
            .build(),
    ];
    let system = System::new(vec![a, b, c]).unwrap();
    (system, processes)
}
