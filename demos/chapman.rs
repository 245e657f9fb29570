//! Chapman stratospheric ozone chemistry over a small batch of cells.

use stiffchem::prelude::*;

const BOLTZMANN: Float = 1.380649e-23;

fn main() {
    let m = Species::named("M");
    let n2 = Species::named("N2");
    let o = Species::named("O");
    let o1d = Species::named("O1D");
    let o2 = Species::named("O2");
    let o3 = Species::named("O3");

    let photolysis = || RateConstant::photolysis(PhotolysisParameters::builder().build());
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

    let cells = [(284.19, 101245.0), (215.02, 100789.2), (299.31, 101398.0)];
    let mut parameters = RosenbrockParameters::three_stage();
    parameters.number_of_cells = cells.len();
    let mut solver: RosenbrockSolver =
        RosenbrockSolver::new(system, processes, parameters).unwrap();

    let mut state = solver.get_state();
    for (cell, (temperature, pressure)) in cells.iter().enumerate() {
        // Number density in molecule cm^-3 to match the rate constants.
        let rho = pressure / (BOLTZMANN * temperature) * 1.0e-6;
        state.conditions[cell] = Conditions {
            temperature: *temperature,
            pressure: *pressure,
            air_density: rho,
        };
        state
            .set_custom_rate_parameters(cell, &[1.0e-4, 1.0e-5, 1.0e-6])
            .unwrap();
    }
    let rho0 = state.conditions[0].air_density;
    state.set_uniform_concentration("M", rho0).unwrap();
    state.set_uniform_concentration("N2", 0.79 * rho0).unwrap();
    state.set_uniform_concentration("O2", 0.21 * rho0).unwrap();
    state.set_uniform_concentration("O3", 1.0e-8 * rho0).unwrap();
    solver.update_state(&mut state).unwrap();

    let o3_column = state.variable_map["O3"];
    println!("t [s]   [O3] per cell [molecule cm^-3]");
    let mut t = 0.0;
    while t < 60.0 {
        let result = solver.solve(&mut state, t, t + 10.0).unwrap();
        if !result.succeeded() {
            println!("integration failed: {:?}", result.status);
            return;
        }
        t += 10.0;
        let o3_values: Vec<String> = (0..cells.len())
            .map(|cell| format!("{:.6e}", state.variables[(cell, o3_column)]))
            .collect();
        println!("{t:5.1}   {}", o3_values.join("  "));
    }
}
