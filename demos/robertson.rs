//! The Robertson problem, the classic stiff kinetics benchmark.

use stiffchem::prelude::*;

fn main() {
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

    let mut parameters = RosenbrockParameters::four_stage_differential_algebraic();
    parameters.rel_tol = 1.0e-8;
    parameters.abs_tol = Tolerance::Scalar(1.0e-14);
    parameters.max_steps = 100_000;
    let mut solver: RosenbrockSolver =
        RosenbrockSolver::new(system, processes, parameters).unwrap();

    let mut state = solver.get_state();
    solver.update_state(&mut state).unwrap();

    println!("      t           A             B             C");
    let mut t = 0.0;
    for decade in 0..6 {
        let t_next = 10.0_f64.powi(decade - 1);
        let result = solver.solve(&mut state, t, t_next).unwrap();
        if !result.succeeded() {
            println!("integration failed: {:?}", result.status);
            return;
        }
        t = t_next;
        let y: Vec<Float> = ["A", "B", "C"]
            .iter()
            .map(|name| state.variables[(0, state.variable_map[*name])])
            .collect();
        println!(
            "{t:10.1e}   {:.6e}  {:.6e}  {:.6e}   ({} steps, {} rejected)",
            y[0], y[1], y[2], result.stats.accepted, result.stats.rejected
        );
    }
}
