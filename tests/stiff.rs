//! Stepper behavior on stiff and degenerate problems.

mod common;

use common::robertson_system;
use stiffchem::prelude::*;

fn robertson_solver(parameters: RosenbrockParameters) -> RosenbrockSolver {
    let (system, processes) = robertson_system();
    RosenbrockSolver::new(system, processes, parameters).unwrap()
}

#[test]
fn robertson_rejects_steps_and_stays_non_negative() {
    let mut parameters = RosenbrockParameters::three_stage();
    parameters.rel_tol = 1.0e-8;
    parameters.abs_tol = Tolerance::Scalar(1.0e-14);
    parameters.max_steps = 100_000;
    let mut solver = robertson_solver(parameters);
    let mut state = solver.get_state();
    solver.update_state(&mut state).unwrap();

    let result = solver.solve(&mut state, 0.0, 500.0).unwrap();
    assert!(result.succeeded(), "{:?}", result.status);
    assert!(
        result.stats.rejected >= 1,
        "expected at least one rejected step, stats: {:?}",
        result.stats
    );
    assert_eq!(
        result.stats.steps,
        result.stats.accepted + result.stats.rejected
    );

    let a = state.variables[(0, state.variable_map["A"])];
    let b = state.variables[(0, state.variable_map["B"])];
    let c = state.variables[(0, state.variable_map["C"])];
    for value in [a, b, c] {
        assert!(value >= 0.0);
    }
    // Mass is conserved by the network.
    assert!((a + b + c - 1.0).abs() < 1.0e-6, "mass drift: {}", a + b + c);
    // B sits on its small quasi-steady plateau well before t = 500.
    assert!(b > 0.0 && b < 1.0e-4, "B = {b}");
    assert!(a < 1.0, "A should have decayed below its initial value");
}

#[test]
fn rejected_first_step_leaves_time_and_state_untouched() {
    // Exponential growth with a hopeless first step and no rejection
    // budget: the only possible outcome is an immediate failure that
    // must not have advanced anything.
    let x = Species::builder().name("X").initial_concentration(1.0).build();
    let system = System::new(vec![x.clone()]).unwrap();
    let growth = Process::builder()
        .reactants(vec![x.clone()])
        .products(vec![(x, 2.0)])
        .rate_constant(RateConstant::arrhenius(
            ArrheniusParameters::builder().a(10.0).build(),
        ))
        .build();
    let mut parameters = RosenbrockParameters::three_stage();
    parameters.h_start = 5.0;
    parameters.rel_tol = 1.0e-10;
    parameters.max_rejections = 0;
    let mut solver: RosenbrockSolver =
        RosenbrockSolver::new(system, vec![growth], parameters).unwrap();
    let mut state = solver.get_state();
    solver.update_state(&mut state).unwrap();

    let before = state.variables.clone();
    let result = solver.solve(&mut state, 0.0, 10.0).unwrap();
    assert_eq!(result.status, SolverStatus::StepSizeTooSmall);
    assert_eq!(result.t_reached, 0.0);
    assert_eq!(result.stats.accepted, 0);
    assert_eq!(result.stats.rejected, 1);
    assert_eq!(state.variables, before);
}

#[test]
fn non_finite_forcing_fails_without_corrupting_the_state() {
    // B² overflows, so every forcing evaluation is infinite and no step
    // can ever be absorbed.
    let (system, processes) = robertson_system();
    let mut solver: RosenbrockSolver =
        RosenbrockSolver::new(system, processes, RosenbrockParameters::three_stage()).unwrap();
    let mut state = solver.get_state();
    state.set_uniform_concentration("B", 1.0e160).unwrap();
    solver.update_state(&mut state).unwrap();

    let before = state.variables.clone();
    let result = solver.solve(&mut state, 0.0, 1.0).unwrap();
    assert_eq!(result.status, SolverStatus::NonFiniteState);
    assert_eq!(result.t_reached, 0.0);
    assert_eq!(state.variables, before);
    assert!(result.stats.rejected >= 1);
}

#[test]
fn tightening_rtol_tightens_the_global_error() {
    let decay: Float = 0.3;
    let t_end: Float = 5.0;
    let exact: Float = (-decay * t_end).exp();

    let mut errors = Vec::new();
    for rel_tol in [1.0e-3, 1.0e-5, 1.0e-7] {
        let a = Species::builder().name("A").initial_concentration(1.0).build();
        let b = Species::named("B");
        let system = System::new(vec![a.clone(), b.clone()]).unwrap();
        let process = Process::builder()
            .reactants(vec![a])
            .products(vec![(b, 1.0)])
            .rate_constant(RateConstant::arrhenius(
                ArrheniusParameters::builder().a(decay).build(),
            ))
            .build();
        let mut parameters = RosenbrockParameters::three_stage();
        parameters.rel_tol = rel_tol;
        parameters.abs_tol = Tolerance::Scalar(1.0e-14);
        let mut solver: RosenbrockSolver =
            RosenbrockSolver::new(system, vec![process], parameters).unwrap();
        let mut state = solver.get_state();
        solver.update_state(&mut state).unwrap();
        let result = solver.solve(&mut state, 0.0, t_end).unwrap();
        assert!(result.succeeded());
        errors.push((state.variables[(0, state.variable_map["A"])] - exact).abs());
    }

    // Each hundredfold tolerance drop should cut the error by far more
    // than half; the exact ratio is controller-dependent.
    assert!(errors[1] < 0.5 * errors[0], "errors: {errors:?}");
    assert!(errors[2] < 0.5 * errors[1], "errors: {errors:?}");
    assert!(errors[2] < 1.0e-5, "errors: {errors:?}");
}

#[test]
fn six_stage_method_integrates_the_stiff_problem() {
    let mut parameters = RosenbrockParameters::six_stage_differential_algebraic();
    parameters.rel_tol = 1.0e-6;
    let mut solver = robertson_solver(parameters);
    let mut state = solver.get_state();
    solver.update_state(&mut state).unwrap();
    let result = solver.solve(&mut state, 0.0, 50.0).unwrap();
    assert!(result.succeeded(), "{:?}", result.status);
    let total: Float = state.variables.row(0).iter().sum();
    assert!((total - 1.0).abs() < 1.0e-5);
}

#[test]
fn four_stage_methods_agree_with_three_stage_on_robertson() {
    let reference_state = {
        let mut parameters = RosenbrockParameters::three_stage();
        parameters.rel_tol = 1.0e-8;
        parameters.abs_tol = Tolerance::Scalar(1.0e-14);
        let mut solver = robertson_solver(parameters);
        let mut state = solver.get_state();
        solver.update_state(&mut state).unwrap();
        assert!(solver.solve(&mut state, 0.0, 40.0).unwrap().succeeded());
        state
    };

    for parameters in [
        RosenbrockParameters::four_stage(),
        RosenbrockParameters::four_stage_differential_algebraic(),
    ] {
        let mut parameters = parameters;
        parameters.rel_tol = 1.0e-8;
        parameters.abs_tol = Tolerance::Scalar(1.0e-14);
        let mut solver = robertson_solver(parameters);
        let mut state = solver.get_state();
        solver.update_state(&mut state).unwrap();
        assert!(solver.solve(&mut state, 0.0, 40.0).unwrap().succeeded());

        for name in ["A", "B", "C"] {
            let a = state.variables[(0, state.variable_map[name])];
            let b = reference_state.variables[(0, reference_state.variable_map[name])];
            assert!(
                (a - b).abs() <= (a.abs() + b.abs()) * 1.0e-4 + 1.0e-10,
                "{name}: {a} vs {b}"
            );
        }
    }
}
