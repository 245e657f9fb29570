//! Regression tests against a hand-coded Chapman reference.

mod common;

use common::{
    air_number_density, chapman_system, reference_forcing, reference_rate_constants, REF_SPECIES,
};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use stiffchem::prelude::*;

const CELL_CONDITIONS: [(Float, Float); 3] =
    [(284.19, 101245.0), (215.02, 100789.2), (299.31, 101398.0)];
const PHOTO_RATES: [Float; 3] = [1.0e-4, 1.0e-5, 1.0e-6];

fn chapman_solver(cells: usize) -> RosenbrockSolver {
    let (system, processes) = chapman_system();
    let mut parameters = RosenbrockParameters::three_stage();
    parameters.number_of_cells = cells;
    RosenbrockSolver::new(system, processes, parameters).unwrap()
}

fn configured_state(solver: &RosenbrockSolver, cells: usize) -> State {
    let mut state = solver.get_state();
    for cell in 0..cells {
        let (temperature, pressure) = CELL_CONDITIONS[cell];
        state.conditions[cell] = Conditions {
            temperature,
            pressure,
            air_density: air_number_density(temperature, pressure),
        };
        state.set_custom_rate_parameters(cell, &PHOTO_RATES).unwrap();
    }
    state
}

#[test]
fn batched_rate_constants_equal_the_single_cell_evaluation() {
    let solver = chapman_solver(3);
    let mut state = configured_state(&solver, 3);
    solver.update_state(&mut state).unwrap();

    let single = chapman_solver(1);
    for cell in 0..3 {
        let mut single_state = single.get_state();
        single_state.conditions[0] = state.conditions[cell];
        single_state
            .set_custom_rate_parameters(0, &PHOTO_RATES)
            .unwrap();
        single.update_state(&mut single_state).unwrap();

        assert_eq!(
            state.rate_constants.row(cell),
            single_state.rate_constants.row(0),
            "cell {cell}"
        );
    }
}

#[test]
fn rate_constants_match_the_reference_formulas() {
    let solver = chapman_solver(3);
    let mut state = configured_state(&solver, 3);
    solver.update_state(&mut state).unwrap();

    for cell in 0..3 {
        let expected =
            reference_rate_constants(CELL_CONDITIONS[cell].0, PHOTO_RATES);
        for (process, &reference) in expected.iter().enumerate() {
            let a = state.rate_constants[(cell, process)];
            let tolerance = (a.abs() + reference.abs()) * 1.0e-8 + 1.0e-12;
            assert!(
                (a - reference).abs() <= tolerance,
                "cell {cell}, process {process}: {a} vs {reference}"
            );
        }
    }
}

#[test]
fn forcing_matches_the_reference_expansion() {
    let solver = chapman_solver(3);
    let state = configured_state(&solver, 3);
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    // Log-uniform concentrations and rate constants over several decades.
    let mut variables = DenseMatrix::zeros(3, 6);
    for value in variables.as_mut_slice() {
        *value = rng.gen_range(-2.0_f64..2.0).exp();
    }
    let mut rate_constants = DenseMatrix::zeros(3, 7);
    for value in rate_constants.as_mut_slice() {
        *value = rng.gen_range(-2.0_f64..2.0).exp();
    }

    let mut forcing = DenseMatrix::zeros(3, 6);
    solver
        .calculate_forcing(&rate_constants, &variables, &mut forcing)
        .unwrap();

    for cell in 0..3 {
        let mut k = [0.0; 7];
        k.copy_from_slice(rate_constants.row(cell));
        let mut y = [0.0; 6];
        for (slot, name) in REF_SPECIES.iter().enumerate() {
            y[slot] = variables[(cell, state.variable_map[*name])];
        }
        let expected = reference_forcing(&k, &y);
        for (slot, name) in REF_SPECIES.iter().enumerate() {
            let a = forcing[(cell, state.variable_map[*name])];
            let b = expected[slot];
            let tolerance = (a.abs() + b.abs()) * 1.0e-8 + 1.0e-12;
            assert!(
                (a - b).abs() <= tolerance,
                "cell {cell}, species {name}: {a} vs {b}"
            );
        }
    }
}

#[test]
fn ozone_grows_monotonically_from_photolysis_of_oxygen() {
    let mut solver = chapman_solver(1);
    let mut state = configured_state(&solver, 1);
    let rho = state.conditions[0].air_density;
    state.set_uniform_concentration("M", rho).unwrap();
    state.set_uniform_concentration("N2", 0.79 * rho).unwrap();
    state.set_uniform_concentration("O2", 0.21 * rho).unwrap();
    state.set_uniform_concentration("O3", 1.0e-8 * rho).unwrap();
    solver.update_state(&mut state).unwrap();

    let o3 = state.variable_map["O3"];
    let mut previous = state.variables[(0, o3)];
    let mut t = 0.0;
    for _ in 0..60 {
        let result = solver.solve(&mut state, t, t + 1.0).unwrap();
        assert!(result.succeeded(), "failed at t = {t}: {:?}", result.status);
        t += 1.0;
        let current = state.variables[(0, o3)];
        assert!(
            current >= previous * (1.0 - 1.0e-9),
            "ozone dropped at t = {t}: {previous} -> {current}"
        );
        previous = current;
        for &value in state.variables.row(0) {
            assert!(value >= 0.0);
        }
    }
    assert!(previous > 1.0e-8 * rho);

    // Rate constants are untouched by the integration.
    let expected = reference_rate_constants(CELL_CONDITIONS[0].0, PHOTO_RATES);
    for (process, &reference) in expected.iter().enumerate() {
        let a = state.rate_constants[(0, process)];
        let tolerance = (a.abs() + reference.abs()) * 1.0e-8 + 1.0e-12;
        assert!((a - reference).abs() <= tolerance);
    }
}

#[test]
fn interleaved_storage_reproduces_the_block_solution() {
    let (system, processes) = chapman_system();
    let mut parameters = RosenbrockParameters::three_stage();
    parameters.number_of_cells = 3;
    let mut block: RosenbrockSolver<BlockOrdering> =
        RosenbrockSolver::new(system, processes, parameters).unwrap();

    let (system, processes) = chapman_system();
    let mut parameters = RosenbrockParameters::three_stage();
    parameters.number_of_cells = 3;
    let mut interleaved: RosenbrockSolver<InterleavedOrdering<4>> =
        RosenbrockSolver::new(system, processes, parameters).unwrap();

    let mut block_state = configured_state(&block, 3);
    let mut interleaved_state = {
        let mut state = interleaved.get_state();
        for cell in 0..3 {
            state.conditions[cell] = block_state.conditions[cell];
            state.set_custom_rate_parameters(cell, &PHOTO_RATES).unwrap();
        }
        state
    };
    for state in [&mut block_state, &mut interleaved_state] {
        let rho = state.conditions[0].air_density;
        state.set_uniform_concentration("M", rho).unwrap();
        state.set_uniform_concentration("N2", 0.79 * rho).unwrap();
        state.set_uniform_concentration("O2", 0.21 * rho).unwrap();
        state.set_uniform_concentration("O3", 1.0e-8 * rho).unwrap();
    }
    block.update_state(&mut block_state).unwrap();
    interleaved.update_state(&mut interleaved_state).unwrap();

    assert!(block.solve(&mut block_state, 0.0, 10.0).unwrap().succeeded());
    assert!(interleaved
        .solve(&mut interleaved_state, 0.0, 10.0)
        .unwrap()
        .succeeded());

    for cell in 0..3 {
        for name in REF_SPECIES {
            let a = block_state.variables[(cell, block_state.variable_map[name])];
            let b = interleaved_state.variables
                [(cell, interleaved_state.variable_map[name])];
            let tolerance = (a.abs() + b.abs()) * 1.0e-10 + 1.0e-30;
            assert!(
                (a - b).abs() <= tolerance,
                "cell {cell}, species {name}: {a} vs {b}"
            );
        }
    }
}
