//! Tests for the adaptive penalties.

use huwacb_rs::admm::penalty::COORDINATE_ADAPT_CUTOFF;
use huwacb_rs::Huwacb;

use crate::test_helpers::{max_abs_diff, synthetic_scene, tent_scene};

#[test]
fn test_every_rhov_change_refactors_once() {
    let scene = synthetic_scene(3, 24, 4, 5);

    let result = Huwacb::new()
        .with_tol(1e-7)
        .with_max_iterations(800)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    let changed = result.history.iter().filter(|r| r.rhov_updates > 0).count();
    assert_eq!(result.refactorizations, changed);
    assert_eq!(result.report().refactorizations, changed);
}

#[test]
fn test_coordinate_penalty_frozen_after_cutoff() {
    let scene = synthetic_scene(5, 24, 4, 5);

    let result = Huwacb::new()
        .with_tol(1e-12)
        .with_max_iterations(700)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    assert!(result.history.last().unwrap().iteration > COORDINATE_ADAPT_CUTOFF);
    for record in &result.history {
        if record.iteration >= COORDINATE_ADAPT_CUTOFF {
            assert_eq!(record.rhov_updates, 0, "Rhov changed at iteration {}", record.iteration);
        }
    }
}

#[test]
fn test_checkpoint_cadence() {
    let scene = synthetic_scene(5, 12, 2, 2);

    let result = Huwacb::new()
        .with_tol(1e-12)
        .with_max_iterations(45)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    let iterations: Vec<usize> = result.history.iter().map(|r| r.iteration).collect();
    assert_eq!(iterations, vec![1, 10, 20, 30, 40]);
}

#[test]
fn test_small_rho_is_raised() {
    let scene = tent_scene();

    let result = Huwacb::new()
        .with_rho(1e-4)
        .with_max_iterations(20000)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    assert!(result.history.iter().any(|r| r.rho_updates > 0));
    assert!(result.rho[0] > 1e-4);
}

#[test]
fn test_solution_does_not_depend_on_initial_penalty() {
    let scene = tent_scene();

    let solve = |rho: f64| {
        let result = Huwacb::new()
            .with_rho(rho)
            .with_tol(1e-6)
            .with_max_iterations(20000)
            .solve(&scene.a, &scene.y, &scene.wv)
            .unwrap();
        assert!(result.success, "rho = {}: {}", rho, result);
        result
    };

    let low = solve(1e-3);
    let high = solve(10.0);

    assert!(max_abs_diff(&low.abundance, &high.abundance) < 1e-2);
    assert!(max_abs_diff(&low.residual, &high.residual) < 1e-2);
    assert!(max_abs_diff(&low.background(), &high.background()) < 1e-2);
}
