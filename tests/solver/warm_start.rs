//! Tests for warm starts.

use huwacb_rs::{Huwacb, HuwacbResult, Penalty, WarmStart};
use ndarray::{concatenate, Axis};

use crate::test_helpers::{max_abs_diff, tent_scene, TentScene};

fn converged(scene: &TentScene) -> HuwacbResult {
    let result = Huwacb::new()
        .with_tol(1e-6)
        .with_max_iterations(20000)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();
    assert!(result.success, "{}", result);
    result
}

#[test]
fn test_resolve_from_solution_stops_immediately() {
    let scene = tent_scene();
    let first = converged(&scene);

    let second = Huwacb::new()
        .with_tol(1e-6)
        .with_rho(first.rho.clone())
        .with_rhov(first.rhov.clone())
        .with_warm_start(WarmStart::Full {
            x0: first.abundance.clone(),
            z0: first.background_coefficients.clone(),
            r0: first.residual.clone(),
            d0: first.dual.clone(),
        })
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    assert!(second.success, "{}", second);
    assert!(second.iterations <= 10, "took {} iterations", second.iterations);
    assert!(max_abs_diff(&first.abundance, &second.abundance) < 1e-4);
    assert!(max_abs_diff(&first.residual, &second.residual) < 1e-4);
}

#[test]
fn test_background_warm_start_recovers_coefficients() {
    let scene = tent_scene();
    let first = converged(&scene);

    let second = Huwacb::new()
        .with_tol(1e-6)
        .with_rho(first.rho.clone())
        .with_rhov(first.rhov.clone())
        .with_warm_start(WarmStart::Background {
            x0: first.abundance.clone(),
            b0: first.background(),
            r0: first.residual.clone(),
            d0: first.dual.clone(),
        })
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    assert!(second.success, "{}", second);
    assert!(second.iterations <= 10, "took {} iterations", second.iterations);
    assert!(max_abs_diff(&first.background_coefficients, &second.background_coefficients) < 1e-4);
}

#[test]
fn test_single_column_blocks_are_broadcast() {
    let scene = tent_scene();
    let first = converged(&scene);

    let y = concatenate![Axis(1), scene.y, scene.y, scene.y];
    let result = Huwacb::new()
        .with_tol(1e-6)
        .with_max_iterations(20000)
        .with_rho(Penalty::Scalar(first.rho[0]))
        .with_rhov(first.rhov.clone())
        .with_warm_start(WarmStart::Full {
            x0: first.abundance.clone(),
            z0: first.background_coefficients.clone(),
            r0: first.residual.clone(),
            d0: first.dual.clone(),
        })
        .solve(&scene.a, &y, &scene.wv)
        .unwrap();

    assert!(result.success, "{}", result);
    assert_eq!(result.abundance.dim(), (2, 3));
    for j in 0..3 {
        let col = result.abundance.column(j).to_owned().insert_axis(Axis(1));
        assert!(max_abs_diff(&col, &first.abundance) < 1e-3);
    }
}
