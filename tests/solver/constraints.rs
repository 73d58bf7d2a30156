//! Tests for the constraints every solution must satisfy.

use huwacb_rs::admm::TAU1;
use huwacb_rs::{Huwacb, HuwacbResult};
use ndarray::{Array2, Axis};

use crate::test_helpers::{frobenius, init_logging, max_second_difference, synthetic_scene, tent_scene};

/// `||A x + C z + r − y||_F` can never exceed `||T||_F · res_p`.
fn assert_feasible(result: &HuwacbResult, a: &Array2<f64>, y: &Array2<f64>) {
    let fit = result.fitted(a).unwrap() + &result.residual;
    let gap = frobenius(&(&fit - y));

    let n_bands = y.nrows() as f64;
    let t_norm = (frobenius(a).powi(2) + frobenius(&result.concave_basis).powi(2) + n_bands * TAU1 * TAU1).sqrt();
    assert!(
        gap <= t_norm * result.res_p + 1e-8,
        "constraint gap {} exceeds {} * {}",
        gap,
        t_norm,
        result.res_p
    );
}

#[test]
fn test_converged_solution_is_feasible() {
    init_logging();
    let scene = synthetic_scene(7, 20, 3, 4);

    let result = Huwacb::new()
        .with_max_iterations(20000)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    assert!(result.success, "{}", result);
    assert!(result.res_p < result.stopping.tol_p);
    assert!(result.res_d < result.stopping.tol_d);
    assert_feasible(&result, &scene.a, &scene.y);
}

#[test]
fn test_bounds_hold_at_every_budget() {
    let scene = synthetic_scene(11, 16, 4, 3);

    for max_iterations in [1, 9, 10, 57, 400] {
        let result = Huwacb::new()
            .with_max_iterations(max_iterations)
            .solve(&scene.a, &scene.y, &scene.wv)
            .unwrap();
        assert!(result.iterations <= max_iterations);
        if !result.success {
            assert_eq!(result.iterations, max_iterations);
        }

        assert!(result.abundance.iter().all(|x| *x >= 0.0));

        let l = result.background_coefficients.nrows();
        let interior = result.background_coefficients.slice(ndarray::s![1..l - 1, ..]);
        assert!(interior.iter().all(|z| *z >= 0.0));

        // Uniform grid: a concave background has nonpositive second differences
        assert!(max_second_difference(&result.background()) <= 1e-10);

        assert_feasible(&result, &scene.a, &scene.y);
    }
}

#[test]
fn test_sparsity_grows_with_lambda() {
    let scene = tent_scene();

    let counts: Vec<usize> = [0.0, 5.0, 50.0]
        .iter()
        .map(|&lambda| {
            let result = Huwacb::new()
                .with_lambda_a(lambda)
                .with_max_iterations(20000)
                .solve(&scene.a, &scene.y, &scene.wv)
                .unwrap();
            assert!(result.success, "lambda = {}: {}", lambda, result);
            result.abundance.iter().filter(|x| **x > 1e-6).count()
        })
        .collect();

    assert!(counts[0] >= counts[1] && counts[1] >= counts[2], "{:?}", counts);
    assert!(counts[0] > 0);
    assert_eq!(counts[2], 0);
}

#[test]
fn test_empty_dictionary_fits_background_and_residual() {
    let scene = tent_scene();
    let a = Array2::<f64>::zeros((5, 0));
    let y = scene.drift.clone().insert_axis(Axis(1));

    let result = Huwacb::new()
        .with_max_iterations(20000)
        .solve(&a, &y, &scene.wv)
        .unwrap();

    assert!(result.success, "{}", result);
    assert_eq!(result.abundance.dim(), (0, 1));
    assert_eq!(result.fitted(&a).unwrap(), result.background());
    assert_feasible(&result, &a, &y);

    // A linear drift is itself concave, so nothing is left for the residual
    assert!(result.residual.iter().all(|r| r.abs() < 1e-2));
}
