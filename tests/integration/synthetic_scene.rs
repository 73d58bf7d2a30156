//! Larger reproducible scenes with many samples solved jointly.

use huwacb_rs::admm::penalty::COORDINATE_ADAPT_CUTOFF;
use huwacb_rs::Huwacb;

use crate::test_helpers::{frobenius, init_logging, max_second_difference, synthetic_scene};

#[test]
fn test_scene_decomposition() {
    init_logging();
    let scene = synthetic_scene(42, 40, 5, 12);

    let result = Huwacb::new()
        .with_lambda_a(1e-3)
        .with_max_iterations(20000)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    assert!(result.success, "{}", result);
    assert_eq!(result.abundance.dim(), scene.abundance.dim());
    assert_eq!(result.rho.len(), 12);
    assert_eq!(result.rhov.len(), 5 + 2 * 40);

    assert!(result.abundance.iter().all(|x| *x >= 0.0));
    assert!(max_second_difference(&result.background()) <= 1e-10);

    let fit = result.fitted(&scene.a).unwrap() + &result.residual;
    let relative = frobenius(&(&fit - &scene.y)) / frobenius(&scene.y);
    assert!(relative < 1e-2, "relative misfit {}", relative);

    let report = serde_json::to_string(&result.report()).unwrap();
    assert!(report.contains("Converged"));
}

#[test]
fn test_parallel_matches_sequential() {
    // 85 coordinates x 200 samples is above the parallel threshold
    let scene = synthetic_scene(9, 40, 5, 200);

    let run = |parallel: bool| {
        Huwacb::new()
            .with_parallel(parallel)
            .with_max_iterations(120)
            .solve(&scene.a, &scene.y, &scene.wv)
            .unwrap()
    };
    let sequential = run(false);
    let parallel = run(true);

    assert_eq!(sequential.iterations, parallel.iterations);
    assert_eq!(sequential.abundance, parallel.abundance);
    assert_eq!(sequential.background_coefficients, parallel.background_coefficients);
    assert_eq!(sequential.rho, parallel.rho);
    assert_eq!(sequential.rhov, parallel.rhov);
}

#[test]
fn test_many_bands_converge() {
    init_logging();
    let scene = synthetic_scene(17, 200, 10, 4);

    let result = Huwacb::new()
        .with_tol(1e-6)
        .with_max_iterations(20000)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    assert!(result.success, "{}", result);
    assert!(result.refactorizations > 0);
    assert!(result.abundance.iter().all(|x| *x >= 0.0));
    assert!(max_second_difference(&result.background()) <= 1e-10);
}

#[test]
fn test_many_bands_through_penalty_cutoff() {
    // Tolerance out of reach so the coordinate penalty adapts until the cutoff
    for (seed, n_bands) in [(17, 200), (23, 300)] {
        let scene = synthetic_scene(seed, n_bands, 10, 4);

        let result = Huwacb::new()
            .with_tol(1e-12)
            .with_max_iterations(COORDINATE_ADAPT_CUTOFF + 100)
            .solve(&scene.a, &scene.y, &scene.wv)
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.iterations, COORDINATE_ADAPT_CUTOFF + 100);
        assert!(result.history.last().unwrap().iteration > COORDINATE_ADAPT_CUTOFF);
        assert!(result.refactorizations > 0, "Rhov never adapted for {} bands", n_bands);
    }
}
