//! Recovery of a known decomposition in the presence of an outlier.
//!
//! The five-band scene mixes one atom with unit abundance over a linear drift
//! and pushes the middle band down. A downward spike cannot be absorbed by a
//! concave background, so the L1 residual has to take it, and the abundance
//! and the drift come back untouched.

use huwacb_rs::{ConvergenceStatus, Huwacb, OptionValue, SolveOptions};
use ndarray::Axis;

use crate::test_helpers::{approx_eq, init_logging, tent_scene};

#[test]
fn test_spike_goes_to_residual() {
    init_logging();
    let scene = tent_scene();

    let result = Huwacb::new()
        .with_tol(1e-6)
        .with_max_iterations(20000)
        .with_verbose(true)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    assert!(result.success, "{}", result);
    assert_eq!(result.status, ConvergenceStatus::Converged);

    assert!(approx_eq(result.abundance[[0, 0]], 1.0, 1e-2), "{}", result.abundance);
    assert!(approx_eq(result.abundance[[1, 0]], 0.0, 1e-2), "{}", result.abundance);

    for (i, r) in result.residual.column(0).iter().enumerate() {
        let expected = if i == scene.spike_band { scene.spike } else { 0.0 };
        assert!(approx_eq(*r, expected, 1e-2), "band {}: {}", i, r);
    }

    let background = result.background().index_axis_move(Axis(1), 0);
    for (b, d) in background.iter().zip(scene.drift.iter()) {
        assert!(approx_eq(*b, *d, 1e-2), "{} vs {}", b, d);
    }
}

#[test]
fn test_same_result_through_name_value_options() {
    let scene = tent_scene();

    let options = SolveOptions::from_args(vec![
        "tol".into(),
        1e-6_f64.into(),
        "MAXITER".into(),
        OptionValue::Scalar(20000.0),
        "Lambda_A".into(),
        0.0_f64.into(),
        "verbose".into(),
        "no".into(),
    ])
    .unwrap();
    let by_name = Huwacb::with_options(options)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    let by_builder = Huwacb::new()
        .with_tol(1e-6)
        .with_max_iterations(20000)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();

    assert_eq!(by_name.iterations, by_builder.iterations);
    assert_eq!(by_name.abundance, by_builder.abundance);
    assert_eq!(by_name.residual, by_builder.residual);
}
