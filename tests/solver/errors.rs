//! Tests for rejected inputs.

use huwacb_rs::{AdmmConfig, Huwacb, HuwacbError, OptionValue, SolveOptions, WarmStart};
use ndarray::{array, Array1, Array2};

use crate::test_helpers::tent_scene;

#[test]
fn test_conflicting_background_blocks() {
    let err = SolveOptions::from_pairs([
        ("X0", OptionValue::from(Array2::<f64>::zeros((2, 1)))),
        ("Z0", Array2::<f64>::zeros((5, 1)).into()),
        ("B0", Array2::<f64>::zeros((5, 1)).into()),
        ("R0", Array2::<f64>::zeros((5, 1)).into()),
        ("D0", Array2::<f64>::zeros((12, 1)).into()),
    ])
    .unwrap_err();

    assert!(matches!(err, HuwacbError::ConflictingWarmStart(_)));
    assert!(err.is_configuration_error());
}

#[test]
fn test_partial_warm_start() {
    let err = WarmStart::from_blocks(Some(Array2::zeros((2, 1))), None, None, Some(Array2::zeros((5, 1))), None)
        .unwrap_err();

    match err {
        HuwacbError::IncompleteWarmStart(missing) => {
            assert!(missing.contains("Z0 or B0"));
            assert!(missing.contains("D0"));
            assert!(!missing.contains("X0"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_unknown_option_and_odd_arguments() {
    let err = SolveOptions::from_pairs([("STEPSIZE", OptionValue::Scalar(1.0))]).unwrap_err();
    assert!(matches!(err, HuwacbError::UnknownOption(_)));
    assert!(err.to_string().contains("STEPSIZE"));

    let err = SolveOptions::from_args(vec!["TOL".into(), 1e-4_f64.into(), "VERBOSE".into()]).unwrap_err();
    assert!(matches!(err, HuwacbError::InvalidInput(_)));
}

#[test]
fn test_zero_iterations_rejected_before_solving() {
    let scene = tent_scene();

    let err = Huwacb::new()
        .with_max_iterations(0)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap_err();
    assert!(matches!(err, HuwacbError::InvalidParameter(_)));

    let err = SolveOptions::from_pairs([("MAXITER", OptionValue::Scalar(0.0))]).unwrap_err();
    assert!(matches!(err, HuwacbError::InvalidParameter(_)));
}

#[test]
fn test_shape_errors() {
    let scene = tent_scene();

    let err = Huwacb::new()
        .solve(&Array2::ones((4, 2)), &scene.y, &scene.wv)
        .unwrap_err();
    assert!(matches!(err, HuwacbError::DimensionMismatch(_)));

    let err = Huwacb::new()
        .with_lambda_a(array![0.1, 0.2, 0.3])
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap_err();
    assert!(matches!(err, HuwacbError::DimensionMismatch(_)));

    let err = Huwacb::new()
        .with_warm_start(WarmStart::Full {
            x0: Array2::zeros((3, 1)),
            z0: Array2::zeros((5, 1)),
            r0: Array2::zeros((5, 1)),
            d0: Array2::zeros((12, 1)),
        })
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap_err();
    assert!(matches!(err, HuwacbError::DimensionMismatch(_)));

    let err = Huwacb::new()
        .solve(&scene.a, &scene.y, &Array1::from(vec![1.0, 2.0, 2.0, 3.0, 4.0]))
        .unwrap_err();
    assert!(matches!(err, HuwacbError::InvalidInput(_)));
}

#[test]
fn test_singular_basis_with_background_warm_start() {
    let scene = tent_scene();

    // Two identical columns; e1 is outside the column space
    let mut basis = Array2::<f64>::eye(5);
    basis[[0, 1]] = 1.0;
    basis[[1, 1]] = 0.0;
    let mut b0 = Array2::zeros((5, 1));
    b0[[1, 0]] = 1.0;

    let err = Huwacb::new()
        .with_concave_base(basis)
        .with_warm_start(WarmStart::Background {
            x0: Array2::zeros((2, 1)),
            b0,
            r0: Array2::zeros((5, 1)),
            d0: Array2::zeros((12, 1)),
        })
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap_err();

    assert!(matches!(err, HuwacbError::SingularMatrix(_)));
    assert!(err.is_numerical_error());
}

#[test]
fn test_json_config() {
    let config = AdmmConfig::from_json(r#"{"tol": 1e-6, "max_iterations": 20000}"#).unwrap();
    assert_eq!(config.tol, 1e-6);
    assert!(config.parallel);

    let scene = tent_scene();
    let options = SolveOptions {
        config,
        ..SolveOptions::default()
    };
    let result = Huwacb::with_options(options)
        .solve(&scene.a, &scene.y, &scene.wv)
        .unwrap();
    assert!(result.success, "{}", result);

    let round_trip = AdmmConfig::from_json(&Huwacb::new().options().config.to_json().unwrap()).unwrap();
    assert_eq!(round_trip, AdmmConfig::default());

    assert!(matches!(
        AdmmConfig::from_json(r#"{"tol": -1.0}"#),
        Err(HuwacbError::InvalidParameter(_))
    ));
    assert!(matches!(AdmmConfig::from_json("{tol"), Err(HuwacbError::JsonError(_))));
}
