//! Integration tests for the Parameters collection

use sirfit_rs::parameters::{ParameterError, Parameters};

fn rates() -> Parameters {
    let mut params = Parameters::new();
    params.add_param_with_bounds("beta", 1.5, 0.0, f64::INFINITY).unwrap();
    params.add_param_with_bounds("gamma", 0.5, 0.0, f64::INFINITY).unwrap();
    params
}

#[test]
fn test_order_defines_vector_layout() {
    let mut params = Parameters::new();
    for name in ["zeta", "alpha", "mu"] {
        params.add_param(name, 1.0).unwrap();
    }
    assert_eq!(params.names(), vec!["zeta", "alpha", "mu"]);
}

#[test]
fn test_varying_subset() {
    let mut params = rates();
    params.get_mut("beta").unwrap().set_vary(false);

    assert_eq!(params.varying_count(), 1);
    assert_eq!(params.varying()[0].name(), "gamma");

    let external = params.external_from_internal(&[0.0]).unwrap();
    assert_eq!(external[0], 1.5);
    assert!(external[1] >= 0.0);
}

#[test]
fn test_negative_internal_never_negative_external() {
    let params = rates();
    for internal in [[-10.0, -10.0], [-1e-3, 5.0], [1e6, -1e6]] {
        let external = params.external_from_internal(&internal).unwrap();
        assert!(external.iter().all(|v| *v >= 0.0), "{:?}", external);
    }
}

#[test]
fn test_errors() {
    let mut params = rates();
    assert!(matches!(
        params.add_param("beta", 2.0),
        Err(ParameterError::DuplicateParameter { .. })
    ));
    assert!(matches!(
        params.value_of("delta"),
        Err(ParameterError::ParameterNotFound { .. })
    ));
    assert!(matches!(
        params.external_from_internal(&[1.0]),
        Err(ParameterError::LengthMismatch { expected: 2, actual: 1 })
    ));
}

#[test]
fn test_json_roundtrip() {
    let params = rates();
    let json = serde_json::to_string(&params).unwrap();
    let back: Parameters = serde_json::from_str(&json).unwrap();
    assert_eq!(back, params);
}
