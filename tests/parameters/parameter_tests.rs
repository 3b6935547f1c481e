//! Integration tests for the Parameter struct
//!
//! These tests verify that the Parameter struct behaves correctly in various scenarios.

use approx::assert_relative_eq;
use sirfit_rs::parameters::{Bounds, BoundsTransform, Parameter};
use std::f64::{INFINITY, NEG_INFINITY};

#[test]
fn test_parameter_lifecycle() {
    let mut param = Parameter::new("beta", 1.5);

    assert_eq!(param.name(), "beta");
    assert_eq!(param.value(), 1.5);
    assert!(param.vary());
    assert_eq!(param.min(), NEG_INFINITY);
    assert_eq!(param.max(), INFINITY);

    param.set_value(2.0).unwrap();
    assert_eq!(param.value(), 2.0);
    assert_eq!(param.init_value(), 1.5);

    param.reset();
    assert_eq!(param.value(), 1.5);

    param.set_bounds(0.0, 2.0).unwrap();
    assert!(param.set_value(-0.1).is_err());
    assert!(param.set_value(2.1).is_err());
    assert!(param.set_value(0.5).is_ok());

    param.set_vary(false);
    assert!(!param.vary());
}

#[test]
fn test_bounds_clamp_initial_value() {
    let param = Parameter::with_bounds("gamma", -3.0, 0.0, INFINITY).unwrap();
    assert_eq!(param.value(), 0.0);

    let param = Parameter::with_bounds("gamma", 7.0, 0.0, 5.0).unwrap();
    assert_eq!(param.value(), 5.0);

    assert!(Parameter::with_bounds("gamma", f64::NAN, 0.0, 5.0).is_err());
    assert!(Parameter::with_bounds("gamma", 1.0, 5.0, 0.0).is_err());
}

#[test]
fn test_transform_roundtrip_each_kind() {
    let cases = [
        (Bounds::unbounded(), -3.7),
        (Bounds::min_only(0.0), 0.8),
        (Bounds::max_only(10.0), 4.0),
        (Bounds::new(0.0, 2.0).unwrap(), 1.3),
    ];

    for (bounds, value) in cases {
        let transform = BoundsTransform::new(bounds);
        let internal = transform.to_internal(value).unwrap();
        assert_relative_eq!(transform.to_external(internal), value, epsilon = 1e-12);
    }
}

#[test]
fn test_transform_stays_in_bounds() {
    let transforms = [
        BoundsTransform::new(Bounds::min_only(0.0)),
        BoundsTransform::new(Bounds::max_only(1.0)),
        BoundsTransform::new(Bounds::new(-1.0, 1.0).unwrap()),
    ];

    for transform in transforms {
        for i in -200..=200 {
            let internal = i as f64 * 0.37;
            let external = transform.to_external(internal);
            assert!(
                transform.bounds().is_within_bounds(external),
                "{} mapped outside {:?}",
                internal,
                transform.bounds()
            );
        }
    }
}

#[test]
fn test_transform_derivative() {
    let transform = BoundsTransform::new(Bounds::new(0.0, 4.0).unwrap());
    let x = 0.3;
    let h = 1e-6;
    let numeric = (transform.to_external(x + h) - transform.to_external(x - h)) / (2.0 * h);
    assert_relative_eq!(transform.derivative(x), numeric, epsilon = 1e-8);
}

#[test]
fn test_bounds_json() {
    let bounds = Bounds::min_only(0.0);
    let json = serde_json::to_string(&bounds).unwrap();
    assert_eq!(json, r#"{"min":0.0,"max":null}"#);

    let back: Bounds = serde_json::from_str(&json).unwrap();
    assert_eq!(back, bounds);

    assert!(serde_json::from_str::<Bounds>(r#"{"min":2.0,"max":1.0}"#).is_err());
}
