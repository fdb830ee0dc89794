#![allow(clippy::cast_precision_loss)]
use ndarray::{Array2, ArrayView2};
use nmview_algorithms::{
    propagate, Error, NearfieldPropagator, PropagationConfig, PropagationKernel,
    WavefrontPropagator,
};
use num_complex::Complex64;

const PIXEL: f64 = 50e-9;
const ENERGY: f64 = 8.0;

/// Off-centre Gaussian spot with a phase ramp.
fn beam(n: usize) -> Array2<Complex64> {
    let (cy, cx) = (n as f64 * 0.4, n as f64 * 0.55);
    let sigma = n as f64 / 10.0;
    Array2::from_shape_fn((n, n), |(r, c)| {
        let d2 = (r as f64 - cy).powi(2) + (c as f64 - cx).powi(2);
        Complex64::from_polar((-d2 / (2.0 * sigma * sigma)).exp(), 0.05 * r as f64)
    })
}

fn max_abs_diff(a: &ArrayView2<'_, Complex64>, b: &ArrayView2<'_, Complex64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
}

#[test]
fn test_ones_unchanged_at_zero_distance() {
    let field = Array2::from_elem((4, 4), Complex64::new(1.0, 0.0));
    let stack = propagate(&field.view(), 1e-6, &[0.0], 10.0).unwrap();
    assert_eq!(stack.len(), 1);
    let plane = stack.field(0).unwrap();
    assert!(max_abs_diff(&plane, &field.view()) < 1e-12);
}

#[test]
fn test_forward_then_back_recovers_field() {
    let field = beam(64);
    let distance = 2.5e-4;
    let forward = propagate(&field.view(), PIXEL, &[distance], ENERGY).unwrap();
    let back = propagate(&forward.field(0).unwrap(), PIXEL, &[-distance], ENERGY).unwrap();
    assert!(max_abs_diff(&back.field(0).unwrap(), &field.view()) < 1e-9);
}

#[test]
fn test_planes_independent_of_batching() {
    let field = beam(32);
    let distances = [-1e-4, 0.0, 3e-4, 1e-3];
    let stack = propagate(&field.view(), PIXEL, &distances, ENERGY).unwrap();
    assert_eq!(stack.distances(), &distances);
    assert_eq!(stack.fields().dim(), (distances.len(), 32, 32));

    for (distance, plane) in stack.iter() {
        let single = propagate(&field.view(), PIXEL, &[distance], ENERGY).unwrap();
        assert!(max_abs_diff(&plane, &single.field(0).unwrap()) < 1e-12);
    }

    let reversed: Vec<f64> = distances.iter().rev().copied().collect();
    let other = propagate(&field.view(), PIXEL, &reversed, ENERGY).unwrap();
    for i in 0..distances.len() {
        let j = distances.len() - 1 - i;
        assert!(max_abs_diff(&stack.field(i).unwrap(), &other.field(j).unwrap()) < 1e-12);
    }
}

#[test]
fn test_propagator_reuse_matches_front_end() {
    let field = beam(16);
    let config = PropagationConfig::default().with_kernel(PropagationKernel::Fresnel);
    let propagator = NearfieldPropagator::new(16, PIXEL, ENERGY, &config).unwrap();
    let single = propagator.propagate(&field.view(), 5e-4).unwrap();
    let stack = WavefrontPropagator::new(config)
        .propagate(&field.view(), PIXEL, &[5e-4], ENERGY)
        .unwrap();
    assert!(max_abs_diff(&single.view(), &stack.field(0).unwrap()) < 1e-12);
}

#[test]
fn test_invalid_inputs() {
    let field = beam(8);
    let rect = Array2::from_elem((4, 6), Complex64::new(1.0, 0.0));
    assert_eq!(
        propagate(&rect.view(), PIXEL, &[0.0], ENERGY).unwrap_err(),
        Error::NonSquareField { rows: 4, cols: 6 }
    );
    assert_eq!(
        propagate(&field.view(), PIXEL, &[], ENERGY).unwrap_err(),
        Error::NoDistances
    );
    assert!(matches!(
        propagate(&field.view(), -PIXEL, &[0.0], ENERGY),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(matches!(
        propagate(&field.view(), PIXEL, &[0.0], 0.0),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(matches!(
        propagate(&field.view(), PIXEL, &[f64::NAN], ENERGY),
        Err(Error::NonFinite(_))
    ));
}
