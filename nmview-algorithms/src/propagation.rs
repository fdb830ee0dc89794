//! Near-field wavefront propagation.
//!
//! A [`NearfieldPropagator`] is set up once for a fixed geometry (array
//! size, pixel size, photon energy): it owns the FFT plans and the centred
//! squared spatial frequencies. Each requested distance then only costs a
//! transfer function evaluation, one multiplication and one inverse
//! transform, since the forward spectrum of the input is shared.
//!
//! Results agree with other FFT backends to floating-point tolerance but
//! are not bit-identical across backends or CPU feature sets.
#![allow(clippy::cast_precision_loss, clippy::missing_errors_doc)]

use crate::fft::Fft2;
use log::debug;
use ndarray::{s, Array2, Array3, ArrayView2, Zip};
use nmview_core::alloc::try_filled;
use nmview_core::error::{Error, Result};
use nmview_core::field::{check_positive, check_square, wavelength, ComplexField};
use nmview_core::{PropagationConfig, PropagationKernel};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Propagated wavefronts, one plane per requested distance.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationStack {
    distances: Vec<f64>,
    fields: Array3<Complex64>,
}

impl PropagationStack {
    /// Number of planes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Returns true if the stack holds no planes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Distances in metres, in request order.
    #[must_use]
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// All planes as a `(planes, N, N)` array.
    #[must_use]
    pub fn fields(&self) -> &Array3<Complex64> {
        &self.fields
    }

    /// Consumes the stack and returns the `(planes, N, N)` array.
    #[must_use]
    pub fn into_fields(self) -> Array3<Complex64> {
        self.fields
    }

    /// Returns the plane for the `index`-th requested distance.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<ArrayView2<'_, Complex64>> {
        (index < self.len()).then(|| self.fields.slice(s![index, .., ..]))
    }

    /// Iterates over `(distance, plane)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, ArrayView2<'_, Complex64>)> + '_ {
        self.distances.iter().copied().zip(self.fields.outer_iter())
    }
}

/// Propagation geometry fixed for one array size, pixel size and energy.
pub struct NearfieldPropagator {
    size: usize,
    pixel_size: f64,
    wavelength: f64,
    kernel: PropagationKernel,
    /// Centred squared spatial frequency, 1/m².
    q2: Array2<f64>,
    fft: Fft2,
}

impl NearfieldPropagator {
    /// Sets up propagation of `size x size` fields.
    ///
    /// `pixel_size` is in metres and `energy` in keV.
    pub fn new(
        size: usize,
        pixel_size: f64,
        energy: f64,
        config: &PropagationConfig,
    ) -> Result<Self> {
        if size == 0 {
            return Err(Error::NonSquareField { rows: 0, cols: 0 });
        }
        check_positive("pixel size", pixel_size)?;
        let wavelength = wavelength(energy)?;

        let extent = size as f64 * pixel_size;
        let centre = (size / 2) as f64;
        let q2 = Array2::from_shape_fn((size, size), |(r, c)| {
            let qy = (r as f64 - centre) / extent;
            let qx = (c as f64 - centre) / extent;
            qx * qx + qy * qy
        });

        Ok(Self {
            size,
            pixel_size,
            wavelength,
            kernel: config.kernel,
            q2,
            fft: Fft2::new(size, size),
        })
    }

    /// Side length N of the fields this propagator accepts.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Pixel size in metres.
    #[must_use]
    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    /// Wavelength in metres.
    #[must_use]
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// Centred transfer function for propagation over `distance` metres.
    pub fn transfer_function(&self, distance: f64) -> Result<Array2<Complex64>> {
        if !distance.is_finite() {
            return Err(Error::NonFinite("propagation distance"));
        }
        let lambda = self.wavelength;
        let transfer = match self.kernel {
            PropagationKernel::AngularSpectrum => self.q2.mapv(|q2| {
                let a2 = lambda * lambda * q2;
                if a2 >= 1.0 {
                    // evanescent
                    return Complex64::new(0.0, 0.0);
                }
                // sqrt(1 - a2) - 1 without cancellation
                let phase = -2.0 * PI * distance / lambda * a2 / (1.0 + (1.0 - a2).sqrt());
                Complex64::from_polar(1.0, phase)
            }),
            PropagationKernel::Fresnel => self
                .q2
                .mapv(|q2| Complex64::from_polar(1.0, -PI * lambda * distance * q2)),
        };
        Ok(transfer)
    }

    /// Propagates `field` over a single distance.
    pub fn propagate(
        &self,
        field: &ArrayView2<'_, Complex64>,
        distance: f64,
    ) -> Result<ComplexField> {
        self.check_field(field)?;
        let spectrum = self.fft.forward(field);
        self.apply(&spectrum, distance)
    }

    /// Propagates `field` to every distance, keeping the request order.
    pub fn propagate_stack(
        &self,
        field: &ArrayView2<'_, Complex64>,
        distances: &[f64],
    ) -> Result<PropagationStack> {
        self.check_field(field)?;
        if distances.is_empty() {
            return Err(Error::NoDistances);
        }
        if !distances.iter().all(|d| d.is_finite()) {
            return Err(Error::NonFinite("propagation distance"));
        }

        let n = self.size;
        let total = distances
            .len()
            .checked_mul(n * n)
            .ok_or(Error::OutOfMemory { bytes: usize::MAX })?;
        let buffer = try_filled(total, Complex64::default())?;
        let mut fields = Array3::from_shape_vec((distances.len(), n, n), buffer)
            .map_err(|_| Error::shape_mismatch("propagation stack", &[distances.len(), n, n], &[]))?;

        debug!(
            "propagating {n}x{n} field to {} planes (wavelength {:.4e} m, pixel {:.4e} m)",
            distances.len(),
            self.wavelength,
            self.pixel_size
        );

        let spectrum = self.fft.forward(field);
        for (i, &distance) in distances.iter().enumerate() {
            let plane = self.apply(&spectrum, distance)?;
            fields.slice_mut(s![i, .., ..]).assign(&plane);
        }

        Ok(PropagationStack {
            distances: distances.to_vec(),
            fields,
        })
    }

    fn check_field(&self, field: &ArrayView2<'_, Complex64>) -> Result<()> {
        let n = check_square(field)?;
        if n != self.size {
            return Err(Error::shape_mismatch(
                "wavefront",
                &[self.size, self.size],
                field.shape(),
            ));
        }
        Ok(())
    }

    fn apply(&self, spectrum: &Array2<Complex64>, distance: f64) -> Result<ComplexField> {
        let mut propagated = self.transfer_function(distance)?;
        Zip::from(&mut propagated)
            .and(spectrum)
            .for_each(|h, &a| *h *= a);
        Ok(self.fft.inverse(&propagated.view()))
    }
}

/// Near-field propagation front end holding the kernel choice.
#[derive(Debug, Clone, Default)]
pub struct WavefrontPropagator {
    config: PropagationConfig,
}

impl WavefrontPropagator {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: PropagationConfig) -> Self {
        Self { config }
    }

    /// Get configuration.
    #[must_use]
    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Propagates an N x N `field` to each of `distances`.
    ///
    /// `pixel_size` and `distances` are in metres, `energy` in keV.
    pub fn propagate(
        &self,
        field: &ArrayView2<'_, Complex64>,
        pixel_size: f64,
        distances: &[f64],
        energy: f64,
    ) -> Result<PropagationStack> {
        let n = check_square(field)?;
        NearfieldPropagator::new(n, pixel_size, energy, &self.config)?
            .propagate_stack(field, distances)
    }
}

/// Propagates an N x N `field` to each of `distances` with the angular
/// spectrum kernel.
///
/// `pixel_size` and `distances` are in metres, `energy` in keV.
pub fn propagate(
    field: &ArrayView2<'_, Complex64>,
    pixel_size: f64,
    distances: &[f64],
    energy: f64,
) -> Result<PropagationStack> {
    WavefrontPropagator::default().propagate(field, pixel_size, distances, energy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian_beam(n: usize, sigma: f64) -> ComplexField {
        let c = (n / 2) as f64;
        Array2::from_shape_fn((n, n), |(r, col)| {
            let d2 = (r as f64 - c).powi(2) + (col as f64 - c).powi(2);
            Complex64::from_polar((-d2 / (2.0 * sigma * sigma)).exp(), 0.3 * col as f64)
        })
    }

    fn max_abs_diff(a: &ArrayView2<'_, Complex64>, b: &ArrayView2<'_, Complex64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_zero_distance_is_identity() {
        let field = Array2::from_elem((4, 4), Complex64::new(1.0, 0.0));
        let stack = propagate(&field.view(), 1e-6, &[0.0], 10.0).unwrap();
        assert_eq!(stack.len(), 1);
        let plane = stack.field(0).unwrap();
        assert!(max_abs_diff(&plane, &field.view()) < 1e-12);
    }

    #[test]
    fn test_rejects_non_square() {
        let field = ComplexField::zeros((4, 5));
        assert_eq!(
            propagate(&field.view(), 1e-6, &[0.0], 10.0).unwrap_err(),
            Error::NonSquareField { rows: 4, cols: 5 }
        );
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let field = ComplexField::zeros((4, 4));
        assert!(matches!(
            propagate(&field.view(), 0.0, &[0.0], 10.0),
            Err(Error::InvalidParameter { name: "pixel size", .. })
        ));
        assert!(matches!(
            propagate(&field.view(), 1e-6, &[0.0], -1.0),
            Err(Error::InvalidParameter { name: "energy", .. })
        ));
        assert_eq!(
            propagate(&field.view(), 1e-6, &[], 10.0).unwrap_err(),
            Error::NoDistances
        );
        assert_eq!(
            propagate(&field.view(), 1e-6, &[f64::NAN], 10.0).unwrap_err(),
            Error::NonFinite("propagation distance")
        );
    }

    #[test]
    fn test_propagator_rejects_other_sizes() {
        let propagator =
            NearfieldPropagator::new(8, 1e-6, 10.0, &PropagationConfig::default()).unwrap();
        let field = ComplexField::zeros((4, 4));
        assert!(matches!(
            propagator.propagate(&field.view(), 1e-3),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_transfer_function_is_unit_modulus() {
        let propagator =
            NearfieldPropagator::new(16, 50e-9, 8.0, &PropagationConfig::default()).unwrap();
        let h = propagator.transfer_function(2e-3).unwrap();
        assert!(h.iter().all(|v| (v.norm() - 1.0).abs() < 1e-12));
        // DC term untouched
        assert!((h[(8, 8)] - Complex64::new(1.0, 0.0)).norm() < 1e-15);
    }

    #[test]
    fn test_fresnel_matches_angular_spectrum_paraxially() {
        let angular =
            NearfieldPropagator::new(32, 100e-9, 10.0, &PropagationConfig::default()).unwrap();
        let fresnel = NearfieldPropagator::new(
            32,
            100e-9,
            10.0,
            &PropagationConfig::default().with_kernel(PropagationKernel::Fresnel),
        )
        .unwrap();
        let field = gaussian_beam(32, 3.0);
        let a = angular.propagate(&field.view(), 1e-4).unwrap();
        let b = fresnel.propagate(&field.view(), 1e-4).unwrap();
        assert!(max_abs_diff(&a.view(), &b.view()) < 1e-9);
    }

    #[test]
    fn test_propagation_conserves_power() {
        let field = gaussian_beam(32, 2.5);
        let stack = propagate(&field.view(), 100e-9, &[5e-4, -2e-3], 9.0).unwrap();
        let power = |f: &ArrayView2<'_, Complex64>| f.iter().map(Complex64::norm_sqr).sum::<f64>();
        let reference = power(&field.view());
        for (_, plane) in stack.iter() {
            assert!((power(&plane) - reference).abs() / reference < 1e-10);
        }
    }
}
