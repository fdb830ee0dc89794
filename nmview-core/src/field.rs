//! Complex wavefronts and beam parameters.

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;

/// Coherent wavefront sampled on an N x N grid.
pub type ComplexField = Array2<Complex64>;

/// Planck constant times speed of light, in keV·m.
pub const HC_KEV_M: f64 = 1.239_841_98e-9;

/// Returns the photon wavelength in metres for an energy in keV.
pub fn wavelength(energy_kev: f64) -> Result<f64> {
    check_positive("energy", energy_kev)?;
    Ok(HC_KEV_M / energy_kev)
}

/// Checks that a wavefront is square and non-empty, returning its size N.
pub fn check_square(field: &ArrayView2<'_, Complex64>) -> Result<usize> {
    let (rows, cols) = field.dim();
    if rows != cols || rows == 0 {
        return Err(Error::NonSquareField { rows, cols });
    }
    Ok(rows)
}

/// Rejects non-positive and non-finite physical parameters.
pub fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}
