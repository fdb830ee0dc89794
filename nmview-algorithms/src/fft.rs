//! Centred 2D Fourier transforms.
//!
//! The forward transform is followed by `fftshift` and the inverse is
//! preceded by `ifftshift`, so both physical and frequency space arrays
//! keep their zero at index `n / 2` along each axis. The inverse carries
//! the `1 / (rows * cols)` normalisation.
#![allow(clippy::cast_precision_loss)]

use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Planned forward and inverse transforms for one array shape.
pub struct Fft2 {
    rows: usize,
    cols: usize,
    row_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl Fft2 {
    /// Plans transforms for `rows x cols` arrays.
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            rows,
            cols,
            row_forward: planner.plan_fft_forward(cols),
            row_inverse: planner.plan_fft_inverse(cols),
            col_forward: planner.plan_fft_forward(rows),
            col_inverse: planner.plan_fft_inverse(rows),
        }
    }

    /// Returns the planned `(rows, cols)`.
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Centred forward transform.
    ///
    /// # Panics
    ///
    /// Panics if `field` does not have the planned shape.
    pub fn forward(&self, field: &ArrayView2<'_, Complex64>) -> Array2<Complex64> {
        assert_eq!(field.dim(), self.dim(), "array shape differs from plan");
        let mut data = field.as_standard_layout().into_owned();
        self.transform(&mut data, &*self.row_forward, &*self.col_forward);
        fftshift(&data.view())
    }

    /// Centred inverse transform.
    ///
    /// # Panics
    ///
    /// Panics if `spectrum` does not have the planned shape.
    pub fn inverse(&self, spectrum: &ArrayView2<'_, Complex64>) -> Array2<Complex64> {
        assert_eq!(spectrum.dim(), self.dim(), "array shape differs from plan");
        let mut data = ifftshift(spectrum);
        self.transform(&mut data, &*self.row_inverse, &*self.col_inverse);
        let norm = 1.0 / (self.rows * self.cols) as f64;
        data.mapv_inplace(|value| value * norm);
        data
    }

    fn transform(&self, data: &mut Array2<Complex64>, along_rows: &dyn Fft<f64>, along_cols: &dyn Fft<f64>) {
        let scratch_len = along_rows
            .get_inplace_scratch_len()
            .max(along_cols.get_inplace_scratch_len());
        let mut scratch = vec![Complex64::default(); scratch_len];

        transform_lanes(data, along_rows, &mut scratch);
        let mut transposed = data.t().as_standard_layout().into_owned();
        transform_lanes(&mut transposed, along_cols, &mut scratch);
        data.assign(&transposed.t());
    }
}

/// Transforms every row of `data` in place.
fn transform_lanes(data: &mut Array2<Complex64>, fft: &dyn Fft<f64>, scratch: &mut [Complex64]) {
    let scratch = &mut scratch[..fft.get_inplace_scratch_len()];
    for mut lane in data.rows_mut() {
        if let Some(slice) = lane.as_slice_mut() {
            fft.process_with_scratch(slice, scratch);
        } else {
            let mut buffer = lane.to_vec();
            fft.process_with_scratch(&mut buffer, scratch);
            for (dst, src) in lane.iter_mut().zip(buffer) {
                *dst = src;
            }
        }
    }
}

/// Moves the zero-frequency element to index `n / 2` along both axes.
pub fn fftshift<T: Copy>(data: &ArrayView2<'_, T>) -> Array2<T> {
    let (rows, cols) = data.dim();
    let (dr, dc) = (rows - rows / 2, cols - cols / 2);
    Array2::from_shape_fn((rows, cols), |(r, c)| data[((r + dr) % rows, (c + dc) % cols)])
}

/// Inverse of [`fftshift`], also for odd lengths.
pub fn ifftshift<T: Copy>(data: &ArrayView2<'_, T>) -> Array2<T> {
    let (rows, cols) = data.dim();
    let (dr, dc) = (rows / 2, cols / 2);
    Array2::from_shape_fn((rows, cols), |(r, c)| data[((r + dr) % rows, (c + dc) % cols)])
}

/// Centred forward transform of a single array.
pub fn fft2(field: &ArrayView2<'_, Complex64>) -> Array2<Complex64> {
    let (rows, cols) = field.dim();
    Fft2::new(rows, cols).forward(field)
}

/// Centred inverse transform of a single array.
pub fn ifft2(spectrum: &ArrayView2<'_, Complex64>) -> Array2<Complex64> {
    let (rows, cols) = spectrum.dim();
    Fft2::new(rows, cols).inverse(spectrum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn max_abs_diff(a: &Array2<Complex64>, b: &Array2<Complex64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_fftshift_odd_and_even() {
        let even = array![[0, 1, 2, 3]];
        assert_eq!(fftshift(&even.view()), array![[2, 3, 0, 1]]);
        let odd = array![[0, 1, 2, 3, 4]];
        assert_eq!(fftshift(&odd.view()), array![[3, 4, 0, 1, 2]]);
        assert_eq!(ifftshift(&fftshift(&odd.view()).view()), odd);

        let column = array![[0], [1], [2]];
        assert_eq!(fftshift(&column.view()), array![[2], [0], [1]]);
    }

    #[test]
    fn test_constant_field_is_centred_delta() {
        let field = Array2::from_elem((4, 4), Complex64::new(1.0, 0.0));
        let spectrum = fft2(&field.view());
        assert!((spectrum[(2, 2)] - Complex64::new(16.0, 0.0)).norm() < 1e-12);
        let rest: f64 = spectrum
            .indexed_iter()
            .filter(|((r, c), _)| (*r, *c) != (2, 2))
            .map(|(_, v)| v.norm())
            .sum();
        assert!(rest < 1e-12);
    }

    #[test]
    fn test_inverse_undoes_forward() {
        let field = Array2::from_shape_fn((5, 6), |(r, c)| {
            Complex64::new((r * 7 + c) as f64 * 0.1, (r as f64 - c as f64).sin())
        });
        let plan = Fft2::new(5, 6);
        let back = plan.inverse(&plan.forward(&field.view()).view());
        assert!(max_abs_diff(&field, &back) < 1e-12);
    }

    #[test]
    fn test_transposed_view_input() {
        let field = Array2::from_shape_fn((3, 3), |(r, c)| Complex64::new(r as f64, c as f64));
        let transposed = field.t();
        let expected = fft2(&transposed.to_owned().view());
        assert!(max_abs_diff(&fft2(&transposed), &expected) < 1e-12);
    }
}
