//! Reduction of per-position spectra and detector frames to map signals.
#![allow(clippy::cast_precision_loss, clippy::missing_errors_doc)]

use log::debug;
use ndarray::{s, Array1, ArrayView2, ArrayView3, Axis};
use nmview_core::error::{Error, Result};
use nmview_core::scan::ScanSignal;
use std::collections::BTreeSet;

/// Column range `[lo, hi)` of the channels between two axis values.
///
/// Each bound maps to the axis index nearest to it, first index on ties.
/// Bounds may be given in either order; a window collapsing onto one
/// index covers that single channel.
pub fn window_indices(axis: &[f64], lower: f64, upper: f64) -> Result<(usize, usize)> {
    if axis.is_empty() {
        return Err(Error::EmptyAxis);
    }
    if !(lower.is_finite() && upper.is_finite()) {
        return Err(Error::NonFinite("window bound"));
    }
    let (a, b) = (nearest_index(axis, lower), nearest_index(axis, upper));
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Ok(if lo == hi { (lo, lo + 1) } else { (lo, hi) })
}

fn nearest_index(axis: &[f64], value: f64) -> usize {
    let mut best = (0, f64::INFINITY);
    for (i, &a) in axis.iter().enumerate() {
        let d = (a - value).abs();
        if d < best.1 {
            best = (i, d);
        }
    }
    best.0
}

/// Mean of each row of `data` over the channels between `lower` and
/// `upper` on `axis`.
///
/// `data` holds one spectrum per position (`n_positions x n_channels`).
pub fn reduce_window(
    data: &ArrayView2<'_, f64>,
    axis: &[f64],
    lower: f64,
    upper: f64,
) -> Result<ScanSignal> {
    let channels = data.ncols();
    if axis.len() != channels {
        return Err(Error::shape_mismatch(
            "spectral axis",
            &[channels],
            &[axis.len()],
        ));
    }
    let (lo, hi) = window_indices(axis, lower, upper)?;
    debug!("building map from channels {lo} to {hi}");
    Ok(row_means(&data.slice(s![.., lo..hi])))
}

/// Mean of each row of `data` over all channels.
pub fn reduce_full(data: &ArrayView2<'_, f64>) -> Result<ScanSignal> {
    if data.ncols() == 0 {
        return Err(Error::EmptyAxis);
    }
    Ok(row_means(data))
}

fn row_means(data: &ArrayView2<'_, f64>) -> ScanSignal {
    let n = data.ncols() as f64;
    data.rows().into_iter().map(|row| row.sum() / n).collect()
}

/// Mean intensity of each detector frame, optionally restricted to the
/// pixels set in `roi`.
///
/// `frames` is `n_positions x height x width`; `roi` must be
/// `height x width`.
pub fn reduce_frames(
    frames: &ArrayView3<'_, f64>,
    roi: Option<&ArrayView2<'_, bool>>,
) -> Result<ScanSignal> {
    let (_, height, width) = frames.dim();
    let Some(roi) = roi else {
        if height * width == 0 {
            return Err(Error::EmptySelection);
        }
        let n = (height * width) as f64;
        return Ok(frames
            .axis_iter(Axis(0))
            .map(|frame| frame.sum() / n)
            .collect());
    };

    if roi.dim() != (height, width) {
        return Err(Error::shape_mismatch(
            "detector roi",
            &[height, width],
            roi.shape(),
        ));
    }
    let pixels: Vec<(usize, usize)> = roi
        .indexed_iter()
        .filter_map(|(index, &set)| set.then_some(index))
        .collect();
    if pixels.is_empty() {
        return Err(Error::EmptySelection);
    }
    debug!("reducing {} frames over {} roi pixels", frames.len_of(Axis(0)), pixels.len());

    let n = pixels.len() as f64;
    Ok(frames
        .axis_iter(Axis(0))
        .map(|frame| pixels.iter().map(|&p| frame[p]).sum::<f64>() / n)
        .collect())
}

/// Mean spectrum over the selected positions, or over all positions when
/// `selection` is `None`.
pub fn average_spectrum(
    data: &ArrayView2<'_, f64>,
    selection: Option<&BTreeSet<usize>>,
) -> Result<Array1<f64>> {
    let positions = data.nrows();
    match selection {
        None => data.mean_axis(Axis(0)).ok_or(Error::EmptySelection),
        Some(selection) => {
            if selection.is_empty() {
                return Err(Error::EmptySelection);
            }
            if let Some(&last) = selection.last() {
                if last >= positions {
                    return Err(Error::IndexOutOfRange {
                        index: last,
                        len: positions,
                    });
                }
            }
            let mut sum = Array1::<f64>::zeros(data.ncols());
            for &i in selection {
                sum += &data.row(i);
            }
            Ok(sum / selection.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};

    fn spectra() -> ndarray::Array2<f64> {
        array![[1.0, 2.0, 3.0, 4.0], [10.0, 20.0, 30.0, 40.0], [0.0, 0.0, 0.0, 8.0]]
    }

    const AXIS: [f64; 4] = [0.0, 1.0, 2.0, 3.0];

    #[test]
    fn test_window_indices() {
        assert_eq!(window_indices(&AXIS, 0.9, 2.2).unwrap(), (1, 2));
        assert_eq!(window_indices(&AXIS, 2.2, 0.9).unwrap(), (1, 2));
        assert_eq!(window_indices(&AXIS, 1.1, 1.2).unwrap(), (1, 2));
        // 0.5 is equally close to 0.0 and 1.0
        assert_eq!(window_indices(&AXIS, 0.5, 3.0).unwrap(), (0, 3));
        assert_eq!(window_indices(&AXIS, -10.0, 10.0).unwrap(), (0, 3));
        assert_eq!(window_indices(&[], 0.0, 1.0).unwrap_err(), Error::EmptyAxis);
        assert!(window_indices(&AXIS, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_reduce_window() {
        let data = spectra();
        let signal = reduce_window(&data.view(), &AXIS, 0.0, 2.0).unwrap();
        assert_eq!(signal, vec![1.5, 15.0, 0.0]);

        // collapsed window selects one column
        let signal = reduce_window(&data.view(), &AXIS, 3.0, 3.1).unwrap();
        assert_eq!(signal, vec![4.0, 40.0, 8.0]);

        assert!(matches!(
            reduce_window(&data.view(), &AXIS[..3], 0.0, 2.0),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_reduce_full() {
        let data = spectra();
        assert_eq!(reduce_full(&data.view()).unwrap(), vec![2.5, 25.0, 2.0]);
        let empty = ndarray::Array2::<f64>::zeros((3, 0));
        assert_eq!(reduce_full(&empty.view()).unwrap_err(), Error::EmptyAxis);
    }

    #[test]
    fn test_reduce_frames() {
        let frames = Array3::from_shape_fn((2, 2, 3), |(p, r, c)| (p * 100 + r * 3 + c) as f64);
        let full = reduce_frames(&frames.view(), None).unwrap();
        assert_relative_eq!(full[0], 2.5);
        assert_relative_eq!(full[1], 102.5);

        let roi = array![[true, false, false], [false, false, true]];
        let masked = reduce_frames(&frames.view(), Some(&roi.view())).unwrap();
        assert_relative_eq!(masked[0], 2.5);
        assert_relative_eq!(masked[1], 102.5);

        let roi = array![[false, true, false], [false, false, false]];
        assert_eq!(reduce_frames(&frames.view(), Some(&roi.view())).unwrap(), vec![1.0, 101.0]);

        let none = ndarray::Array2::from_elem((2, 3), false);
        assert_eq!(
            reduce_frames(&frames.view(), Some(&none.view())).unwrap_err(),
            Error::EmptySelection
        );
        let wrong = ndarray::Array2::from_elem((3, 2), true);
        assert!(reduce_frames(&frames.view(), Some(&wrong.view())).is_err());
    }

    #[test]
    fn test_average_spectrum() {
        let data = spectra();
        let all = average_spectrum(&data.view(), None).unwrap();
        for (got, want) in all.iter().zip([11.0 / 3.0, 22.0 / 3.0, 11.0, 52.0 / 3.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }

        let picked: BTreeSet<usize> = [0, 2].into_iter().collect();
        let mean = average_spectrum(&data.view(), Some(&picked)).unwrap();
        assert_eq!(mean, array![0.5, 1.0, 1.5, 6.0]);

        assert_eq!(
            average_spectrum(&data.view(), Some(&BTreeSet::new())).unwrap_err(),
            Error::EmptySelection
        );
        let outside: BTreeSet<usize> = [1, 3].into_iter().collect();
        assert_eq!(
            average_spectrum(&data.view(), Some(&outside)).unwrap_err(),
            Error::IndexOutOfRange { index: 3, len: 3 }
        );
    }
}
