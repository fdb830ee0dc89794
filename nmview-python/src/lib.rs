//! nmview-python: PyO3 Python bindings for nmview.
//!
//! This crate provides Python bindings using PyO3 and numpy
//! for efficient data exchange with Python.
#![allow(
    clippy::doc_markdown,
    clippy::needless_pass_by_value,
    clippy::elidable_lifetime_names
)]

use ndarray::Array2;
use nmview_algorithms::{
    InterpolationConfig, MapOrigin, PropagationConfig, PropagationKernel, SelectionConfig,
    WavefrontPropagator,
};
use nmview_core::{Complex64, ErrorKind, InterpolatedGrid, ScanPositions};
use numpy::{
    IntoPyArray, PyArray1, PyArray2, PyArray3, PyReadonlyArray1, PyReadonlyArray2,
    PyReadonlyArray3,
};
use pyo3::prelude::*;
use std::collections::BTreeSet;

fn value_error(context: &str, err: impl std::fmt::Display) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(format!("{context}: {err}"))
}

fn core_error(context: &str, err: nmview_core::Error) -> PyErr {
    match err.kind() {
        ErrorKind::OutOfMemory => {
            pyo3::exceptions::PyMemoryError::new_err(format!("{context}: {err}"))
        }
        _ => value_error(context, err),
    }
}

/// One distance or a sequence of distances.
#[derive(FromPyObject)]
enum Distances {
    One(f64),
    Many(Vec<f64>),
}

impl Distances {
    fn into_vec(self) -> Vec<f64> {
        match self {
            Self::One(d) => vec![d],
            Self::Many(d) => d,
        }
    }
}

fn parse_kernel(kernel: &str) -> PyResult<PropagationKernel> {
    match kernel.to_lowercase().as_str() {
        "angular" | "angular_spectrum" | "as" => Ok(PropagationKernel::AngularSpectrum),
        "fresnel" => Ok(PropagationKernel::Fresnel),
        other => Err(value_error(
            "propagate_nearfield",
            format!("Unknown kernel: {other}. Use 'angular' or 'fresnel'"),
        )),
    }
}

fn parse_origin(origin: &str) -> PyResult<MapOrigin> {
    match origin.to_lowercase().as_str() {
        "ul" | "upper" | "upper-left" | "upper_left" => Ok(MapOrigin::UpperLeft),
        "ll" | "lower" | "lower-left" | "lower_left" => Ok(MapOrigin::LowerLeft),
        other => Err(value_error(
            "interpolated_map",
            format!("Unknown origin: {other}. Use 'ul' or 'll'"),
        )),
    }
}

/// Converts an `(n, 2)` array of `(x, y)` rows to scan positions.
fn scan_positions(context: &str, positions: &PyReadonlyArray2<f64>) -> PyResult<ScanPositions> {
    let positions = positions.as_array();
    if positions.ncols() != 2 {
        return Err(value_error(
            context,
            format!("positions must have shape (n, 2), got {:?}", positions.shape()),
        ));
    }
    let points = positions.rows().into_iter().map(|r| (r[0], r[1])).collect();
    ScanPositions::new(points).map_err(|e| core_error(context, e))
}

/// Rebuilds the grid geometry of a map from its node coordinates.
fn grid_from_axes(x: Vec<f64>, y: Vec<f64>) -> PyResult<InterpolatedGrid> {
    let step = |axis: &[f64]| (axis.len() > 1).then(|| (axis[1] - axis[0]).abs());
    let spacing = step(x.as_slice()).or_else(|| step(y.as_slice())).ok_or_else(|| {
        value_error(
            "positions_in_mask",
            "map needs at least two nodes along one axis",
        )
    })?;
    let origin = if y.len() > 1 && y[1] > y[0] {
        MapOrigin::LowerLeft
    } else {
        MapOrigin::UpperLeft
    };
    let values = Array2::zeros((y.len(), x.len()));
    InterpolatedGrid::new(x, y, values, spacing, origin)
        .map_err(|e| core_error("positions_in_mask", e))
}

/// Propagate a square complex wavefront to one or more distances.
///
/// Returns an array of shape `(len(distances), N, N)`.
#[pyfunction]
#[pyo3(signature = (field, psize, distances, energy, kernel="angular"))]
fn propagate_nearfield<'py>(
    py: Python<'py>,
    field: PyReadonlyArray2<'py, Complex64>,
    psize: f64,
    distances: Distances,
    energy: f64,
    kernel: &str,
) -> PyResult<Bound<'py, PyArray3<Complex64>>> {
    let config = PropagationConfig::default().with_kernel(parse_kernel(kernel)?);
    let field = field.as_array().to_owned();
    let distances = distances.into_vec();
    let stack = py
        .allow_threads(|| {
            WavefrontPropagator::new(config).propagate(&field.view(), psize, &distances, energy)
        })
        .map_err(|e| core_error("propagate_nearfield", e))?;
    Ok(stack.into_fields().into_pyarray(py))
}

/// Interpolate one value per scan position onto a regular grid.
///
/// Returns `(x, y, values)` with `values` of shape `(len(y), len(x))`.
#[pyfunction]
#[pyo3(signature = (positions, values, oversampling=1, origin="ul", parallel=false))]
fn interpolated_map<'py>(
    py: Python<'py>,
    positions: PyReadonlyArray2<'py, f64>,
    values: PyReadonlyArray1<'py, f64>,
    oversampling: u32,
    origin: &str,
    parallel: bool,
) -> PyResult<(
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray2<f64>>,
)> {
    let positions = scan_positions("interpolated_map", &positions)?;
    let values = values.as_array().to_vec();
    let config = InterpolationConfig::default()
        .with_oversampling(oversampling)
        .with_origin(parse_origin(origin)?)
        .with_parallel(parallel);
    let grid = py
        .allow_threads(|| nmview_algorithms::interpolate(&positions, &values, &config))
        .map_err(|e| core_error("interpolated_map", e))?;
    let x = PyArray1::from_vec(py, grid.x_coords().to_vec());
    let y = PyArray1::from_vec(py, grid.y_coords().to_vec());
    Ok((x, y, grid.into_values().into_pyarray(py)))
}

/// Indices of the scan positions covered by a boolean mask on a map.
#[pyfunction]
#[pyo3(signature = (positions, x, y, mask, tolerance=1.0))]
fn positions_in_mask(
    positions: PyReadonlyArray2<'_, f64>,
    x: Vec<f64>,
    y: Vec<f64>,
    mask: PyReadonlyArray2<'_, bool>,
    tolerance: f64,
) -> PyResult<Vec<usize>> {
    let positions = scan_positions("positions_in_mask", &positions)?;
    let grid = grid_from_axes(x, y)?;
    let config = SelectionConfig::default().with_tolerance(tolerance);
    let selected =
        nmview_algorithms::positions_in_mask(&positions, &grid, &mask.as_array(), &config)
            .map_err(|e| core_error("positions_in_mask", e))?;
    Ok(selected.into_iter().collect())
}

/// Index of the scan position closest to `(x, y)`.
#[pyfunction]
fn nearest_position(positions: PyReadonlyArray2<'_, f64>, x: f64, y: f64) -> PyResult<usize> {
    let positions = scan_positions("nearest_position", &positions)?;
    nmview_algorithms::nearest_position(&positions, x, y)
        .map_err(|e| core_error("nearest_position", e))
}

/// Mean of each spectrum over the channels between `lower` and `upper`.
#[pyfunction]
fn reduce_window<'py>(
    py: Python<'py>,
    data: PyReadonlyArray2<'py, f64>,
    axis: Vec<f64>,
    lower: f64,
    upper: f64,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let signal = nmview_algorithms::reduce_window(&data.as_array(), &axis, lower, upper)
        .map_err(|e| core_error("reduce_window", e))?;
    Ok(PyArray1::from_vec(py, signal))
}

/// Mean of each detector frame, optionally inside a boolean ROI.
#[pyfunction]
#[pyo3(signature = (frames, roi=None))]
fn reduce_frames<'py>(
    py: Python<'py>,
    frames: PyReadonlyArray3<'py, f64>,
    roi: Option<PyReadonlyArray2<'py, bool>>,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let roi = roi.as_ref().map(|r| r.as_array());
    let signal = nmview_algorithms::reduce_frames(&frames.as_array(), roi.as_ref())
        .map_err(|e| core_error("reduce_frames", e))?;
    Ok(PyArray1::from_vec(py, signal))
}

/// Mean spectrum over the given position indices, or over all positions.
#[pyfunction]
#[pyo3(signature = (data, indices=None))]
fn average_spectrum<'py>(
    py: Python<'py>,
    data: PyReadonlyArray2<'py, f64>,
    indices: Option<Vec<usize>>,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let selection: Option<BTreeSet<usize>> = indices.map(|i| i.into_iter().collect());
    let spectrum = nmview_algorithms::average_spectrum(&data.as_array(), selection.as_ref())
        .map_err(|e| core_error("average_spectrum", e))?;
    Ok(spectrum.into_pyarray(py))
}

/// Python module for nmview.
#[pymodule]
fn nmview(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(propagate_nearfield, m)?)?;
    m.add_function(wrap_pyfunction!(interpolated_map, m)?)?;
    m.add_function(wrap_pyfunction!(positions_in_mask, m)?)?;
    m.add_function(wrap_pyfunction!(nearest_position, m)?)?;
    m.add_function(wrap_pyfunction!(reduce_window, m)?)?;
    m.add_function(wrap_pyfunction!(reduce_frames, m)?)?;
    m.add_function(wrap_pyfunction!(average_spectrum, m)?)?;
    Ok(())
}
