//! Regular-grid maps from scattered scan positions.
//!
//! The grid step is the median nearest-neighbour distance of the scan
//! divided by the oversampling factor, and every node takes the value of
//! its nearest scan position. Nearest-neighbour filling keeps hard edges
//! at the borders of the scanned area.
#![allow(
    clippy::cast_possible_truncation,
    clippy::float_cmp,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc
)]

use crate::spatial::{bucket_size, SpatialGrid};
use log::debug;
use ndarray::{Array2, ArrayView2};
use nmview_core::alloc::try_filled;
use nmview_core::error::{Error, Result};
use nmview_core::scan::ScanPositions;
use nmview_core::{InterpolatedGrid, InterpolationConfig, MapOrigin, SelectionConfig};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Relative slack when counting grid nodes along an axis.
const NODE_EPSILON: f64 = 1e-6;

/// Builds maps from scan data and maps selections back onto positions.
#[derive(Debug, Clone, Default)]
pub struct ScanMapInterpolator {
    config: InterpolationConfig,
    selection: SelectionConfig,
}

impl ScanMapInterpolator {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: InterpolationConfig) -> Self {
        Self {
            config,
            selection: SelectionConfig::default(),
        }
    }

    /// Set the selection configuration used by [`Self::positions_in_mask`].
    #[must_use]
    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    /// Get interpolation configuration.
    #[must_use]
    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    /// Get selection configuration.
    #[must_use]
    pub fn selection(&self) -> &SelectionConfig {
        &self.selection
    }

    /// Interpolates one value per position onto a regular grid.
    pub fn interpolate(&self, positions: &ScanPositions, values: &[f64]) -> Result<InterpolatedGrid> {
        interpolate(positions, values, &self.config)
    }

    /// Indices of the positions lying within the masked part of `grid`.
    pub fn positions_in_mask(
        &self,
        positions: &ScanPositions,
        grid: &InterpolatedGrid,
        mask: &ArrayView2<'_, bool>,
    ) -> Result<BTreeSet<usize>> {
        crate::selection::positions_in_mask(positions, grid, mask, &self.selection)
    }
}

/// Characteristic step of a scan: the median distance from each position
/// to its nearest distinct neighbour.
pub fn typical_spacing(positions: &ScanPositions) -> Result<f64> {
    if positions.len() < 2 {
        return Err(Error::TooFewPositions {
            required: 2,
            actual: positions.len(),
        });
    }
    let points = positions.as_slice();
    let index = SpatialGrid::new(points, bucket_size(points));

    let mut distances: Vec<f64> = points
        .iter()
        .filter_map(|&(x, y)| index.nearest_where(x, y, |_, d2| d2 > 0.0))
        .map(|(_, d2)| d2.sqrt())
        .collect();
    if distances.is_empty() {
        return Err(Error::DegenerateGeometry(
            "all scan positions coincide".to_string(),
        ));
    }
    distances.sort_by(f64::total_cmp);

    let mid = distances.len() / 2;
    let median = if distances.len() % 2 == 0 {
        0.5 * (distances[mid - 1] + distances[mid])
    } else {
        distances[mid]
    };
    Ok(median)
}

/// Interpolates one value per position onto a regular grid with
/// nearest-neighbour filling.
pub fn interpolate(
    positions: &ScanPositions,
    values: &[f64],
    config: &InterpolationConfig,
) -> Result<InterpolatedGrid> {
    if positions.len() != values.len() {
        return Err(Error::LengthMismatch {
            what: "interpolation input",
            left: positions.len(),
            right: values.len(),
        });
    }
    if config.oversampling == 0 {
        return Err(Error::InvalidParameter {
            name: "oversampling",
            value: 0.0,
        });
    }
    check_geometry(positions)?;

    let scan_step = typical_spacing(positions)?;
    let step = scan_step / f64::from(config.oversampling);
    let Some(bounds) = positions.bounds() else {
        return Err(Error::TooFewPositions {
            required: 2,
            actual: 0,
        });
    };

    // one lattice anchored at (x_min, y_min); the origin only orders the rows
    let cols = node_count(bounds.width(), step);
    let rows = node_count(bounds.height(), step);
    let x: Vec<f64> = (0..cols).map(|j| bounds.x_min + j as f64 * step).collect();
    let mut y: Vec<f64> = (0..rows).map(|i| bounds.y_min + i as f64 * step).collect();
    if config.origin == MapOrigin::UpperLeft {
        y.reverse();
    }

    let total = rows.checked_mul(cols).ok_or(Error::OutOfMemory { bytes: usize::MAX })?;
    debug!(
        "interpolating {} positions onto {rows}x{cols} grid (step {step:.4e}, oversampling {})",
        positions.len(),
        config.oversampling
    );

    let mut buffer = try_filled(total, f64::NAN)?;
    let index = SpatialGrid::new(positions.as_slice(), scan_step);
    let fill_row = |(row, chunk): (usize, &mut [f64])| {
        let node_y = y[row];
        for (value, &node_x) in chunk.iter_mut().zip(&x) {
            if let Some((nearest, _)) = index.nearest(node_x, node_y) {
                *value = values[nearest];
            }
        }
    };
    if config.parallel {
        buffer.par_chunks_mut(cols).enumerate().for_each(fill_row);
    } else {
        buffer.chunks_mut(cols).enumerate().for_each(fill_row);
    }

    let values = Array2::from_shape_vec((rows, cols), buffer)
        .map_err(|_| Error::shape_mismatch("interpolated map", &[rows, cols], &[total]))?;
    InterpolatedGrid::new(x, y, values, step, config.origin)
}

/// Number of nodes from the minimum up to the first node at or past
/// `extent`, so the lattice covers the whole bounding box.
fn node_count(extent: f64, step: f64) -> usize {
    (extent / step - NODE_EPSILON).ceil().max(0.0) as usize + 1
}

/// Rejects scans whose positions coincide or lie on one line.
fn check_geometry(positions: &ScanPositions) -> Result<()> {
    if positions.len() < 2 {
        return Err(Error::TooFewPositions {
            required: 2,
            actual: positions.len(),
        });
    }
    let points = positions.as_slice();
    let (x0, y0) = points[0];
    let (far, d2) = points
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| (i, (x - x0).powi(2) + (y - y0).powi(2)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    if d2 == 0.0 {
        return Err(Error::DegenerateGeometry(
            "all scan positions coincide".to_string(),
        ));
    }

    let (ux, uy) = (points[far].0 - x0, points[far].1 - y0);
    let tolerance = 1e-9 * d2;
    let off_line = points
        .iter()
        .any(|&(x, y)| (ux * (y - y0) - uy * (x - x0)).abs() > tolerance);
    if off_line {
        Ok(())
    } else {
        Err(Error::DegenerateGeometry(
            "scan positions are colinear".to_string(),
        ))
    }
}
