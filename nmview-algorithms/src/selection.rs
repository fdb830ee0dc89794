//! Geometric selection of scan positions.
//!
//! A mask drawn on an interpolated map selects every position whose
//! nearest masked node lies closer than `tolerance` grid steps. This is a
//! cheap approximate containment test, not an exact point-in-polygon test:
//! positions just outside a masked region's edge can be included. Masked
//! nodes sit on the grid lattice, so only the nodes within the tolerance
//! radius of each position are visited.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc
)]

use log::debug;
use ndarray::ArrayView2;
use nmview_core::error::{Error, Result};
use nmview_core::scan::ScanPositions;
use nmview_core::{InterpolatedGrid, MapOrigin, SelectionConfig};
use std::collections::BTreeSet;

/// Indices of the positions lying within the masked part of `grid`.
///
/// `mask` must have the shape of `grid.values()`. An empty mask selects
/// nothing.
pub fn positions_in_mask(
    positions: &ScanPositions,
    grid: &InterpolatedGrid,
    mask: &ArrayView2<'_, bool>,
    config: &SelectionConfig,
) -> Result<BTreeSet<usize>> {
    let (rows, cols) = grid.dim();
    if mask.dim() != (rows, cols) {
        return Err(Error::shape_mismatch(
            "selection mask",
            &[rows, cols],
            mask.shape(),
        ));
    }
    let tolerance = config.tolerance;
    if !(tolerance.is_finite() && tolerance > 0.0) {
        return Err(Error::InvalidParameter {
            name: "selection tolerance",
            value: tolerance,
        });
    }

    let mut selected = BTreeSet::new();
    let masked = mask.iter().filter(|&&m| m).count();
    if masked == 0 {
        debug!("selection mask is empty");
        return Ok(selected);
    }

    let step = grid.spacing();
    let radius2 = (tolerance * step).powi(2);
    let (xs, ys) = (grid.x_coords(), grid.y_coords());

    for (index, (px, py)) in positions.iter().enumerate() {
        let col_pos = (px - xs[0]) / step;
        let row_pos = match grid.origin() {
            MapOrigin::UpperLeft => (ys[0] - py) / step,
            MapOrigin::LowerLeft => (py - ys[0]) / step,
        };
        let (Some(col_range), Some(row_range)) = (
            window(col_pos, tolerance, cols),
            window(row_pos, tolerance, rows),
        ) else {
            continue;
        };

        let hit = row_range.clone().any(|r| {
            col_range.clone().any(|c| {
                mask[(r, c)] && (xs[c] - px).powi(2) + (ys[r] - py).powi(2) < radius2
            })
        });
        if hit {
            selected.insert(index);
        }
    }

    debug!(
        "selected {} of {} positions from {masked} masked nodes",
        selected.len(),
        positions.len()
    );
    Ok(selected)
}

/// Node indices within `tolerance` steps of fractional index `at`, clamped
/// to `0..len`.
fn window(at: f64, tolerance: f64, len: usize) -> Option<std::ops::RangeInclusive<usize>> {
    let lo = (at - tolerance).floor().max(0.0);
    let hi = (at + tolerance).ceil().min(len as f64 - 1.0);
    if !(lo.is_finite() && hi.is_finite()) || hi < lo {
        return None;
    }
    Some(lo as usize..=hi as usize)
}

/// Index of the position closest to `(x, y)`; ties go to the lowest index.
pub fn nearest_position(positions: &ScanPositions, x: f64, y: f64) -> Result<usize> {
    if !(x.is_finite() && y.is_finite()) {
        return Err(Error::NonFinite("query point"));
    }
    let mut best: Option<(usize, f64)> = None;
    for (i, (px, py)) in positions.iter().enumerate() {
        let d2 = (px - x).powi(2) + (py - y).powi(2);
        match best {
            Some((_, bd2)) if d2 >= bd2 => {}
            _ => best = Some((i, d2)),
        }
    }
    best.map(|(i, _)| i).ok_or(Error::TooFewPositions {
        required: 1,
        actual: 0,
    })
}
