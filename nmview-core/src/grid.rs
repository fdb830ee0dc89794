//! Regular grids produced from scattered scan data.

use crate::config::MapOrigin;
use crate::error::{Error, Result};
use ndarray::Array2;

/// Boolean selection on the nodes of an [`InterpolatedGrid`].
pub type SelectionMask = Array2<bool>;

/// A regular 2D map with node coordinates and values.
///
/// Columns run along x in ascending order. Rows run along y, descending
/// for [`MapOrigin::UpperLeft`] and ascending for [`MapOrigin::LowerLeft`].
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedGrid {
    x: Vec<f64>,
    y: Vec<f64>,
    values: Array2<f64>,
    spacing: f64,
    origin: MapOrigin,
}

impl InterpolatedGrid {
    /// Creates a grid from column coordinates, row coordinates and values.
    ///
    /// `values` must have shape `(y.len(), x.len())`.
    pub fn new(
        x: Vec<f64>,
        y: Vec<f64>,
        values: Array2<f64>,
        spacing: f64,
        origin: MapOrigin,
    ) -> Result<Self> {
        if values.dim() != (y.len(), x.len()) {
            return Err(Error::shape_mismatch(
                "grid values",
                &[y.len(), x.len()],
                values.shape(),
            ));
        }
        if x.is_empty() || y.is_empty() {
            return Err(Error::shape_mismatch("grid values", &[1, 1], values.shape()));
        }
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(Error::InvalidParameter {
                name: "grid spacing",
                value: spacing,
            });
        }
        Ok(Self {
            x,
            y,
            values,
            spacing,
            origin,
        })
    }

    /// Column coordinates (x of each column).
    #[must_use]
    pub fn x_coords(&self) -> &[f64] {
        &self.x
    }

    /// Row coordinates (y of each row).
    #[must_use]
    pub fn y_coords(&self) -> &[f64] {
        &self.y
    }

    /// Node values, rows x columns.
    #[must_use]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Consumes the grid and returns the node values.
    #[must_use]
    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    /// Distance between neighbouring nodes along either axis.
    #[must_use]
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Row ordering of this grid.
    #[must_use]
    pub fn origin(&self) -> MapOrigin {
        self.origin
    }

    /// Returns `(rows, cols)`.
    #[must_use]
    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Returns the coordinates of a node.
    #[must_use]
    pub fn node_coords(&self, row: usize, col: usize) -> (f64, f64) {
        (self.x[col], self.y[row])
    }

    /// Returns full X and Y coordinate matrices, one entry per node.
    #[must_use]
    pub fn meshgrid(&self) -> (Array2<f64>, Array2<f64>) {
        let dim = self.dim();
        let xx = Array2::from_shape_fn(dim, |(_, col)| self.x[col]);
        let yy = Array2::from_shape_fn(dim, |(row, _)| self.y[row]);
        (xx, yy)
    }

    /// Returns the node nearest to `(x, y)`, if any.
    ///
    /// Nodes sit at the centres of their cells: a point maps to the node
    /// within half a step of it along each axis. Points more than half a
    /// step outside the outermost nodes map to nothing.
    #[must_use]
    pub fn node_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = axis_index((x - self.x[0]) / self.spacing, self.x.len())?;
        let offset = match self.origin {
            MapOrigin::UpperLeft => self.y[0] - y,
            MapOrigin::LowerLeft => y - self.y[0],
        };
        let row = axis_index(offset / self.spacing, self.y.len())?;
        Some((row, col))
    }

    /// Returns the value of the node nearest to `(x, y)`, see [`Self::node_at`].
    #[must_use]
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        self.node_at(x, y).map(|index| self.values[index])
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn axis_index(steps: f64, len: usize) -> Option<usize> {
    let index = steps.round();
    if !index.is_finite() || index < 0.0 {
        return None;
    }
    let index = index as usize;
    (index < len).then_some(index)
}
