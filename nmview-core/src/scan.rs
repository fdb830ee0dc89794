//! Scan positions in acquisition order.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One scalar per scan position, aligned by index with [`ScanPositions`].
pub type ScanSignal = Vec<f64>;

/// Axis-aligned extent of a set of positions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    /// Extent along x.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Extent along y.
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// Sample positions of a scan, indexed by position number.
///
/// The order is the acquisition order; indices returned by selection
/// operations refer to it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")
)]
pub struct ScanPositions {
    points: Vec<(f64, f64)>,
}

impl ScanPositions {
    /// Creates a position list, rejecting NaN and infinite coordinates.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self> {
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(Error::NonFinite("scan position"));
        }
        Ok(Self { points })
    }

    /// Creates a position list from separate x and y columns.
    pub fn from_columns(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::LengthMismatch {
                what: "position columns",
                left: x.len(),
                right: y.len(),
            });
        }
        Self::new(x.iter().copied().zip(y.iter().copied()).collect())
    }

    /// Returns the number of positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if there are no positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the position with the given index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<(f64, f64)> {
        self.points.get(index).copied()
    }

    /// Returns the positions as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Returns an iterator over the positions.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.iter().copied()
    }

    /// Returns the bounding box, or `None` for an empty scan.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        let (&(x0, y0), rest) = self.points.split_first()?;
        let mut bounds = Bounds {
            x_min: x0,
            x_max: x0,
            y_min: y0,
            y_max: y0,
        };
        for &(x, y) in rest {
            bounds.x_min = bounds.x_min.min(x);
            bounds.x_max = bounds.x_max.max(x);
            bounds.y_min = bounds.y_min.min(y);
            bounds.y_max = bounds.y_max.max(y);
        }
        Some(bounds)
    }
}

impl TryFrom<Vec<(f64, f64)>> for ScanPositions {
    type Error = Error;

    fn try_from(points: Vec<(f64, f64)>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<ScanPositions> for Vec<(f64, f64)> {
    fn from(positions: ScanPositions) -> Self {
        positions.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_positions() {
        let positions = ScanPositions::new(vec![(0.0, 1.0), (2.0, -1.0), (1.0, 3.0)]).unwrap();
        assert_eq!(positions.len(), 3);
        assert!(!positions.is_empty());
        assert_eq!(positions.get(1), Some((2.0, -1.0)));
        assert_eq!(positions.get(3), None);

        let bounds = positions.bounds().unwrap();
        assert!((bounds.x_min - 0.0).abs() < f64::EPSILON);
        assert!((bounds.x_max - 2.0).abs() < f64::EPSILON);
        assert!((bounds.y_min + 1.0).abs() < f64::EPSILON);
        assert!((bounds.height() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_non_finite() {
        assert_eq!(
            ScanPositions::new(vec![(0.0, f64::NAN)]),
            Err(Error::NonFinite("scan position"))
        );
    }

    #[test]
    fn test_from_columns() {
        let positions = ScanPositions::from_columns(&[0.0, 1.0], &[5.0, 6.0]).unwrap();
        assert_eq!(positions.as_slice(), &[(0.0, 5.0), (1.0, 6.0)]);
        assert!(matches!(
            ScanPositions::from_columns(&[0.0], &[1.0, 2.0]),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_bounds() {
        assert!(ScanPositions::default().bounds().is_none());
    }
}
