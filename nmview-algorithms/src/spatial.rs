//! Spatial indexing for nearest-neighbour lookup among scan positions.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]

use std::collections::HashMap;

/// Bucketed 2D index over a fixed set of points.
///
/// The plane is divided into square cells; queries visit cells in rings of
/// growing Chebyshev distance around the query cell and stop as soon as no
/// unvisited cell can hold a closer point.
#[derive(Debug, Default)]
pub struct SpatialGrid {
    cell_size: f64,
    origin: (f64, f64),
    cells: HashMap<(i64, i64), Vec<usize>>,
    points: Vec<(f64, f64)>,
    min_cell: (i64, i64),
    max_cell: (i64, i64),
}

impl SpatialGrid {
    /// Create a new spatial grid over `points` with the given cell size.
    ///
    /// A non-positive or non-finite cell size falls back to 1.
    pub fn new(points: &[(f64, f64)], cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        let origin = points.iter().fold((f64::INFINITY, f64::INFINITY), |acc, p| {
            (acc.0.min(p.0), acc.1.min(p.1))
        });
        let origin = if origin.0.is_finite() { origin } else { (0.0, 0.0) };

        let mut grid = Self {
            cell_size,
            origin,
            cells: HashMap::new(),
            points: points.to_vec(),
            min_cell: (i64::MAX, i64::MAX),
            max_cell: (i64::MIN, i64::MIN),
        };
        for (i, &(x, y)) in points.iter().enumerate() {
            let cell = grid.cell_of(x, y);
            grid.min_cell = (grid.min_cell.0.min(cell.0), grid.min_cell.1.min(cell.1));
            grid.max_cell = (grid.max_cell.0.max(cell.0), grid.max_cell.1.max(cell.1));
            grid.cells.entry(cell).or_default().push(i);
        }
        grid
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no points are indexed.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cell edge length.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        (
            ((x - self.origin.0) / self.cell_size).floor() as i64,
            ((y - self.origin.1) / self.cell_size).floor() as i64,
        )
    }

    /// Query the `(2 * rings + 1)^2` cell neighbourhood around a point.
    pub fn query_neighborhood(&self, x: f64, y: f64, rings: i64) -> Vec<usize> {
        let (cx, cy) = self.cell_of(x, y);
        let mut result = Vec::new();
        for dx in -rings..=rings {
            for dy in -rings..=rings {
                if let Some(indices) = self.cells.get(&(cx + dx, cy + dy)) {
                    result.extend(indices.iter().copied());
                }
            }
        }
        result
    }

    /// Nearest point to `(x, y)` as `(index, squared distance)`.
    ///
    /// Ties go to the lowest index.
    pub fn nearest(&self, x: f64, y: f64) -> Option<(usize, f64)> {
        self.nearest_where(x, y, |_, _| true)
    }

    /// Nearest point accepted by `accept(index, squared distance)`.
    ///
    /// Ties go to the lowest index.
    pub fn nearest_where<F>(&self, x: f64, y: f64, accept: F) -> Option<(usize, f64)>
    where
        F: Fn(usize, f64) -> bool,
    {
        if self.points.is_empty() {
            return None;
        }
        let (cx, cy) = self.cell_of(x, y);
        let gap = |c: i64, lo: i64, hi: i64| lo.saturating_sub(c).max(c.saturating_sub(hi)).max(0);
        let first_ring = gap(cx, self.min_cell.0, self.max_cell.0)
            .max(gap(cy, self.min_cell.1, self.max_cell.1));
        let last_ring = cx
            .saturating_sub(self.min_cell.0)
            .max(self.max_cell.0.saturating_sub(cx))
            .max(cy.saturating_sub(self.min_cell.1))
            .max(self.max_cell.1.saturating_sub(cy));

        let mut best: Option<(usize, f64)> = None;
        let consider = |cell: (i64, i64), best: &mut Option<(usize, f64)>| {
            let Some(indices) = self.cells.get(&cell) else {
                return;
            };
            for &i in indices {
                let (px, py) = self.points[i];
                let d2 = (px - x).powi(2) + (py - y).powi(2);
                if accept(i, d2) && is_closer(*best, i, d2) {
                    *best = Some((i, d2));
                }
            }
        };

        // past this many cell lookups a linear scan is cheaper
        let budget = self.points.len() as u64 + 9;
        let mut visited = 0_u64;
        for r in first_ring..=last_ring {
            let ring_cells = if r == 0 { 1 } else { r.unsigned_abs().saturating_mul(8) };
            visited = visited.saturating_add(ring_cells);
            if visited > budget {
                return self.scan_all(x, y, &accept);
            }
            if r == 0 {
                consider((cx, cy), &mut best);
            } else {
                for d in -r..=r {
                    consider((cx + d, cy - r), &mut best);
                    consider((cx + d, cy + r), &mut best);
                }
                for d in (1 - r)..r {
                    consider((cx - r, cy + d), &mut best);
                    consider((cx + r, cy + d), &mut best);
                }
            }
            // anything beyond this ring is farther than r * cell_size
            if let Some((_, d2)) = best {
                let reach = r as f64 * self.cell_size;
                if d2 <= reach * reach {
                    break;
                }
            }
        }
        best
    }

    fn scan_all<F>(&self, x: f64, y: f64, accept: &F) -> Option<(usize, f64)>
    where
        F: Fn(usize, f64) -> bool,
    {
        let mut best = None;
        for (i, &(px, py)) in self.points.iter().enumerate() {
            let d2 = (px - x).powi(2) + (py - y).powi(2);
            if accept(i, d2) && is_closer(best, i, d2) {
                best = Some((i, d2));
            }
        }
        best
    }
}

fn is_closer(best: Option<(usize, f64)>, index: usize, d2: f64) -> bool {
    match best {
        None => true,
        Some((bi, bd2)) => d2 < bd2 || (d2 == bd2 && index < bi),
    }
}

/// Cell size giving roughly one point per cell over the bounding box.
pub fn bucket_size(points: &[(f64, f64)]) -> f64 {
    let Some(&(x0, y0)) = points.first() else {
        return 1.0;
    };
    let (mut x_min, mut x_max, mut y_min, mut y_max) = (x0, x0, y0, y0);
    for &(x, y) in points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    let (w, h) = (x_max - x_min, y_max - y_min);
    let n = points.len() as f64;
    let size = if w > 0.0 && h > 0.0 {
        (w * h / n).sqrt()
    } else {
        w.max(h) / n
    };
    if size.is_finite() && size > 0.0 {
        size
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_nearest(points: &[(f64, f64)], x: f64, y: f64) -> usize {
        let mut best = 0;
        let mut best_d2 = f64::INFINITY;
        for (i, &(px, py)) in points.iter().enumerate() {
            let d2 = (px - x).powi(2) + (py - y).powi(2);
            if d2 < best_d2 {
                best = i;
                best_d2 = d2;
            }
        }
        best
    }

    #[test]
    fn test_spatial_grid() {
        let points = vec![(100.0, 100.0), (105.0, 105.0), (300.0, 300.0)];
        let grid = SpatialGrid::new(&points, 32.0);
        let neighbors = grid.query_neighborhood(100.0, 100.0, 1);
        assert!(neighbors.contains(&0));
        assert!(neighbors.contains(&1));
        assert!(!neighbors.contains(&2));
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        // deterministic scatter on a spiral
        let points: Vec<(f64, f64)> = (0..200)
            .map(|i| {
                let t = f64::from(i) * 0.37;
                (t.cos() * t, t.sin() * t * 0.5)
            })
            .collect();
        let grid = SpatialGrid::new(&points, bucket_size(&points));
        for k in 0..50 {
            let q = (f64::from(k) * 1.3 - 30.0, f64::from(k % 7) * 4.0 - 12.0);
            let (index, _) = grid.nearest(q.0, q.1).unwrap();
            assert_eq!(index, brute_nearest(&points, q.0, q.1));
        }
    }

    #[test]
    fn test_nearest_far_outside() {
        let points = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let grid = SpatialGrid::new(&points, 0.5);
        assert_eq!(grid.nearest(50.0, -3.0).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_nearest_tie_prefers_lowest_index() {
        let points = vec![(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0)];
        let grid = SpatialGrid::new(&points, 0.7);
        assert_eq!(grid.nearest(0.0, 0.0), Some((0, 1.0)));
    }

    #[test]
    fn test_nearest_where_skips_self() {
        let points = vec![(0.0, 0.0), (0.0, 0.0), (2.0, 0.0)];
        let grid = SpatialGrid::new(&points, 1.0);
        let found = grid.nearest_where(0.0, 0.0, |i, d2| i != 0 && d2 > 0.0);
        assert_eq!(found, Some((2, 4.0)));
    }

    #[test]
    fn test_empty_grid() {
        let grid = SpatialGrid::new(&[], 1.0);
        assert!(grid.is_empty());
        assert!(grid.nearest(0.0, 0.0).is_none());
        assert!((bucket_size(&[]) - 1.0).abs() < f64::EPSILON);
    }
}
