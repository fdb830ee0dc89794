//! Configuration for propagation, interpolation and selection.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Transfer function used for near-field propagation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PropagationKernel {
    /// Angular spectrum kernel `exp(2πi z/λ (sqrt(1 - λ²q²) - 1))`.
    #[default]
    AngularSpectrum,
    /// Paraxial Fresnel kernel `exp(-iπλz q²)`.
    Fresnel,
}

/// Configuration for near-field wavefront propagation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PropagationConfig {
    /// Transfer function applied in frequency space.
    pub kernel: PropagationKernel,
}

impl PropagationConfig {
    /// Set the transfer function.
    #[must_use]
    pub fn with_kernel(mut self, kernel: PropagationKernel) -> Self {
        self.kernel = kernel;
        self
    }
}

/// Placement of the first grid row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum MapOrigin {
    /// Row 0 holds the largest y; the map reads upright when row 0 is drawn on top.
    #[default]
    UpperLeft,
    /// Row 0 holds the smallest y.
    LowerLeft,
}

/// Configuration for building interpolated scan maps.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterpolationConfig {
    /// Grid nodes per typical scan step (>= 1).
    pub oversampling: u32,
    /// Row ordering of the produced grid.
    pub origin: MapOrigin,
    /// Fill grid rows on the rayon pool.
    pub parallel: bool,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            oversampling: 1,
            origin: MapOrigin::UpperLeft,
            parallel: false,
        }
    }
}

impl InterpolationConfig {
    /// Set the oversampling factor.
    #[must_use]
    pub fn with_oversampling(mut self, oversampling: u32) -> Self {
        self.oversampling = oversampling;
        self
    }

    /// Set the grid origin.
    #[must_use]
    pub fn with_origin(mut self, origin: MapOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Set whether to fill the grid in parallel.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Configuration for mask-to-position lookups.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectionConfig {
    /// Inclusion radius in units of the grid spacing.
    ///
    /// A position is selected when its squared distance to the nearest
    /// masked node is strictly below `(tolerance * spacing)^2`.
    pub tolerance: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { tolerance: 1.0 }
    }
}

impl SelectionConfig {
    /// Set the inclusion radius in grid cells.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InterpolationConfig::default();
        assert_eq!(config.oversampling, 1);
        assert_eq!(config.origin, MapOrigin::UpperLeft);
        assert!(!config.parallel);
        assert_eq!(
            PropagationConfig::default().kernel,
            PropagationKernel::AngularSpectrum
        );
        assert!((SelectionConfig::default().tolerance - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_builders() {
        let config = InterpolationConfig::default()
            .with_oversampling(4)
            .with_origin(MapOrigin::LowerLeft)
            .with_parallel(true);
        assert_eq!(config.oversampling, 4);
        assert_eq!(config.origin, MapOrigin::LowerLeft);
        assert!(config.parallel);

        let config = SelectionConfig::default().with_tolerance(std::f64::consts::SQRT_2);
        assert!((config.tolerance - std::f64::consts::SQRT_2).abs() < f64::EPSILON);

        let config = PropagationConfig::default().with_kernel(PropagationKernel::Fresnel);
        assert_eq!(config.kernel, PropagationKernel::Fresnel);
    }
}
