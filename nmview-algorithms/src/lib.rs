//! nmview-algorithms: Propagation and scan mapping algorithms.
//!
//! This crate provides the numerical engines behind the viewer:
//! - **Near-field propagation** - angular spectrum (or Fresnel) transfer
//!   function applied to a centred 2D FFT, one output plane per distance
//! - **Scan map interpolation** - nearest-neighbour regular grid from
//!   scattered positions, backed by a bucketed spatial index
//! - **Selection** - masked map nodes back to scan position indices
//! - **Reduction** - spectral windows and detector ROIs to one value per position
//!
#![warn(missing_docs)]

pub mod fft;
mod interpolation;
mod propagation;
mod reduction;
mod selection;
pub mod spatial;

pub use interpolation::{interpolate, typical_spacing, ScanMapInterpolator};
pub use propagation::{propagate, NearfieldPropagator, PropagationStack, WavefrontPropagator};
pub use reduction::{average_spectrum, reduce_frames, reduce_full, reduce_window, window_indices};
pub use selection::{nearest_position, positions_in_mask};
pub use spatial::SpatialGrid;

// Re-export the core data model
pub use nmview_core::{
    Error, InterpolatedGrid, InterpolationConfig, MapOrigin, PropagationConfig, PropagationKernel,
    Result, ScanPositions, SelectionConfig,
};
