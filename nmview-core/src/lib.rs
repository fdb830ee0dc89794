//! nmview-core: Core types for scanning X-ray microscopy processing.
//!
//! This crate provides the data model shared by the wavefront propagator
//! and the scan map interpolator: complex fields, scan positions,
//! interpolated grids and selection masks, together with their
//! configuration and error types.
//!

pub mod alloc;
pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod scan;

pub use config::{
    InterpolationConfig, MapOrigin, PropagationConfig, PropagationKernel, SelectionConfig,
};
pub use error::{Error, ErrorKind, Result};
pub use field::{wavelength, ComplexField};
pub use grid::{InterpolatedGrid, SelectionMask};
pub use scan::{Bounds, ScanPositions, ScanSignal};

pub use num_complex::Complex64;
