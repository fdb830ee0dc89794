//! Error types for nmview-core.

use thiserror::Error;

/// Result type alias for nmview operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`] values.
///
/// Presentation code usually only needs to tell "bad input" from "no data"
/// from "resource exhaustion"; the variants of [`Error`] carry the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Mismatched or invalid array shapes.
    Shape,
    /// Scan geometry too degenerate to infer a grid.
    DegenerateGeometry,
    /// Invalid physical or numerical parameter.
    Parameter,
    /// An allocation could not be satisfied.
    OutOfMemory,
    /// The request selected no data.
    NoData,
}

/// Core error types for nmview operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The wavefront is not an N x N array.
    #[error("wavefront array must be N x N, got {rows} x {cols}")]
    NonSquareField { rows: usize, cols: usize },

    /// Two arrays that must agree in shape do not.
    #[error("{what}: expected shape {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Per-position sequences of different length.
    #[error("{what}: {left} positions but {right} values")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    /// Scan geometry from which no grid spacing can be inferred.
    #[error("degenerate scan geometry: {0}")]
    DegenerateGeometry(String),

    /// Fewer positions than an operation needs.
    #[error("need at least {required} scan positions, got {actual}")]
    TooFewPositions { required: usize, actual: usize },

    /// Invalid physical or numerical parameter.
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// A non-finite coordinate or bound.
    #[error("non-finite {0}")]
    NonFinite(&'static str),

    /// Propagation requested with no target planes.
    #[error("no propagation distances given")]
    NoDistances,

    /// A position index outside the scan.
    #[error("position index {index} out of range for {len} positions")]
    IndexOutOfRange { index: usize, len: usize },

    /// A channel axis with no entries.
    #[error("data axis is empty")]
    EmptyAxis,

    /// A selection that contains nothing to average.
    #[error("selection is empty")]
    EmptySelection,

    /// Allocation failure, surfaced instead of aborting.
    #[error("out of memory allocating {bytes} bytes")]
    OutOfMemory { bytes: usize },
}

impl Error {
    /// Returns the coarse class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NonSquareField { .. }
            | Error::ShapeMismatch { .. }
            | Error::LengthMismatch { .. } => ErrorKind::Shape,
            Error::DegenerateGeometry(_) | Error::TooFewPositions { .. } => {
                ErrorKind::DegenerateGeometry
            }
            Error::InvalidParameter { .. }
            | Error::NonFinite(_)
            | Error::NoDistances
            | Error::IndexOutOfRange { .. } => ErrorKind::Parameter,
            Error::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Error::EmptyAxis | Error::EmptySelection => ErrorKind::NoData,
        }
    }

    /// Builds a [`Error::ShapeMismatch`] from two shapes.
    #[must_use]
    pub fn shape_mismatch(what: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Error::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
