/// Error types for transform, editing and projection failures
use thiserror::Error;

/// A local, synchronous failure of a geometry operation.
///
/// None of these are retried: each one names an input that is
/// mathematically invalid for the operation that rejected it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// The determinant `a·d − b·c` is zero within the inversion tolerance.
    #[error("degenerate transform: determinant {determinant} is zero within tolerance")]
    DegenerateTransform { determinant: f64 },
    /// A zoom factor that is not a positive finite number.
    #[error("invalid zoom factor {0}: cannot zoom by a non-positive amount")]
    InvalidZoomFactor(f64),
    /// A voxel height that is negative or not finite.
    #[error("invalid height {0}: height must be a non-negative number")]
    InvalidHeight(f64),
    /// Pixels per height unit that are negative or not finite.
    #[error("invalid height scale {0}: must be a non-negative number")]
    InvalidHeightScale(f64),
    /// A grid cell without exactly 4 corners, or with zero area.
    #[error("malformed grid cell: {0}")]
    MalformedGridCell(String),
    /// A pan offset, rotation angle or coefficient that is NaN or infinite.
    #[error("non-finite {0}")]
    NonFinite(&'static str),
}

pub type Result<T> = std::result::Result<T, GeometryError>;
