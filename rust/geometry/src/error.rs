use thiserror::Error;

/// Errors from polygon construction.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("room mask is empty")]
    EmptyMask,
}

/// Raised when a non-positive calibration factor is supplied.
#[derive(Debug, Error)]
#[error("calibration factor must be positive, got {0}")]
pub struct ScaleError(pub f64);
