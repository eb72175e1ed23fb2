//! Error types for vegdensity

use thiserror::Error;

/// Main error type for vegdensity operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Band {band} out of range: raster has {count} band(s)")]
    BandOutOfRange { band: usize, count: usize },

    #[error("Raster has no coordinate reference system")]
    MissingCrs,

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for vegdensity operations
pub type Result<T> = std::result::Result<T, Error>;
