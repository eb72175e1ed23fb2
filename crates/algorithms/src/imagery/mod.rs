//! Imagery analysis algorithms
//!
//! - NDVI: normalized difference of near-infrared and red bands
//! - Threshold mask: three-way classification of an index raster

mod indices;
mod threshold;

pub use indices::{ndvi, normalized_difference, Ndvi, NdviParams};
pub use threshold::{
    threshold_mask, MaskSummary, ThresholdMask, ThresholdParams, ThresholdRange, BACKGROUND,
    VEGETATION,
};

/// No-data sentinel used when none is configured
pub const DEFAULT_NODATA: f32 = -1.0;
