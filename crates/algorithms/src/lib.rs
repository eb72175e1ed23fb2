//! # vegdensity algorithms
//!
//! Processing stages for vegetation density masks.
//!
//! ## Modules
//!
//! - **imagery**: NDVI and threshold masking
//! - **warp**: reprojection between coordinate reference systems
//! - **pipeline**: band reading, masking, reprojection and writing in one call

pub mod imagery;
pub mod pipeline;
pub mod warp;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        ndvi, normalized_difference, threshold_mask, MaskSummary, Ndvi, NdviParams,
        ThresholdMask, ThresholdParams, ThresholdRange, DEFAULT_NODATA,
    };
    pub use crate::pipeline::{
        evaluate_band_vegetation, evaluate_geotiff_vegetation, write_mask, PipelineReport,
        VegetationConfig, WriteOutcome, WritePolicy,
    };
    pub use crate::warp::{reproject, ProjWarper, Warper};
    pub use vegdensity_core::prelude::*;
}
