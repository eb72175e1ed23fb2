//! Binary threshold masking of index rasters
//!
//! Each cell becomes one of three classes: the no-data sentinel, 255 when the
//! value lies inside an inclusive range, 0 otherwise.

use std::fmt;
use vegdensity_core::raster::{Raster, RasterElement};
use vegdensity_core::{Algorithm, Error, Result};

use super::DEFAULT_NODATA;

/// Mask value for cells inside the range
pub const VEGETATION: f32 = 255.0;
/// Mask value for valid cells outside the range
pub const BACKGROUND: f32 = 0.0;

/// Inclusive `[min, max]` range with `min < max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRange {
    min: f64,
    max: f64,
}

impl ThresholdRange {
    /// Validate and build a range.
    ///
    /// Fails with [`Error::InvalidParameter`] naming the range when
    /// `min >= max` or either bound is NaN.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min < max) {
            return Err(Error::InvalidParameter {
                name: "range",
                value: format!("[{}, {}]", min, max),
                reason: "min can not be greater or equal to max".to_string(),
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Inclusive membership test at the raster's single precision
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min as f32 && value <= self.max as f32
    }
}

impl Default for ThresholdRange {
    fn default() -> Self {
        Self { min: 0.2, max: 0.5 }
    }
}

impl fmt::Display for ThresholdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Parameters for threshold masking
#[derive(Debug, Clone, Copy)]
pub struct ThresholdParams {
    pub range: ThresholdRange,
    pub nodata: f32,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            range: ThresholdRange::default(),
            nodata: DEFAULT_NODATA,
        }
    }
}

/// Threshold mask algorithm
#[derive(Debug, Clone, Default)]
pub struct ThresholdMask;

impl Algorithm for ThresholdMask {
    type Input = Raster<f32>;
    type Output = Raster<f32>;
    type Params = ThresholdParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Threshold Mask"
    }

    fn description(&self) -> &'static str {
        "Classify cells inside an inclusive value range as 255, others as 0, keeping no-data"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(threshold_mask(&input, params.range, params.nodata))
    }
}

/// Classify every cell of `index` against `range`.
///
/// - cells equal to `nodata` (or NaN) stay `nodata`
/// - cells with `min <= v <= max` become [`VEGETATION`]
/// - all other cells become [`BACKGROUND`]
///
/// # Example
/// ```ignore
/// let range = ThresholdRange::new(0.2, 0.5)?;
/// let mask = threshold_mask(&ndvi, range, -1.0);
/// ```
pub fn threshold_mask(index: &Raster<f32>, range: ThresholdRange, nodata: f32) -> Raster<f32> {
    let data = index.data().mapv(|value| {
        // No-data is decided before the range test, even when the range covers the sentinel
        if value.is_nodata(Some(nodata)) {
            return nodata;
        }

        if range.contains(value) {
            VEGETATION
        } else {
            BACKGROUND
        }
    });

    let mut output = index.with_data(data);
    output.set_nodata(Some(nodata));
    output
}

/// Cell counts of a vegetation mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskSummary {
    pub vegetation: usize,
    pub background: usize,
    pub nodata: usize,
}

impl MaskSummary {
    /// Count the classes of a mask produced by [`threshold_mask`]
    pub fn from_mask(mask: &Raster<f32>, nodata: f32) -> Self {
        mask.data()
            .iter()
            .fold(Self::default(), |mut summary, &value| {
                if value.is_nodata(Some(nodata)) {
                    summary.nodata += 1;
                } else if value == VEGETATION {
                    summary.vegetation += 1;
                } else {
                    summary.background += 1;
                }
                summary
            })
    }

    /// Fraction of valid cells classified as vegetation
    pub fn coverage(&self) -> Option<f64> {
        let valid = self.vegetation + self.background;
        if valid == 0 {
            None
        } else {
            Some(self.vegetation as f64 / valid as f64)
        }
    }
}
