//! Normalized difference vegetation index
//!
//! `NDVI = (NIR - Red) / (NIR + Red)`
//!
//! Undefined cells (zero denominator, NaN input, non-finite result) are
//! written as the no-data sentinel instead of NaN. A band's declared no-data
//! value is treated as an ordinary reflectance.

use ndarray::Zip;
use vegdensity_core::raster::Raster;
use vegdensity_core::{Algorithm, Error, Result};

use super::DEFAULT_NODATA;

/// Parameters for NDVI
#[derive(Debug, Clone, Copy)]
pub struct NdviParams {
    /// Value written to undefined cells
    pub nodata: f32,
}

impl Default for NdviParams {
    fn default() -> Self {
        Self {
            nodata: DEFAULT_NODATA,
        }
    }
}

/// NDVI algorithm; input is `(nir, red)`
#[derive(Debug, Clone, Default)]
pub struct Ndvi;

impl Algorithm for Ndvi {
    type Input = (Raster<f32>, Raster<f32>);
    type Output = Raster<f32>;
    type Params = NdviParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "NDVI"
    }

    fn description(&self) -> &'static str {
        "Normalized Difference Vegetation Index from near-infrared and red bands"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (nir, red) = input;
        ndvi(&nir, &red, params.nodata)
    }
}

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Both bands must have the same shape. The output takes the georeference of
/// `band_a` and declares `nodata` as its no-data value.
pub fn normalized_difference(
    band_a: &Raster<f32>,
    band_b: &Raster<f32>,
    nodata: f32,
) -> Result<Raster<f32>> {
    check_dimensions(band_a, band_b)?;

    let data = Zip::from(band_a.data())
        .and(band_b.data())
        .map_collect(|&a, &b| {
            let sum = a + b;
            if sum == 0.0 {
                return nodata;
            }

            let value = (a - b) / sum;
            if value.is_finite() {
                value
            } else {
                nodata
            }
        });

    let mut output = band_a.with_data(data);
    output.set_nodata(Some(nodata));
    Ok(output)
}

/// Normalized Difference Vegetation Index
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
///
/// # Arguments
/// * `nir` - Near-infrared band
/// * `red` - Red band
/// * `nodata` - Sentinel for undefined cells
pub fn ndvi(nir: &Raster<f32>, red: &Raster<f32>, nodata: f32) -> Result<Raster<f32>> {
    normalized_difference(nir, red, nodata)
}

fn check_dimensions(a: &Raster<f32>, b: &Raster<f32>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}
