//! Vegetation density pipeline
//!
//! read bands -> NDVI -> threshold mask -> reproject -> write

use std::path::Path;

use tracing::{debug, info, warn};
use vegdensity_core::io::RasterDriver;
use vegdensity_core::raster::{GeoTransform, Raster};
use vegdensity_core::{Error, Result, CRS};

use crate::imagery::{ndvi, threshold_mask, MaskSummary, ThresholdRange, DEFAULT_NODATA};
use crate::warp::{reproject, Warper};

/// What to do when the output file can not be written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Log the failure and report it in [`WriteOutcome::Failed`]
    #[default]
    BestEffort,
    /// Return the failure as an error
    Strict,
}

/// Result of a write attempt under [`WritePolicy::BestEffort`]
#[derive(Debug)]
#[must_use]
pub enum WriteOutcome {
    Written,
    Failed(Error),
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written)
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct VegetationConfig {
    /// Output coordinate reference system
    pub crs: CRS,
    /// Inclusive NDVI range classified as vegetation
    pub range: ThresholdRange,
    /// 1-based band index of the red band
    pub red_band: usize,
    /// 1-based band index of the near-infrared band
    pub nir_band: usize,
    /// No-data sentinel of the index and the mask
    pub nodata: f32,
    pub write_policy: WritePolicy,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            crs: CRS::wgs84(),
            range: ThresholdRange::default(),
            red_band: 6,
            nir_band: 8,
            nodata: DEFAULT_NODATA,
            write_policy: WritePolicy::default(),
        }
    }
}

/// Summary of a pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    /// Class counts of the mask before reprojection
    pub summary: MaskSummary,
    /// `(rows, cols)` of the written grid
    pub shape: (usize, usize),
    /// Transform of the written grid
    pub transform: GeoTransform,
    pub write: WriteOutcome,
}

/// NDVI of `(nir, red)` classified against `range`.
///
/// Output values are `nodata`, 0 or 255 and the grid keeps the georeference
/// of `nir`.
pub fn evaluate_band_vegetation(
    red: &Raster<f32>,
    nir: &Raster<f32>,
    range: ThresholdRange,
    nodata: f32,
) -> Result<Raster<f32>> {
    let index = ndvi(nir, red, nodata)?;
    Ok(threshold_mask(&index, range, nodata))
}

/// Write `mask` to `path` through `driver`, applying `policy` on failure
pub fn write_mask<D>(
    driver: &D,
    path: &Path,
    mask: &Raster<f32>,
    policy: WritePolicy,
) -> Result<WriteOutcome>
where
    D: RasterDriver + ?Sized,
{
    match driver.write(path, mask) {
        Ok(()) => {
            debug!("mask written to {}", path.display());
            Ok(WriteOutcome::Written)
        }
        Err(err) => match policy {
            WritePolicy::Strict => Err(err),
            WritePolicy::BestEffort => {
                warn!("unable to write {}: {}", path.display(), err);
                Ok(WriteOutcome::Failed(err))
            }
        },
    }
}

/// Run the whole pipeline from a multi-band raster to a mask file
pub fn evaluate_geotiff_vegetation<D, W>(
    input: &Path,
    output: &Path,
    config: &VegetationConfig,
    driver: &D,
    warper: &W,
) -> Result<PipelineReport>
where
    D: RasterDriver + ?Sized,
    W: Warper + ?Sized,
{
    let mut bands = driver.read_bands(input, &[config.red_band, config.nir_band])?;
    let count = bands.len();
    let (nir, red) = match (bands.pop(), bands.pop()) {
        (Some(nir), Some(red)) if count == 2 => (nir, red),
        _ => {
            return Err(Error::Other(format!(
                "expected 2 bands from {}, got {}",
                input.display(),
                count
            )))
        }
    };
    debug!(
        "read bands red={} nir={} ({} x {})",
        config.red_band,
        config.nir_band,
        red.cols(),
        red.rows()
    );

    let mask = evaluate_band_vegetation(&red, &nir, config.range, config.nodata)?;
    let summary = MaskSummary::from_mask(&mask, config.nodata);
    info!(
        "vegetation: {}, background: {}, nodata: {}",
        summary.vegetation, summary.background, summary.nodata
    );

    let mut projected = reproject(mask, &config.crs, config.nodata, warper)?;
    projected.set_crs(Some(config.crs.clone()));
    projected.set_nodata(Some(config.nodata));

    let write = write_mask(driver, output, &projected, config.write_policy)?;

    Ok(PipelineReport {
        summary,
        shape: projected.shape(),
        transform: *projected.transform(),
        write,
    })
}
