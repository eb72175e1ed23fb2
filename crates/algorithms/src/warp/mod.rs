//! Reprojection of rasters between coordinate reference systems
//!
//! [`reproject`] holds the bookkeeping (same-CRS fast path, destination
//! allocation, no-data handling); the geometric work goes through the
//! [`Warper`] capability so it can be replaced in tests.

mod proj;

pub use proj::ProjWarper;

use tracing::debug;
use vegdensity_core::raster::{GeoTransform, Raster};
use vegdensity_core::{Error, Result, CRS};

/// Output grid chosen for a reprojection: transform, width, height
pub type TargetGrid = (GeoTransform, usize, usize);

/// Geometric operations needed to reproject a raster
pub trait Warper {
    /// Choose a north-up grid in `dst_crs` covering the whole source extent.
    ///
    /// `bounds` is (min_x, min_y, max_x, max_y) in `src_crs`.
    fn default_transform(
        &self,
        src_crs: &CRS,
        dst_crs: &CRS,
        width: usize,
        height: usize,
        bounds: (f64, f64, f64, f64),
    ) -> Result<TargetGrid>;

    /// Resample `source` into `destination`, both georeferenced.
    ///
    /// Source cells equal to `src_nodata` are never sampled; destination
    /// cells without a valid source value are set to `dst_nodata`.
    fn resample(
        &self,
        source: &Raster<f32>,
        src_nodata: f32,
        destination: &mut Raster<f32>,
        dst_nodata: f32,
    ) -> Result<()>;
}

/// Reproject `raster` into `target`.
///
/// When the raster is already in `target` it is returned unchanged.
/// Otherwise a destination pre-filled with `nodata` is allocated on the
/// grid proposed by the warper and resampled with `nodata` on both sides.
pub fn reproject<W>(raster: Raster<f32>, target: &CRS, nodata: f32, warper: &W) -> Result<Raster<f32>>
where
    W: Warper + ?Sized,
{
    let source_crs = raster.crs().cloned().ok_or(Error::MissingCrs)?;

    if source_crs.is_equivalent(target) {
        debug!("raster already in {}, skipping reprojection", target);
        return Ok(raster);
    }

    let (transform, width, height) = warper.default_transform(
        &source_crs,
        target,
        raster.cols(),
        raster.rows(),
        raster.bounds(),
    )?;
    debug!(
        "reprojecting {} -> {}: {}x{} -> {}x{}",
        source_crs,
        target,
        raster.cols(),
        raster.rows(),
        width,
        height
    );

    let mut destination =
        Raster::filled(height, width, nodata).with_georeference(transform, Some(target.clone()));
    destination.set_nodata(Some(nodata));

    warper.resample(&raster, nodata, &mut destination, nodata)?;
    Ok(destination)
}
