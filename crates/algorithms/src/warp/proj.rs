//! Pure-Rust warper on top of proj4rs
//!
//! Output grid selection follows the usual "suggested warp output" approach:
//! sample the source extent densely, take the envelope of the transformed
//! samples and keep the source pixel count along the diagonal.
//! Resampling is nearest neighbour.

use super::{TargetGrid, Warper};
use vegdensity_core::raster::{GeoTransform, Raster, RasterElement};
use vegdensity_core::{CoordinateTransformer, Error, Result, CRS};

/// [`Warper`] backed by [`CoordinateTransformer`]
#[derive(Debug, Clone)]
pub struct ProjWarper {
    /// Sample points per edge of the source extent (grid of n x n)
    samples_per_edge: usize,
}

impl ProjWarper {
    pub fn new(samples_per_edge: usize) -> Self {
        Self {
            samples_per_edge: samples_per_edge.max(2),
        }
    }
}

impl Default for ProjWarper {
    fn default() -> Self {
        Self::new(21)
    }
}

/// Running bounding box of transformed points
struct Envelope {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Envelope {
    fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    fn expand(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

impl Warper for ProjWarper {
    fn default_transform(
        &self,
        src_crs: &CRS,
        dst_crs: &CRS,
        width: usize,
        height: usize,
        bounds: (f64, f64, f64, f64),
    ) -> Result<TargetGrid> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }

        let transformer = CoordinateTransformer::new(src_crs, dst_crs)?;
        let (min_x, min_y, max_x, max_y) = bounds;
        let n = self.samples_per_edge;
        let step = |lo: f64, hi: f64, i: usize| lo + (hi - lo) * i as f64 / (n - 1) as f64;

        let mut envelope = Envelope::empty();
        for i in 0..n {
            for j in 0..n {
                let x = step(min_x, max_x, i);
                let y = step(min_y, max_y, j);
                // Points outside the target projection's domain are skipped
                if let Ok((tx, ty)) = transformer.transform(x, y) {
                    envelope.expand(tx, ty);
                }
            }
        }

        if envelope.is_empty() {
            return Err(Error::Projection(format!(
                "no point of the source extent could be transformed from {} to {}",
                src_crs, dst_crs
            )));
        }

        let pixel_diagonal = ((width * width + height * height) as f64).sqrt();
        let pixel_size = envelope.width().hypot(envelope.height()) / pixel_diagonal;
        if !(pixel_size > 0.0 && pixel_size.is_finite()) {
            return Err(Error::Projection(format!(
                "degenerate extent after transforming to {}",
                dst_crs
            )));
        }

        let out_width = ((envelope.width() / pixel_size).round() as usize).max(1);
        let out_height = ((envelope.height() / pixel_size).round() as usize).max(1);

        Ok((
            GeoTransform::north_up(envelope.min_x, envelope.max_y, pixel_size),
            out_width,
            out_height,
        ))
    }

    fn resample(
        &self,
        source: &Raster<f32>,
        src_nodata: f32,
        destination: &mut Raster<f32>,
        dst_nodata: f32,
    ) -> Result<()> {
        let src_crs = source.crs().ok_or(Error::MissingCrs)?;
        let dst_crs = destination.crs().ok_or(Error::MissingCrs)?;

        // Inverse mapping: destination pixel centers into the source grid
        let transformer = CoordinateTransformer::new(dst_crs, src_crs)?;
        let src_transform = *source.transform();
        let dst_transform = *destination.transform();
        let (src_rows, src_cols) = source.shape();
        let src = source.data();

        let sample = |row: usize, col: usize| -> Option<f32> {
            let (x, y) = dst_transform.pixel_to_geo(col, row);
            let (sx, sy) = transformer.transform(x, y).ok()?;
            let (c, r) = src_transform.geo_to_pixel(sx, sy);
            if !(c >= 0.0 && r >= 0.0) {
                return None;
            }
            let (ci, ri) = (c.floor() as usize, r.floor() as usize);
            if ci >= src_cols || ri >= src_rows {
                return None;
            }
            let value = src[(ri, ci)];
            (!value.is_nodata(Some(src_nodata))).then_some(value)
        };

        for ((row, col), cell) in destination.data_mut().indexed_iter_mut() {
            *cell = sample(row, col).unwrap_or(dst_nodata);
        }

        Ok(())
    }
}
