//! I/O for georeferenced rasters
//!
//! [`RasterDriver`] is the narrow capability the processing pipeline needs
//! from a raster library: read selected bands of a file, write a single-band
//! file. [`GeoTiffDriver`] implements it on the native GeoTIFF codec.

mod geokeys;
mod geotiff;

pub use geotiff::{
    read_geotiff, read_geotiff_bands, read_geotiff_from_buffer, write_geotiff,
    write_geotiff_to_buffer, GeoTags, GeoTiffCompression, GeoTiffOptions, GeoTiffSample,
};

use crate::error::Result;
use crate::raster::Raster;
use std::path::Path;

/// Read/write access to raster files
pub trait RasterDriver {
    /// Read the given 1-indexed bands of `path` as 32-bit float rasters,
    /// each carrying the file's georeference and no-data value.
    fn read_bands(&self, path: &Path, bands: &[usize]) -> Result<Vec<Raster<f32>>>;

    /// Write `raster` as a single-band file, replacing anything at `path`
    fn write(&self, path: &Path, raster: &Raster<f32>) -> Result<()>;
}

/// [`RasterDriver`] backed by the native GeoTIFF reader and writer
#[derive(Debug, Clone, Default)]
pub struct GeoTiffDriver {
    options: GeoTiffOptions,
}

impl GeoTiffDriver {
    pub fn new(options: GeoTiffOptions) -> Self {
        Self { options }
    }
}

impl RasterDriver for GeoTiffDriver {
    fn read_bands(&self, path: &Path, bands: &[usize]) -> Result<Vec<Raster<f32>>> {
        read_geotiff_bands(path, bands)
    }

    fn write(&self, path: &Path, raster: &Raster<f32>) -> Result<()> {
        write_geotiff(raster, path, Some(self.options.clone()))
    }
}
