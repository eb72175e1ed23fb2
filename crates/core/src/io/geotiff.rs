//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for TIFF I/O and handles the GeoTIFF tags
//! (tiepoint, pixel scale, model transformation, GeoKeys, GDAL no-data)
//! directly, so no GDAL installation is needed.

use super::geokeys::{
    self, GDAL_NODATA, GEO_KEY_DIRECTORY, MODEL_PIXEL_SCALE, MODEL_TIEPOINT, MODEL_TRANSFORMATION,
};
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{
    Gray16, Gray32, Gray32Float, Gray64Float, Gray8, GrayI16, GrayI32,
};
use tiff::encoder::{Compression, DeflateLevel, DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

/// Compression applied to written GeoTIFF files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeoTiffCompression {
    #[default]
    None,
    Lzw,
    Deflate,
}

impl From<GeoTiffCompression> for Compression {
    fn from(value: GeoTiffCompression) -> Self {
        match value {
            GeoTiffCompression::None => Compression::Uncompressed,
            GeoTiffCompression::Lzw => Compression::Lzw,
            GeoTiffCompression::Deflate => Compression::Deflate(DeflateLevel::Balanced),
        }
    }
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub compression: GeoTiffCompression,
}

/// Cell types that can be written as single-band GeoTIFF samples.
///
/// The file's sample format follows the raster's in-memory type.
pub trait GeoTiffSample: RasterElement {
    #[doc(hidden)]
    fn encode<W: Write + Seek>(
        encoder: &mut TiffEncoder<W>,
        width: u32,
        height: u32,
        data: &[Self],
        tags: &GeoTags,
    ) -> Result<()>;
}

macro_rules! impl_geotiff_sample {
    ($t:ty, $color:ty) => {
        impl GeoTiffSample for $t {
            fn encode<W: Write + Seek>(
                encoder: &mut TiffEncoder<W>,
                width: u32,
                height: u32,
                data: &[Self],
                tags: &GeoTags,
            ) -> Result<()> {
                let mut image = encoder.new_image::<$color>(width, height)?;
                tags.write(image.encoder())?;
                image.write_data(data)?;
                Ok(())
            }
        }
    };
}

impl_geotiff_sample!(u8, Gray8);
impl_geotiff_sample!(u16, Gray16);
impl_geotiff_sample!(u32, Gray32);
impl_geotiff_sample!(i16, GrayI16);
impl_geotiff_sample!(i32, GrayI32);
impl_geotiff_sample!(f32, Gray32Float);
impl_geotiff_sample!(f64, Gray64Float);

/// GeoTIFF tags attached to a written image
#[doc(hidden)]
pub struct GeoTags {
    pixel_scale: Option<[f64; 3]>,
    tiepoint: Option<[f64; 6]>,
    model_transformation: Option<[f64; 16]>,
    geokeys: Vec<u16>,
    nodata: Option<String>,
}

impl GeoTags {
    fn for_raster<T: RasterElement>(raster: &Raster<T>) -> Self {
        let gt = raster.transform();

        let (pixel_scale, tiepoint, model_transformation) = if gt.is_north_up() {
            (
                Some([gt.pixel_width, -gt.pixel_height, 0.0]),
                Some([0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0]),
                None,
            )
        } else {
            let matrix = [
                gt.pixel_width, gt.row_rotation, 0.0, gt.origin_x, //
                gt.col_rotation, gt.pixel_height, 0.0, gt.origin_y, //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ];
            (None, None, Some(matrix))
        };

        Self {
            pixel_scale,
            tiepoint,
            model_transformation,
            geokeys: geokeys::build_directory(raster.crs()),
            nodata: raster
                .nodata()
                .and_then(|nd| nd.as_f64())
                .map(|nd| nd.to_string()),
        }
    }

    fn write<W: Write + Seek, K: TiffKind>(&self, dir: &mut DirectoryEncoder<'_, W, K>) -> Result<()> {
        if let Some(scale) = &self.pixel_scale {
            dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), scale.as_slice())?;
        }
        if let Some(tiepoint) = &self.tiepoint {
            dir.write_tag(Tag::Unknown(MODEL_TIEPOINT), tiepoint.as_slice())?;
        }
        if let Some(matrix) = &self.model_transformation {
            dir.write_tag(Tag::Unknown(MODEL_TRANSFORMATION), matrix.as_slice())?;
        }
        dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), self.geokeys.as_slice())?;
        if let Some(nodata) = &self.nodata {
            dir.write_tag(Tag::Unknown(GDAL_NODATA), nodata.as_str())?;
        }
        Ok(())
    }
}

/// Read one band (1-indexed, default 1) of a GeoTIFF file into a Raster
///
/// # Example
/// ```ignore
/// let red: Raster<f32> = read_geotiff("scene.tif", Some(6))?;
/// ```
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let band = band.unwrap_or(1);
    let mut rasters = read_geotiff_bands(path, &[band])?;
    rasters
        .pop()
        .ok_or(Error::BandOutOfRange { band, count: 0 })
}

/// Read several bands (1-indexed) of a GeoTIFF file, decoding it once.
///
/// The file is closed before this function returns.
pub fn read_geotiff_bands<T, P>(path: P, bands: &[usize]) -> Result<Vec<Raster<T>>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(path.as_ref())?);
    decode_bands(file, bands)
}

/// Read one band of a GeoTIFF held in memory
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    let band = band.unwrap_or(1);
    let mut rasters = decode_bands(Cursor::new(data), &[band])?;
    rasters
        .pop()
        .ok_or(Error::BandOutOfRange { band, count: 0 })
}

/// Georeferencing metadata shared by every band of a file
struct GeoMetadata {
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<f64>,
}

fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn read_geo_metadata<R: Read + Seek>(decoder: &mut Decoder<R>) -> GeoMetadata {
    let scale = decoder.get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(geo_tag(MODEL_TIEPOINT)).ok();

    let transform = match (tiepoint, scale) {
        (Some(tiepoint), Some(scale)) => GeoTransform::from_tiepoint_scale(&tiepoint, &scale),
        _ => decoder
            .get_tag_f64_vec(geo_tag(MODEL_TRANSFORMATION))
            .ok()
            .and_then(|matrix| GeoTransform::from_model_transformation(&matrix)),
    };

    let crs = decoder
        .get_tag_u16_vec(geo_tag(GEO_KEY_DIRECTORY))
        .ok()
        .and_then(|keys| geokeys::parse_directory(&keys));

    let nodata = decoder
        .get_tag_ascii_string(geo_tag(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

    if transform.is_none() {
        tracing::debug!("no georeferencing tags found, using identity transform");
    }

    GeoMetadata {
        transform: transform.unwrap_or_default(),
        crs,
        nodata,
    }
}

fn cast_samples<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decoded_samples<T: RasterElement>(result: DecodingResult) -> Result<Vec<T>> {
    let samples = match result {
        DecodingResult::U8(buf) => cast_samples(buf),
        DecodingResult::U16(buf) => cast_samples(buf),
        DecodingResult::U32(buf) => cast_samples(buf),
        DecodingResult::U64(buf) => cast_samples(buf),
        DecodingResult::I8(buf) => cast_samples(buf),
        DecodingResult::I16(buf) => cast_samples(buf),
        DecodingResult::I32(buf) => cast_samples(buf),
        DecodingResult::I64(buf) => cast_samples(buf),
        DecodingResult::F32(buf) => cast_samples(buf),
        DecodingResult::F64(buf) => cast_samples(buf),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF sample format".to_string())),
    };
    Ok(samples)
}

/// Decode one plane (0-indexed) of a band-sequential file.
///
/// Strips and tiles are numbered plane by plane, so plane `p` starts at
/// chunk `p * chunks_per_plane`. Edge chunks are delivered without padding.
fn read_plane<T, R>(decoder: &mut Decoder<R>, plane: usize, rows: usize, cols: usize) -> Result<Vec<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let (chunk_w, chunk_h) = decoder.chunk_dimensions();
    let (chunk_w, chunk_h) = (chunk_w.max(1) as usize, chunk_h.max(1) as usize);
    let across = cols.div_ceil(chunk_w);
    let down = rows.div_ceil(chunk_h);
    let chunks_per_plane = across * down;

    let mut plane_data = vec![T::default_nodata(); rows * cols];
    for i in 0..chunks_per_plane {
        let index = u32::try_from(plane * chunks_per_plane + i)
            .map_err(|_| Error::Other(format!("chunk index overflow in plane {}", plane + 1)))?;
        let (data_w, data_h) = decoder.chunk_data_dimensions(index);
        let (data_w, data_h) = (data_w as usize, data_h as usize);
        let chunk: Vec<T> = decoded_samples(decoder.read_chunk(index)?)?;

        let row0 = (i / across) * chunk_h;
        let col0 = (i % across) * chunk_w;
        for (r, line) in chunk.chunks_exact(data_w.max(1)).take(data_h).enumerate() {
            let row = row0 + r;
            if row >= rows {
                break;
            }
            let width = data_w.min(cols - col0);
            let start = row * cols + col0;
            plane_data[start..start + width].copy_from_slice(&line[..width]);
        }
    }
    Ok(plane_data)
}

/// Internal: decode bands from any `Read + Seek` source
fn decode_bands<T, R>(reader: R, bands: &[usize]) -> Result<Vec<Raster<T>>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;
    let pixels = rows * cols;
    if pixels == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let meta = read_geo_metadata(&mut decoder);
    let nodata = meta.nodata.and_then(T::from_f64);
    let planar = decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap_or(1) == 2;

    let georeference = |data: Vec<T>| -> Result<Raster<T>> {
        let mut raster =
            Raster::from_vec(data, rows, cols)?.with_georeference(meta.transform, meta.crs.clone());
        raster.set_nodata(nodata);
        Ok(raster)
    };

    if planar {
        // The whole-image decoder only returns the first plane of band-sequential files
        let count = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as usize;
        return bands
            .iter()
            .map(|&band| {
                if band == 0 || band > count {
                    return Err(Error::BandOutOfRange { band, count });
                }
                georeference(read_plane(&mut decoder, band - 1, rows, cols)?)
            })
            .collect();
    }

    let samples: Vec<T> = decoded_samples(decoder.read_image()?)?;
    if samples.len() % pixels != 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let count = samples.len() / pixels;

    bands
        .iter()
        .map(|&band| {
            if band == 0 || band > count {
                return Err(Error::BandOutOfRange { band, count });
            }
            // Samples are interleaved per pixel
            georeference(samples.iter().skip(band - 1).step_by(count).copied().collect())
        })
        .collect()
}

/// Write a Raster to a single-band GeoTIFF file.
///
/// An existing file at `path` is removed first; the output never merges
/// with previous content. The file is flushed and closed before returning.
pub fn write_geotiff<T, P>(
    raster: &Raster<T>,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()>
where
    T: GeoTiffSample,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.exists() {
        fs::remove_file(path)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    encode_geotiff(raster, &mut writer, &options.unwrap_or_default())?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(
    raster: &Raster<T>,
    options: Option<GeoTiffOptions>,
) -> Result<Vec<u8>>
where
    T: GeoTiffSample,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), &options.unwrap_or_default())?;
    Ok(buf)
}

/// Internal: encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> Result<()>
where
    T: GeoTiffSample,
    W: Write + Seek,
{
    let (rows, cols) = raster.shape();
    if raster.is_empty() {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut encoder = TiffEncoder::new(writer)?.with_compression(options.compression.into());
    let data: Vec<T> = raster.data().iter().copied().collect();
    let tags = GeoTags::for_raster(raster);

    T::encode(&mut encoder, cols as u32, rows as u32, &data, &tags)
}
