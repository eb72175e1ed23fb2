//! End-to-end tests: multi-band GeoTIFF in, vegetation mask GeoTIFF out.
//!
//! Scenes are 2x2 eight-band float32 images of a WGS84 north-up grid, stored
//! either pixel-interleaved or band-sequential. Band 6 holds red, band 8
//! holds near-infrared, as in the default configuration.

use std::path::Path;

use vegdensity_algorithms::imagery::ThresholdRange;
use vegdensity_algorithms::pipeline::{
    evaluate_geotiff_vegetation, VegetationConfig, WriteOutcome, WritePolicy,
};
use vegdensity_algorithms::warp::ProjWarper;
use vegdensity_core::io::{read_geotiff, read_geotiff_bands, GeoTiffDriver};
use vegdensity_core::raster::{GeoTransform, Raster};
use vegdensity_core::{Error, CRS};

// ── Fixture ───────────────────────────────────────────────────────────

const ROWS: usize = 2;
const COLS: usize = 2;

/// (red, nir) per pixel, row-major
const PIXELS: [(f32, f32); 4] = [
    (1.0, 3.0), // ndvi 0.5
    (0.0, 0.0), // undefined
    (3.0, 1.0), // ndvi -0.5
    (1.0, 2.0), // ndvi 1/3
];

/// Eight bands; band 6 is red, band 8 is nir, the others hold `100 * band + pixel`
fn scene_bands() -> Vec<Vec<f32>> {
    (1..=8)
        .map(|band| {
            PIXELS
                .iter()
                .enumerate()
                .map(|(pixel, &(red, nir))| match band {
                    6 => red,
                    8 => nir,
                    _ => (100 * band + pixel) as f32,
                })
                .collect()
        })
        .collect()
}

enum Field {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Double(Vec<f64>),
}

impl Field {
    /// (field type, count, little-endian bytes)
    fn encode(&self) -> (u16, u32, Vec<u8>) {
        match self {
            Field::Short(v) => (3, v.len() as u32, v.iter().flat_map(|x| x.to_le_bytes()).collect()),
            Field::Long(v) => (4, v.len() as u32, v.iter().flat_map(|x| x.to_le_bytes()).collect()),
            Field::Double(v) => (12, v.len() as u32, v.iter().flat_map(|x| x.to_le_bytes()).collect()),
        }
    }
}

/// Little-endian float32 GeoTIFF with one row per strip.
///
/// Band-sequential files store every strip of band 1, then band 2, and so on.
fn encode_scene(bands: &[Vec<f32>], planar: bool) -> Vec<u8> {
    let samples = bands.len();
    let mut buf: Vec<u8> = vec![b'I', b'I', 42, 0, 0, 0, 0, 0];

    let row_bytes = |band: &Vec<f32>, row: usize| -> Vec<u8> {
        band[row * COLS..(row + 1) * COLS]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    };
    let strips: Vec<Vec<u8>> = if planar {
        bands
            .iter()
            .flat_map(|band| (0..ROWS).map(move |row| row_bytes(band, row)))
            .collect()
    } else {
        (0..ROWS)
            .map(|row| {
                (row * COLS..(row + 1) * COLS)
                    .flat_map(|pixel| bands.iter().map(move |band| band[pixel]))
                    .flat_map(|v| v.to_le_bytes())
                    .collect()
            })
            .collect()
    };

    let mut offsets = Vec::new();
    let mut counts = Vec::new();
    for strip in &strips {
        offsets.push(buf.len() as u32);
        counts.push(strip.len() as u32);
        buf.extend_from_slice(strip);
    }

    let entries = [
        (256, Field::Long(vec![COLS as u32])),
        (257, Field::Long(vec![ROWS as u32])),
        (258, Field::Short(vec![32; samples])),
        (259, Field::Short(vec![1])),
        (262, Field::Short(vec![1])),
        (273, Field::Long(offsets)),
        (277, Field::Short(vec![samples as u16])),
        (278, Field::Long(vec![1])),
        (279, Field::Long(counts)),
        (284, Field::Short(vec![if planar { 2 } else { 1 }])),
        (339, Field::Short(vec![3; samples])),
        (33550, Field::Double(vec![0.1, 0.1, 0.0])),
        (33922, Field::Double(vec![0.0, 0.0, 0.0, 10.0, 45.0, 0.0])),
        (
            34735,
            Field::Short(vec![1, 1, 0, 3, 1024, 0, 1, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326]),
        ),
    ];

    // Values longer than four bytes live before the IFD
    let mut ifd = (entries.len() as u16).to_le_bytes().to_vec();
    for (tag, field) in &entries {
        let (kind, count, bytes) = field.encode();
        ifd.extend_from_slice(&(*tag as u16).to_le_bytes());
        ifd.extend_from_slice(&kind.to_le_bytes());
        ifd.extend_from_slice(&count.to_le_bytes());
        if bytes.len() <= 4 {
            let mut inline = bytes.clone();
            inline.resize(4, 0);
            ifd.extend_from_slice(&inline);
        } else {
            if buf.len() % 2 == 1 {
                buf.push(0);
            }
            ifd.extend_from_slice(&(buf.len() as u32).to_le_bytes());
            buf.extend_from_slice(&bytes);
        }
    }
    ifd.extend_from_slice(&0u32.to_le_bytes());

    if buf.len() % 2 == 1 {
        buf.push(0);
    }
    let ifd_offset = buf.len() as u32;
    buf[4..8].copy_from_slice(&ifd_offset.to_le_bytes());
    buf.extend_from_slice(&ifd);
    buf
}

fn write_scene(path: &Path, planar: bool) {
    std::fs::write(path, encode_scene(&scene_bands(), planar)).unwrap();
}

fn config(range: ThresholdRange) -> VegetationConfig {
    VegetationConfig {
        range,
        ..Default::default()
    }
}

fn values(raster: &Raster<f32>) -> Vec<f32> {
    raster.data().iter().copied().collect()
}

fn assert_default_mask(path: &Path) {
    let mask: Raster<f32> = read_geotiff(path, None).unwrap();
    assert_eq!(mask.shape(), (ROWS, COLS));
    assert_eq!(values(&mask), vec![255.0, -1.0, 0.0, 255.0]);
    assert_eq!(mask.transform(), &GeoTransform::north_up(10.0, 45.0, 0.1));
    assert_eq!(mask.crs(), Some(&CRS::wgs84()));
    assert_eq!(mask.nodata(), Some(-1.0));
}

// ── Reading ───────────────────────────────────────────────────────────

#[test]
fn band_sequential_scene_reads_requested_bands() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("planar.tif");
    write_scene(&input, true);

    let bands = read_geotiff_bands::<f32, _>(&input, &[6, 8, 1]).unwrap();
    assert_eq!(values(&bands[0]), vec![1.0, 0.0, 3.0, 1.0]);
    assert_eq!(values(&bands[1]), vec![3.0, 0.0, 1.0, 2.0]);
    assert_eq!(values(&bands[2]), vec![100.0, 101.0, 102.0, 103.0]);
    assert_eq!(bands[0].crs(), Some(&CRS::wgs84()));

    assert!(matches!(
        read_geotiff_bands::<f32, _>(&input, &[9]),
        Err(Error::BandOutOfRange { band: 9, count: 8 })
    ));
}

#[test]
fn interleaved_and_band_sequential_scenes_agree() {
    let dir = tempfile::tempdir().unwrap();
    let chunky = dir.path().join("chunky.tif");
    let planar = dir.path().join("planar.tif");
    write_scene(&chunky, false);
    write_scene(&planar, true);

    let all: Vec<usize> = (1..=8).collect();
    let a = read_geotiff_bands::<f32, _>(&chunky, &all).unwrap();
    let b = read_geotiff_bands::<f32, _>(&planar, &all).unwrap();
    assert_eq!(a, b);
}

// ── Pipeline ──────────────────────────────────────────────────────────

#[test]
fn interleaved_scene_with_default_bands() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scene.tif");
    let output = dir.path().join("mask.tif");
    write_scene(&input, false);

    let report = evaluate_geotiff_vegetation(
        &input,
        &output,
        &VegetationConfig::default(),
        &GeoTiffDriver::default(),
        &ProjWarper::default(),
    )
    .unwrap();

    assert!(matches!(report.write, WriteOutcome::Written));
    assert_eq!(report.summary.vegetation, 2);
    assert_eq!(report.summary.background, 1);
    assert_eq!(report.summary.nodata, 1);
    assert_default_mask(&output);
}

#[test]
fn band_sequential_scene_with_default_bands() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scene.tif");
    let output = dir.path().join("mask.tif");
    write_scene(&input, true);

    let report = evaluate_geotiff_vegetation(
        &input,
        &output,
        &VegetationConfig::default(),
        &GeoTiffDriver::default(),
        &ProjWarper::default(),
    )
    .unwrap();

    assert!(report.write.is_written());
    assert_eq!(report.summary.vegetation, 2);
    assert_default_mask(&output);
}

#[test]
fn mask_reprojected_to_web_mercator() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scene.tif");
    let output = dir.path().join("mask_3857.tif");
    write_scene(&input, false);

    let config = VegetationConfig {
        crs: CRS::from_epsg(3857),
        ..Default::default()
    };
    evaluate_geotiff_vegetation(
        &input,
        &output,
        &config,
        &GeoTiffDriver::default(),
        &ProjWarper::default(),
    )
    .unwrap();

    let mask: Raster<f32> = read_geotiff(&output, None).unwrap();
    assert_eq!(mask.crs(), Some(&CRS::from_epsg(3857)));
    assert_eq!(mask.nodata(), Some(-1.0));

    // 10°E in web mercator is ~1113 km
    let (min_x, _, max_x, _) = mask.bounds();
    assert!(min_x > 1_100_000.0 && max_x < 1_150_000.0);
    assert!(values(&mask)
        .iter()
        .all(|&v| v == -1.0 || v == 0.0 || v == 255.0));
    assert!(values(&mask).contains(&255.0));
}

#[test]
fn rerun_overwrites_previous_mask() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scene.tif");
    let output = dir.path().join("mask.tif");
    write_scene(&input, false);
    let driver = GeoTiffDriver::default();
    let warper = ProjWarper::default();

    let first = config(ThresholdRange::default());
    evaluate_geotiff_vegetation(&input, &output, &first, &driver, &warper).unwrap();

    let second = config(ThresholdRange::new(-0.9, -0.1).unwrap());
    evaluate_geotiff_vegetation(&input, &output, &second, &driver, &warper).unwrap();

    let mask: Raster<f32> = read_geotiff(&output, None).unwrap();
    assert_eq!(values(&mask), vec![0.0, -1.0, 255.0, 0.0]);
}

#[test]
fn unwritable_output_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scene.tif");
    let output = dir.path().join("missing").join("mask.tif");
    write_scene(&input, false);
    let driver = GeoTiffDriver::default();
    let warper = ProjWarper::default();

    let report = evaluate_geotiff_vegetation(
        &input,
        &output,
        &VegetationConfig::default(),
        &driver,
        &warper,
    )
    .unwrap();
    assert!(matches!(report.write, WriteOutcome::Failed(Error::Io(_))));
    assert!(!output.exists());

    let strict = VegetationConfig {
        write_policy: WritePolicy::Strict,
        ..Default::default()
    };
    let result = evaluate_geotiff_vegetation(&input, &output, &strict, &driver, &warper);
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn band_beyond_count_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scene.tif");
    let output = dir.path().join("mask.tif");
    write_scene(&input, true);

    let config = VegetationConfig {
        nir_band: 9,
        ..Default::default()
    };
    let result = evaluate_geotiff_vegetation(
        &input,
        &output,
        &config,
        &GeoTiffDriver::default(),
        &ProjWarper::default(),
    );

    assert!(matches!(result, Err(Error::BandOutOfRange { band: 9, count: 8 })));
    assert!(!output.exists());
}
