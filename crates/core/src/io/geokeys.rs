//! GeoTIFF tag ids and GeoKeyDirectory encoding

use crate::crs::CRS;

pub(crate) const MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const MODEL_TIEPOINT: u16 = 33922;
pub(crate) const MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

/// Build a GeoKeyDirectory for `crs`.
///
/// Layout: `[version, revision, minor, count, (key, location, count, value)*]`,
/// keys sorted ascending, all values stored inline.
pub(crate) fn build_directory(crs: Option<&CRS>) -> Vec<u16> {
    let mut entries: Vec<[u16; 4]> = Vec::with_capacity(3);

    match crs {
        Some(crs) => {
            let geographic = crs.is_geographic();
            let model = if geographic {
                MODEL_TYPE_GEOGRAPHIC
            } else {
                MODEL_TYPE_PROJECTED
            };
            entries.push([GT_MODEL_TYPE, 0, 1, model]);
            entries.push([GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);

            match crs.epsg().and_then(|code| u16::try_from(code).ok()) {
                Some(code) => {
                    let key = if geographic {
                        GEOGRAPHIC_TYPE
                    } else {
                        PROJECTED_CS_TYPE
                    };
                    entries.push([key, 0, 1, code]);
                }
                None => tracing::warn!("{} has no EPSG code, writing model type only", crs),
            }
        }
        None => entries.push([GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]),
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.iter().flatten());
    keys
}

/// Recover an EPSG-coded CRS from a GeoKeyDirectory
pub(crate) fn parse_directory(keys: &[u16]) -> Option<CRS> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;

    let mut model = None;
    let mut geographic = None;
    let mut projected = None;

    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match key {
            GT_MODEL_TYPE => model = Some(value),
            GEOGRAPHIC_TYPE if value != USER_DEFINED => geographic = Some(value),
            PROJECTED_CS_TYPE if value != USER_DEFINED => projected = Some(value),
            _ => {}
        }
    }

    let code = match model {
        Some(MODEL_TYPE_GEOGRAPHIC) => geographic.or(projected),
        _ => projected.or(geographic),
    };
    code.map(|c| CRS::from_epsg(c as u32))
}
