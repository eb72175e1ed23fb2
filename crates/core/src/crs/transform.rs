//! Point transformation between coordinate reference systems
//!
//! Pure Rust (proj4rs + crs-definitions), no libproj required.

use super::CRS;
use crate::error::{Error, Result};
use proj4rs::proj::Proj;

/// Transforms (x, y) coordinates from a source CRS into a target CRS.
///
/// Geographic coordinates are exchanged in degrees; the radian handling
/// proj4rs expects stays internal.
pub struct CoordinateTransformer {
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
    identity: bool,
    label: String,
}

impl CoordinateTransformer {
    /// Build a transformer from `source` to `target`
    pub fn new(source: &CRS, target: &CRS) -> Result<Self> {
        let source_proj = build_proj(source)?;
        let target_proj = build_proj(target)?;

        Ok(Self {
            source: source_proj,
            target: target_proj,
            source_geographic: source.is_geographic(),
            target_geographic: target.is_geographic(),
            identity: source.is_equivalent(target),
            label: format!("{} -> {}", source, target),
        })
    }

    /// Transform a single point
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.identity {
            return Ok((x, y));
        }

        let mut point = if self.source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(&self.source, &self.target, &mut point)
            .map_err(|e| Error::Projection(format!("{} failed at ({x}, {y}): {e:?}", self.label)))?;

        let (out_x, out_y) = if self.target_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(Error::Projection(format!(
                "{} produced a non-finite result at ({x}, {y})",
                self.label
            )));
        }

        Ok((out_x, out_y))
    }
}

fn build_proj(crs: &CRS) -> Result<Proj> {
    let definition = crs.proj_definition()?;
    Proj::from_proj_string(&definition)
        .map_err(|e| Error::UnsupportedCrs(format!("{}: {e:?}", crs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_passthrough() {
        let t = CoordinateTransformer::new(&CRS::wgs84(), &CRS::wgs84()).unwrap();
        assert_eq!(t.transform(10.0, 51.5).unwrap(), (10.0, 51.5));
    }

    #[test]
    fn test_wgs84_to_web_mercator_origin() {
        let t = CoordinateTransformer::new(&CRS::wgs84(), &CRS::from_epsg(3857)).unwrap();
        let (x, y) = t.transform(0.0, 0.0).unwrap();
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_utm_roundtrip() {
        let utm = CRS::from_epsg(32630);
        let forward = CoordinateTransformer::new(&CRS::wgs84(), &utm).unwrap();
        let inverse = CoordinateTransformer::new(&utm, &CRS::wgs84()).unwrap();

        let (e, n) = forward.transform(-3.7037, 40.4168).unwrap();
        assert_abs_diff_eq!(e, 440_298.94, epsilon = 1.0);
        assert_abs_diff_eq!(n, 4_474_257.31, epsilon = 1.0);

        let (lon, lat) = inverse.transform(e, n).unwrap();
        assert_abs_diff_eq!(lon, -3.7037, epsilon = 1e-6);
        assert_abs_diff_eq!(lat, 40.4168, epsilon = 1e-6);
    }

    #[test]
    fn test_wkt_is_rejected() {
        let wkt = CRS::from_wkt("GEOGCS[\"WGS 84\"]");
        assert!(CoordinateTransformer::new(&wkt, &CRS::wgs84()).is_err());
    }
}
