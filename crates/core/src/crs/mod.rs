//! Coordinate Reference System handling

mod transform;

pub use transform::CoordinateTransformer;

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // Textual comparison, imperfect for WKT and PROJ
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a.split_whitespace().eq(b.split_whitespace());
        }

        false
    }

    /// PROJ definition usable by the coordinate transformer.
    ///
    /// EPSG codes are resolved through the bundled `crs-definitions` database.
    pub fn proj_definition(&self) -> Result<Cow<'static, str>> {
        if let Some(proj) = &self.proj {
            return Ok(Cow::Owned(proj.clone()));
        }
        if let Some(code) = self.epsg {
            return u16::try_from(code)
                .ok()
                .and_then(crs_definitions::from_code)
                .map(|def| Cow::Borrowed(def.proj4))
                .ok_or_else(|| {
                    Error::UnsupportedCrs(format!("EPSG:{code} is not in the CRS database"))
                });
        }
        Err(Error::UnsupportedCrs(format!(
            "{} cannot be converted to a PROJ definition",
            self.identifier()
        )))
    }

    /// Whether coordinates in this CRS are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self.proj_definition() {
            Ok(def) => def.contains("+proj=longlat") || def.contains("+proj=latlong"),
            Err(_) => self.epsg == Some(4326),
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let head: String = wkt.chars().take(50).collect();
            return format!("WKT:{}", head);
        }
        "Unknown".to_string()
    }
}

impl FromStr for CRS {
    type Err = Error;

    /// Parse `EPSG:<code>`, a bare EPSG code, a `+proj=` string or WKT text
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let unsupported = || Error::UnsupportedCrs(s.to_string());

        if let Some((authority, code)) = s.split_once(':') {
            if authority.trim().eq_ignore_ascii_case("epsg") {
                return code
                    .trim()
                    .parse::<u32>()
                    .map(CRS::from_epsg)
                    .map_err(|_| unsupported());
            }
        }
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s.parse::<u32>().map(CRS::from_epsg).map_err(|_| unsupported());
        }
        if s.starts_with('+') {
            return Ok(CRS::from_proj(s));
        }
        if s.contains('[') {
            return Ok(CRS::from_wkt(s));
        }

        Err(unsupported())
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}
