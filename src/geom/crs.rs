use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A coordinate reference system identified by EPSG code.
///
/// Only codes with a known PROJ.4 definition can be constructed, so every
/// `Crs` value can be used as a reprojection source or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Crs { epsg: u32 }

impl Crs {
    /// WGS84 lon/lat.
    pub const WGS84: Crs = Crs { epsg: 4326 };
    /// NAD83 lon/lat (US Census TIGER/Line default).
    pub const NAD83: Crs = Crs { epsg: 4269 };
    /// ETRS89 lon/lat.
    pub const ETRS89: Crs = Crs { epsg: 4258 };
    /// Pseudo-Mercator, used by web basemaps.
    pub const WEB_MERCATOR: Crs = Crs { epsg: 3857 };
    /// NAD83 / Conus Albers equal-area.
    pub const CONUS_ALBERS: Crs = Crs { epsg: 5070 };

    /// Look up a supported EPSG code.
    pub fn from_epsg(epsg: u32) -> Result<Self> {
        let crs = Crs { epsg };
        match crs.definition() {
            Some(_) => Ok(crs),
            None => Err(Error::UnsupportedCrs(epsg)),
        }
    }

    /// WGS84 UTM zone containing the given lon/lat (degrees).
    pub fn utm_for(lon: f64, lat: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u32;
        Crs { epsg: if lat >= 0.0 { 32600 + zone } else { 32700 + zone } }
    }

    /// Get the EPSG code.
    #[inline] pub fn epsg(&self) -> u32 { self.epsg }

    /// Check if coordinates are lon/lat degrees rather than metres.
    #[inline] pub fn is_geographic(&self) -> bool { matches!(self.epsg, 4326 | 4269 | 4258) }

    /// PROJ.4 definition string for this CRS.
    pub fn proj4(&self) -> String {
        // Constructors only admit codes with a definition.
        self.definition().unwrap_or_default()
    }

    fn definition(&self) -> Option<String> {
        let utm = |zone: u32, datum: &str, south: bool| {
            let south = if south { " +south" } else { "" };
            format!("+proj=utm +zone={zone}{south} {datum} +units=m +no_defs")
        };

        match self.epsg {
            4326 => Some("+proj=longlat +datum=WGS84 +no_defs".to_string()),
            4269 => Some("+proj=longlat +datum=NAD83 +no_defs".to_string()),
            4258 => Some("+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs".to_string()),
            3857 => Some("+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs".to_string()),
            5070 => Some("+proj=aea +lat_0=23 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 +datum=NAD83 +units=m +no_defs".to_string()),
            code @ 32601..=32660 => Some(utm(code - 32600, "+datum=WGS84", false)),
            code @ 32701..=32760 => Some(utm(code - 32700, "+datum=WGS84", true)),
            code @ 26901..=26923 => Some(utm(code - 26900, "+datum=NAD83", false)),
            code @ 25828..=25838 => Some(utm(code - 25800, "+ellps=GRS80 +towgs84=0,0,0,0,0,0,0", false)),
            _ => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl TryFrom<u32> for Crs {
    type Error = Error;

    fn try_from(epsg: u32) -> Result<Self> { Self::from_epsg(epsg) }
}

impl From<Crs> for u32 {
    fn from(crs: Crs) -> Self { crs.epsg }
}

impl FromStr for Crs {
    type Err = Error;

    /// Parse `"EPSG:4326"`, `"epsg:4326"` or a bare `"4326"`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let code = s.get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("epsg:"))
            .map_or(s, |_| &s[5..]);
        let epsg = code.parse::<u32>().map_err(|_| Error::InvalidParameter {
            name: "crs",
            value: s.to_string(),
            reason: "expected an EPSG code such as EPSG:4326".to_string(),
        })?;
        Self::from_epsg(epsg)
    }
}
