use std::{fs, path::Path};

use tracing::{debug, warn};

use crate::geom::Crs;

/// Read the `.prj` sidecar of a shapefile and identify its CRS.
///
/// Returns `None` (with a warning) when the file is missing or names a CRS we
/// cannot identify; the caller must then assign one explicitly.
pub(crate) fn crs_from_prj(shp_path: &Path) -> Option<Crs> {
    let prj_path = shp_path.with_extension("prj");
    let wkt = match fs::read_to_string(&prj_path) {
        Ok(wkt) => wkt,
        Err(_) => {
            warn!(path = %shp_path.display(), "shapefile has no .prj; CRS unknown");
            return None;
        }
    };

    let crs = epsg_from_wkt(&wkt).and_then(|code| Crs::from_epsg(code).ok());
    match crs {
        Some(crs) => debug!(%crs, path = %prj_path.display(), "read CRS from .prj"),
        None => warn!(path = %prj_path.display(), "could not identify CRS in .prj"),
    }
    crs
}

/// Identify an EPSG code in WKT: an explicit authority, or a well-known ESRI name.
pub(crate) fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    authority_code(wkt).or_else(|| esri_name_code(wkt))
}

/// The outermost `AUTHORITY["EPSG","n"]` is the last one in the string;
/// earlier ones belong to the datum, spheroid and units.
fn authority_code(wkt: &str) -> Option<u32> {
    const TAG: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(start) = wkt.rfind(TAG) {
        let rest = &wkt[start + TAG.len()..];
        if let Some(end) = rest.find('"') {
            return rest[..end].parse().ok();
        }
    }

    let start = wkt.rfind("EPSG:")? + "EPSG:".len();
    let digits = wkt[start..].chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>();
    digits.parse().ok()
}

/// The quoted name following the first `prefix`.
fn quoted<'a>(wkt: &'a str, prefix: &str) -> Option<&'a str> {
    let start = wkt.find(prefix)? + prefix.len();
    let end = wkt[start..].find('"')?;
    Some(&wkt[start..start + end])
}

/// ESRI `.prj` files carry names instead of authority codes.
fn esri_name_code(wkt: &str) -> Option<u32> {
    if let Some(name) = quoted(wkt, "PROJCS[\"") {
        let utm_zone = |datum: &str| -> Option<(u32, bool)> {
            let rest = name.strip_prefix(datum)?.strip_prefix("_UTM_Zone_")?;
            let (zone, hemisphere) = rest.split_at(rest.len().checked_sub(1)?);
            Some((zone.parse().ok()?, hemisphere == "S"))
        };

        return match name {
            "WGS_1984_Web_Mercator_Auxiliary_Sphere" | "WGS_84_Pseudo_Mercator" => Some(3857),
            "USA_Contiguous_Albers_Equal_Area_Conic_USGS_version" | "NAD_1983_Contiguous_USA_Albers" => Some(5070),
            _ => match (utm_zone("WGS_1984"), utm_zone("NAD_1983"), utm_zone("ETRS_1989")) {
                (Some((zone, false)), _, _) => Some(32600 + zone),
                (Some((zone, true)), _, _) => Some(32700 + zone),
                (_, Some((zone, false)), _) => Some(26900 + zone),
                (_, _, Some((zone, false))) => Some(25800 + zone),
                _ => None,
            },
        };
    }

    match quoted(wkt, "GEOGCS[\"")? {
        "GCS_WGS_1984" | "WGS 84" => Some(4326),
        "GCS_North_American_1983" | "NAD83" => Some(4269),
        "GCS_ETRS_1989" | "ETRS89" => Some(4258),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OGC_UTM33: &str = r#"PROJCS["WGS 84 / UTM zone 33N",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],UNIT["metre",1],AUTHORITY["EPSG","32633"]]"#;
    const ESRI_NAD83: &str = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
    const ESRI_UTM17: &str = r#"PROJCS["NAD_1983_UTM_Zone_17N",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],UNIT["Meter",1.0]]"#;

    #[test]
    fn outermost_authority_wins() {
        assert_eq!(epsg_from_wkt(OGC_UTM33), Some(32633));
    }

    #[test]
    fn esri_names() {
        assert_eq!(epsg_from_wkt(ESRI_NAD83), Some(4269));
        assert_eq!(epsg_from_wkt(ESRI_UTM17), Some(26917));
        assert_eq!(epsg_from_wkt(r#"PROJCS["WGS_1984_UTM_Zone_19S",GEOGCS["GCS_WGS_1984"]]"#), Some(32719));
        assert_eq!(epsg_from_wkt(r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984"]]"#), Some(3857));
    }

    #[test]
    fn epsg_prefix_and_unknown() {
        assert_eq!(epsg_from_wkt("EPSG:3857"), Some(3857));
        assert_eq!(epsg_from_wkt(r#"GEOGCS["GCS_Mars_2000"]"#), None);
    }

    #[test]
    fn missing_prj_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(crs_from_prj(&dir.path().join("counties.shp")), None);

        fs::write(dir.path().join("counties.prj"), ESRI_NAD83).unwrap();
        assert_eq!(crs_from_prj(&dir.path().join("counties.shp")), Some(Crs::NAD83));
    }
}
