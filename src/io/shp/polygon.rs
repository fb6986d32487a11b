use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::PolygonRing;

/// Signed shoelace area; negative for clockwise rings.
fn signed_area(coords: &[Coord<f64>]) -> f64 {
    coords.windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum::<f64>() / 2.0
}

/// Convert shapefile polygon rings (any point flavor) into a multipolygon.
///
/// Shapefiles store clockwise exteriors, each followed by its counter-clockwise
/// holes. A hole before any exterior is dropped.
pub(crate) fn rings_to_geo<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Coord<f64>) -> MultiPolygon<f64> {
    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for ring in rings {
        let mut coords = ring.points().iter().map(&xy).collect::<Vec<_>>();
        if coords.len() < 3 { continue }
        if coords.first() != coords.last() {
            coords.push(coords[0]);
        }

        if signed_area(&coords) < 0.0 {
            if let Some(ext) = exterior.take() {
                polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(LineString(coords));
        } else if exterior.is_some() {
            holes.push(LineString(coords));
        }
    }
    if let Some(ext) = exterior {
        polygons.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polygons)
}
