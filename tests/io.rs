use std::{fs, path::Path};

use geomoran::{
    read_points_csv, read_shapefile, write_json, write_local_csv, AnalysisConfig, Contiguity, Crs, PointColumns,
    SpatialAutocorrelationEngine,
};
use shapefile::{
    dbase::{FieldName, FieldValue, Record, TableWriterBuilder},
    Point, Polygon, PolygonRing, Writer,
};

const ESRI_WEB_MERCATOR: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],UNIT["Meter",1.0]]"#;

/// Clockwise unit square at (x, y), closed.
fn cell(x: f64, y: f64) -> Polygon {
    Polygon::new(PolygonRing::Outer(vec![
        Point::new(x, y),
        Point::new(x, y + 1.0),
        Point::new(x + 1.0, y + 1.0),
        Point::new(x + 1.0, y),
        Point::new(x, y),
    ]))
}

/// 3x3 lattice with a west-to-east gradient in POP.
fn write_lattice(path: &Path) {
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("NAME").unwrap(), 16)
        .add_numeric_field(FieldName::try_from("POP").unwrap(), 10, 2);
    let mut writer = Writer::from_path(path, table).unwrap();

    for i in 0..9 {
        let (col, row) = (i % 3, i / 3);
        let mut record = Record::default();
        record.insert("NAME".to_string(), FieldValue::Character(Some(format!("cell-{i}"))));
        record.insert("POP".to_string(), FieldValue::Numeric(Some((col * 10 + row) as f64)));
        writer.write_shape_and_record(&cell(col as f64, row as f64), &record).unwrap();
    }
}

#[test]
fn shapefile_round_trip_and_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let shp = dir.path().join("lattice.shp");
    write_lattice(&shp);

    let features = read_shapefile(&shp, Some("POP"), Some("NAME")).unwrap();
    assert_eq!(features.len(), 9);
    assert!(features.all_polygons());
    assert_eq!(features.values()[5], 21.0);
    assert_eq!(features.label(5), Some("cell-5"));
    assert_eq!(features.crs(), None);

    let engine = SpatialAutocorrelationEngine::new(AnalysisConfig {
        contiguity: Contiguity::Rook { tolerance: 0.0 },
        permutations: 99,
        seed: Some(1),
        ..AnalysisConfig::default()
    }).unwrap();

    let graph = engine.build_adjacency(&features).unwrap();
    assert_eq!(graph.neighbor_slice(4), &[1, 3, 5, 7]);

    let analysis = engine.analyze(&features).unwrap();
    assert!(analysis.global.i > 0.0);

    let csv = dir.path().join("local.csv");
    write_local_csv(&csv, &features, &analysis).unwrap();
    let text = fs::read_to_string(&csv).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("feature,label,value,lag,local_i,z,p_sim,quadrant,cluster"));
    assert_eq!(lines.count(), 9);

    let json = dir.path().join("summary.json");
    write_json(&json, &analysis).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(summary["adjacency"]["features"], 9);
    assert!(summary["global"]["i"].as_f64().unwrap() > 0.0);
    assert!(summary.get("local").is_none());
}

#[test]
fn prj_sidecar_sets_crs() {
    let dir = tempfile::tempdir().unwrap();
    let shp = dir.path().join("lattice.shp");
    write_lattice(&shp);
    fs::write(dir.path().join("lattice.prj"), ESRI_WEB_MERCATOR).unwrap();

    let features = read_shapefile(&shp, None, None).unwrap();
    assert_eq!(features.crs(), Some(Crs::WEB_MERCATOR));
    assert!(features.values().iter().all(|&v| v == 0.0));
}

#[test]
fn missing_field_names_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let shp = dir.path().join("lattice.shp");
    write_lattice(&shp);

    let err = read_shapefile(&shp, Some("INCOME"), None).unwrap_err();
    assert!(format!("{err:#}").contains("INCOME"), "{err:#}");
    assert!(read_shapefile(&dir.path().join("nope.shp"), None, None).is_err());
}

#[test]
fn listings_csv_projected_to_utm() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("listings.csv");
    let mut csv = String::from("id,longitude,latitude,price\n");
    for i in 0..12 {
        let (lon, lat) = (13.30 + 0.01 * (i % 4) as f64, 52.48 + 0.01 * (i / 4) as f64);
        csv.push_str(&format!("{i},{lon},{lat},{}\n", 50 + 10 * (i % 4)));
    }
    fs::write(&path, csv).unwrap();

    let columns = PointColumns { value: Some("price"), label: Some("id"), ..PointColumns::default() };
    let listings = read_points_csv(&path, &columns, Some(Crs::WGS84)).unwrap();
    assert_eq!(listings.len(), 12);

    let engine = SpatialAutocorrelationEngine::new(AnalysisConfig {
        contiguity: Contiguity::KNearest { k: 3 },
        permutations: 49,
        seed: Some(5),
        target_crs: Some(Crs::from_epsg(32633).unwrap()),
        ..AnalysisConfig::default()
    }).unwrap();
    let analysis = engine.analyze(&listings).unwrap();
    assert_eq!(analysis.crs, Some(Crs::from_epsg(32633).unwrap()));
    assert!(analysis.global.i.is_finite());
    assert!(analysis.adjacency.islands.is_empty());
}
