//! Integration tests for boundary loading and preparation
//!
//! This test suite verifies that:
//! - Datasets without a CRS default to EPSG:4326 and still reproject
//! - Shapefile .prj files are honoured, including ESRI names
//! - Missing files and sidecars surface as DataNotFound
//! - Datasets without usable polygons are rejected

use geo::BoundingRect;
use jnr_core::models::{AdminLevel, Crs};
use jnr_core::JnrError;
use jnr_geo::{read_vector, BoundaryPreparer, VectorFormat};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ESRI_UTM_19S: &str = r#"PROJCS["WGS_1984_UTM_Zone_19S",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",10000000.0],PARAMETER["Central_Meridian",-69.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

fn preparer() -> BoundaryPreparer {
    BoundaryPreparer::new(Crs::utm_19s(), Crs::wgs84()).unwrap()
}

/// Write a single-polygon Shapefile (no .prj) and return the .shp path
fn write_square_shapefile(dir: &Path, name: &str, x0: f64, y0: f64, size: f64) -> PathBuf {
    let path = dir.join(format!("{}.shp", name));
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("NAME").unwrap(), 50);

    {
        let mut writer = shapefile::Writer::from_path(&path, table).unwrap();
        // Clockwise outer ring
        let polygon = Polygon::new(PolygonRing::Outer(vec![
            Point::new(x0, y0),
            Point::new(x0, y0 + size),
            Point::new(x0 + size, y0 + size),
            Point::new(x0 + size, y0),
            Point::new(x0, y0),
        ]));
        let mut record = Record::default();
        record.insert("NAME".to_string(), FieldValue::Character(Some(name.to_string())));
        writer.write_shape_and_record(&polygon, &record).unwrap();
    }

    path
}

fn write_geojson(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

const SQUARE_WGS84: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-69.0, 5.0], [-68.9, 5.0], [-68.9, 5.1], [-69.0, 5.1], [-69.0, 5.0]]]
            },
            "properties": {"NAME": "VCS1566"}
        }
    ]
}"#;

#[test]
fn test_geojson_without_crs_defaults_to_4326() {
    let dir = TempDir::new().unwrap();
    let path = write_geojson(dir.path(), "boundary.geojson", SQUARE_WGS84);

    let boundary = preparer().prepare(&path).unwrap();

    assert!(boundary.crs_assumed());
    assert_eq!(boundary.source_crs().epsg, 4326);
    assert_eq!(boundary.target_crs().epsg, 32719);

    let envelope = boundary.envelope().unwrap();
    assert!((envelope.min().x - 500_000.0).abs() < 1.0);
    assert!(envelope.min().y > 10_000_000.0);

    // Source geometries stay in degrees
    let original = boundary.geometries()[0].bounding_rect().unwrap();
    assert_eq!(original.min().x, -69.0);
}

#[test]
fn test_geojson_in_target_crs_is_not_moved() {
    let dir = TempDir::new().unwrap();
    let content = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32719"}},
        "features": [
            {
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[500000.0, 9000000.0], [510000.0, 9000000.0], [510000.0, 9010000.0], [500000.0, 9000000.0]]]
                },
                "properties": {}
            }
        ]
    }"#;
    let path = write_geojson(dir.path(), "boundary.geojson", content);

    let boundary = preparer().prepare(&path).unwrap();

    assert!(!boundary.crs_assumed());
    assert_eq!(boundary.geometries(), boundary.reprojected_geometries());
}

#[test]
fn test_shapefile_without_prj_defaults_to_4326() {
    let dir = TempDir::new().unwrap();
    let path = write_square_shapefile(dir.path(), "project", -69.0, 5.0, 0.1);

    let dataset = read_vector(&path).unwrap();
    assert_eq!(dataset.format, VectorFormat::Shapefile);
    assert_eq!(dataset.epsg, None);
    assert_eq!(dataset.features.len(), 1);
    assert_eq!(dataset.features[0].properties["NAME"], "project");

    let boundary = preparer().prepare(&path).unwrap();
    assert!(boundary.crs_assumed());
    assert_eq!(boundary.sidecar_paths().len(), 3);
}

#[test]
fn test_shapefile_with_esri_prj() {
    let dir = TempDir::new().unwrap();
    let path = write_square_shapefile(dir.path(), "VCS1566_UTM", 500_000.0, 9_000_000.0, 5000.0);
    fs::write(path.with_extension("prj"), ESRI_UTM_19S).unwrap();

    let boundary = preparer().prepare(&path).unwrap();

    assert!(!boundary.crs_assumed());
    assert_eq!(boundary.source_crs().epsg, 32719);
    assert_eq!(boundary.sidecar_paths().len(), 4);

    let envelope = boundary.envelope().unwrap();
    assert!((envelope.min().x - 500_000.0).abs() < 1e-6);
    assert!((envelope.max().y - 9_005_000.0).abs() < 1e-6);
}

#[test]
fn test_unresolvable_prj_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = write_square_shapefile(dir.path(), "local", 0.0, 0.0, 10.0);
    fs::write(path.with_extension("prj"), r#"LOCAL_CS["Site grid"]"#).unwrap();

    let err = preparer().prepare(&path).unwrap_err();
    assert!(matches!(err, JnrError::CrsUnresolved { .. }));
}

#[test]
fn test_missing_sidecar_is_data_not_found() {
    let dir = TempDir::new().unwrap();
    let path = write_square_shapefile(dir.path(), "project", -69.0, 5.0, 0.1);
    fs::remove_file(path.with_extension("dbf")).unwrap();

    match preparer().prepare(&path) {
        Err(JnrError::DataNotFound { path }) => {
            assert_eq!(path.extension().unwrap(), "dbf");
        }
        other => panic!("expected DataNotFound, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_data_not_found() {
    let err = preparer().prepare(Path::new("/nonexistent/VCS1566_UTM.shp")).unwrap_err();
    assert!(matches!(err, JnrError::DataNotFound { .. }));
}

#[test]
fn test_empty_collection_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_geojson(
        dir.path(),
        "empty.geojson",
        r#"{"type": "FeatureCollection", "features": []}"#,
    );

    let err = preparer().prepare(&path).unwrap_err();
    assert!(matches!(err, JnrError::NoGeometry { .. }));
}

#[test]
fn test_null_and_point_features_are_dropped() {
    let dir = TempDir::new().unwrap();
    let content = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": null, "properties": {}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-69.0, 5.0]}, "properties": {}}
        ]
    }"#;
    let path = write_geojson(dir.path(), "points.geojson", content);

    let err = preparer().prepare(&path).unwrap_err();
    assert!(matches!(err, JnrError::NoGeometry { .. }));
}

#[test]
fn test_admin_regions_are_reprojected() {
    let dir = TempDir::new().unwrap();
    let path = write_geojson(dir.path(), "level1.geojson", SQUARE_WGS84);

    let regions = preparer().admin_regions(&path, AdminLevel::Level1).unwrap();

    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].level, AdminLevel::Level1);
    assert_eq!(regions[0].display_name(), "VCS1566");
    let bounds = regions[0].feature.geometry.bounding_rect().unwrap();
    assert!(bounds.min().x > 100_000.0);
}
