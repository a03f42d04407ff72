//! Integration tests for the boundary overlay resolver
//!
//! Geometries are metric squares in a UTM-like plane built from WKT.

use geo::{MultiPolygon, Polygon};
use jnr_core::models::{AdminLevel, AdminRegion, BoundaryFeature, Crs, Distance};
use jnr_core::JnrError;
use jnr_geo::{read_vector, write_regions_geojson, OverlayResolver};
use tempfile::TempDir;
use wkt::TryFromWkt;

fn from_wkt(wkt: &str) -> MultiPolygon<f64> {
    MultiPolygon(vec![Polygon::<f64>::try_from_wkt_str(wkt).unwrap()])
}

fn region(level: AdminLevel, id: &str, wkt: &str) -> AdminRegion {
    let mut feature = BoundaryFeature::new(id, from_wkt(wkt));
    feature.properties.insert("NAME".to_string(), serde_json::json!(id));
    AdminRegion::new(level, feature)
}

fn resolver() -> OverlayResolver {
    OverlayResolver::new(Distance::meters(-1000.0))
}

/// 10 km project square
const PROJECT: &str = "POLYGON((0 0,10000 0,10000 10000,0 10000,0 0))";

#[test]
fn test_margin_only_regions_are_excluded() {
    let level1 = vec![
        // Covers the project interior
        region(AdminLevel::Level1, "vichada", "POLYGON((-5000 -5000,6000 -5000,6000 15000,-5000 15000,-5000 -5000))"),
        // Touches the project only within its outer 1 km
        region(AdminLevel::Level1, "meta", "POLYGON((9500 -5000,20000 -5000,20000 15000,9500 15000,9500 -5000))"),
        // Far away
        region(AdminLevel::Level1, "guainia", "POLYGON((50000 0,60000 0,60000 10000,50000 10000,50000 0))"),
    ];

    let result = resolver().resolve(&[from_wkt(PROJECT)], level1, Vec::new()).unwrap();

    assert_eq!(result.level1_names(), vec!["vichada".to_string()]);
    assert_eq!(result.skipped, 0);
}

#[test]
fn test_level2_filtered_by_buffered_level1() {
    let level1 = vec![region(
        AdminLevel::Level1,
        "vichada",
        "POLYGON((-5000 -5000,15000 -5000,15000 15000,-5000 15000,-5000 -5000))",
    )];
    let level2 = vec![
        region(AdminLevel::Level2, "cumaribo", "POLYGON((0 0,5000 0,5000 5000,0 5000,0 0))"),
        // Inside the level-1 margin that the buffer removes
        region(AdminLevel::Level2, "edge", "POLYGON((14500 0,16000 0,16000 5000,14500 5000,14500 0))"),
    ];

    let result = resolver().resolve(&[from_wkt(PROJECT)], level1, level2).unwrap();

    assert_eq!(result.level1.len(), 1);
    assert_eq!(result.level2_names(), vec!["cumaribo".to_string()]);
}

#[test]
fn test_collapsed_feature_is_skipped() {
    let tiny = from_wkt("POLYGON((20000 20000,21500 20000,21500 21500,20000 21500,20000 20000))");
    let level1 = vec![region(AdminLevel::Level1, "vichada", PROJECT)];

    let result = resolver().resolve(&[from_wkt(PROJECT), tiny], level1, Vec::new()).unwrap();

    assert_eq!(result.skipped, 1);
    assert_eq!(result.level1.len(), 1);
}

#[test]
fn test_all_collapsed_fails_with_empty_buffer() {
    let tiny = from_wkt("POLYGON((0 0,1500 0,1500 1500,0 1500,0 0))");
    let level1 = vec![region(AdminLevel::Level1, "vichada", PROJECT)];

    let err = resolver().resolve(&[tiny], level1, Vec::new()).unwrap_err();

    match err {
        JnrError::EmptyBuffer { distance } => assert_eq!(distance, -1000.0),
        other => panic!("expected EmptyBuffer, got {:?}", other),
    }
}

#[test]
fn test_no_overlapping_level1_yields_empty_result() {
    let level1 =
        vec![region(AdminLevel::Level1, "far", "POLYGON((50000 0,60000 0,60000 10000,50000 10000,50000 0))")];
    let level2 = vec![region(AdminLevel::Level2, "inside", "POLYGON((0 0,5000 0,5000 5000,0 5000,0 0))")];

    let result = resolver().resolve(&[from_wkt(PROJECT)], level1, level2).unwrap();

    assert!(result.level1.is_empty());
    assert!(result.level2.is_empty());
    assert!(result.dissolved_level1.0.is_empty());
}

#[test]
fn test_exported_overlay_reads_back_in_target_crs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("overlay").join("level1.geojson");
    let regions = vec![region(AdminLevel::Level1, "vichada", PROJECT)];

    write_regions_geojson(&path, &regions, &Crs::utm_19s()).unwrap();
    let dataset = read_vector(&path).unwrap();

    assert_eq!(dataset.epsg, Some(32719));
    assert_eq!(dataset.features.len(), 1);
    assert_eq!(dataset.features[0].id, "vichada");
    assert_eq!(dataset.features[0].properties["NAME"], "vichada");
}
