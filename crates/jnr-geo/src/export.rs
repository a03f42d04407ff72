//! GeoJSON export of boundaries and overlay results

use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use jnr_core::error::{JnrError, Result};
use jnr_core::models::{AdminRegion, BoundaryFeature, Crs};
use std::fs;
use std::path::Path;

/// Legacy named `crs` member so the CRS survives a round trip
fn crs_member(crs: &Crs) -> JsonObject {
    let mut member = JsonObject::new();
    member.insert(
        "crs".to_string(),
        serde_json::json!({
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.epsg) }
        }),
    );
    member
}

fn to_feature(feature: &BoundaryFeature) -> Feature {
    let properties: JsonObject =
        feature.properties.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&feature.geometry))),
        id: Some(geojson::feature::Id::String(feature.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Build a feature collection from boundary features in `crs`
pub fn to_feature_collection<'a>(
    features: impl IntoIterator<Item = &'a BoundaryFeature>,
    crs: &Crs,
) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: features.into_iter().map(to_feature).collect(),
        foreign_members: Some(crs_member(crs)),
    }
}

/// Write boundary features as a GeoJSON FeatureCollection
pub fn write_features_geojson<'a>(
    path: &Path,
    features: impl IntoIterator<Item = &'a BoundaryFeature>,
    crs: &Crs,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let collection = to_feature_collection(features, crs);
    let content = serde_json::to_string(&GeoJson::FeatureCollection(collection))
        .map_err(|e| JnrError::Serialization(format!("Failed to serialize GeoJSON: {}", e)))?;
    fs::write(path, content)?;

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

/// Write administrative regions as a GeoJSON FeatureCollection
pub fn write_regions_geojson(path: &Path, regions: &[AdminRegion], crs: &Crs) -> Result<()> {
    write_features_geojson(path, regions.iter().map(|r| &r.feature), crs)
}
