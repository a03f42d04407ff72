//! Canonical CRS, distance and feature types used across all jnr crates.

use geo::{BoundingRect, MultiPolygon, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coordinate Reference System identified by EPSG code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: u32,
    pub name: String,
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Crs {
    pub fn new(epsg: u32, name: impl Into<String>) -> Self {
        Self { epsg, name: name.into() }
    }

    /// Build a CRS from a bare EPSG code, naming the well-known ones
    pub fn from_epsg(epsg: u32) -> Self {
        match epsg {
            4326 => Self::wgs84(),
            3857 => Self::new(3857, "Web Mercator"),
            32601..=32660 => Self::new(epsg, format!("WGS 84 / UTM zone {}N", epsg - 32600)),
            32701..=32760 => Self::new(epsg, format!("WGS 84 / UTM zone {}S", epsg - 32700)),
            _ => Self::new(epsg, format!("EPSG:{}", epsg)),
        }
    }

    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::new(4326, "WGS 84")
    }

    /// WGS 84 / UTM zone 19S (EPSG:32719)
    pub fn utm_19s() -> Self {
        Self::from_epsg(32719)
    }

    /// Geographic (degree-based) CRS
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg, 4326 | 4258 | 4269 | 4674)
    }

    /// Projected CRS with metre units, suitable for buffering and area
    pub fn is_projected_metric(&self) -> bool {
        matches!(self.epsg, 3857 | 32601..=32660 | 32701..=32760)
    }

    /// `EPSG:n` identifier understood by PROJ
    pub fn authority_string(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{} ({})", self.epsg, self.name)
    }
}

/// Distance units for spatial operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DistanceUnit {
    #[default]
    Meters,
    Kilometers,
}

impl DistanceUnit {
    /// Convert a distance value to meters
    pub fn to_meters(&self, value: f64) -> f64 {
        match self {
            DistanceUnit::Meters => value,
            DistanceUnit::Kilometers => value * 1000.0,
        }
    }
}

/// Distance with unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub value: f64,
    pub unit: DistanceUnit,
}

impl Distance {
    pub fn new(value: f64, unit: DistanceUnit) -> Self {
        Self { value, unit }
    }

    pub fn meters(value: f64) -> Self {
        Self::new(value, DistanceUnit::Meters)
    }

    pub fn to_meters(&self) -> f64 {
        self.unit.to_meters(self.value)
    }
}

/// A polygonal feature read from a vector dataset
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub id: String,
    pub geometry: MultiPolygon<f64>,
    pub properties: HashMap<String, serde_json::Value>,
}

impl BoundaryFeature {
    pub fn new(id: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self { id: id.into(), geometry, properties: HashMap::new() }
    }

    /// First string-valued property among the given keys
    pub fn name(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|k| self.properties.get(*k).and_then(|v| v.as_str()).map(str::to_string))
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.iter().all(|p| p.exterior().0.is_empty())
    }
}

/// Administrative level of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminLevel {
    Level1,
    Level2,
}

/// An administrative region overlapping the project boundary
#[derive(Debug, Clone, PartialEq)]
pub struct AdminRegion {
    pub level: AdminLevel,
    pub feature: BoundaryFeature,
}

impl AdminRegion {
    pub fn new(level: AdminLevel, feature: BoundaryFeature) -> Self {
        Self { level, feature }
    }

    pub fn display_name(&self) -> String {
        self.feature
            .name(&["ADM2_NAME", "ADM1_NAME", "NAME", "name"])
            .unwrap_or_else(|| self.feature.id.clone())
    }
}

/// Bounding rectangle of a set of multipolygons
pub fn union_bounds(geometries: &[MultiPolygon<f64>]) -> Option<Rect<f64>> {
    geometries.iter().filter_map(|g| g.bounding_rect()).reduce(|a, b| {
        Rect::new(
            geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
            geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_crs_names() {
        assert_eq!(Crs::utm_19s().name, "WGS 84 / UTM zone 19S");
        assert_eq!(Crs::from_epsg(32633).name, "WGS 84 / UTM zone 33N");
        assert!(Crs::utm_19s().is_projected_metric());
        assert!(Crs::wgs84().is_geographic());
        assert!(!Crs::wgs84().is_projected_metric());
    }

    #[test]
    fn test_distance_conversion() {
        let km = Distance::new(1.5, DistanceUnit::Kilometers);
        assert!((km.to_meters() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_union_bounds() {
        let a = MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]]);
        let b = MultiPolygon(vec![polygon![(x: 5.0, y: -2.0), (x: 6.0, y: 0.0), (x: 5.0, y: 3.0)]]);

        let bounds = union_bounds(&[a, b]).unwrap();
        assert_eq!(bounds.min(), geo::coord! { x: 0.0, y: -2.0 });
        assert_eq!(bounds.max(), geo::coord! { x: 6.0, y: 3.0 });
    }

    #[test]
    fn test_region_display_name_falls_back_to_id() {
        let feature = BoundaryFeature::new("17", MultiPolygon(vec![]));
        let region = AdminRegion::new(AdminLevel::Level1, feature);
        assert_eq!(region.display_name(), "17");
    }
}
