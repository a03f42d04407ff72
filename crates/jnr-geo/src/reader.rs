//! Vector dataset reading for Shapefiles and GeoJSON
//!
//! Shapefiles consist of multiple component files (.shp, .shx, .dbf, .prj).
//! The first three must be present; the .prj file is optional and, when
//! missing, leaves the dataset without a declared CRS.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use jnr_core::error::{JnrError, Result};
use shapefile::dbase::FieldValue as DbaseFieldValue;
use shapefile::{PolygonRing, Reader as ShapefileReader, Shape};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Component files a Shapefile cannot be read without
pub const REQUIRED_SHAPEFILE_COMPONENTS: [&str; 3] = ["shp", "shx", "dbf"];

/// Every component file that travels with a Shapefile
pub const SHAPEFILE_COMPONENTS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

/// Supported vector formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    Shapefile,
    GeoJson,
}

impl VectorFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "shp" => Ok(VectorFormat::Shapefile),
            "geojson" | "json" => Ok(VectorFormat::GeoJson),
            _ => Err(JnrError::Format {
                format: "vector".to_string(),
                message: format!(
                    "unsupported extension '{}' for {} (expected .shp, .geojson or .json)",
                    ext,
                    path.display()
                ),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VectorFormat::Shapefile => "Shapefile",
            VectorFormat::GeoJson => "GeoJSON",
        }
    }
}

/// A feature as read from disk, before any filtering
#[derive(Debug, Clone)]
pub struct VectorFeature {
    pub id: String,
    pub geometry: Option<Geometry<f64>>,
    pub properties: HashMap<String, serde_json::Value>,
}

/// A vector dataset with the CRS it declares, if any
#[derive(Debug, Clone)]
pub struct VectorDataset {
    pub name: String,
    pub path: PathBuf,
    pub format: VectorFormat,
    /// EPSG code declared by the dataset; `None` when it carries no CRS
    pub epsg: Option<u32>,
    pub features: Vec<VectorFeature>,
}

/// Read a Shapefile or GeoJSON dataset
pub fn read_vector(path: &Path) -> Result<VectorDataset> {
    if !path.exists() {
        return Err(JnrError::DataNotFound { path: path.to_path_buf() });
    }

    let format = VectorFormat::from_path(path)?;
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed").to_string();

    let (epsg, features) = match format {
        VectorFormat::Shapefile => read_shapefile(path)?,
        VectorFormat::GeoJson => read_geojson(path)?,
    };

    tracing::debug!(
        "Read {} features from {} {} (declared CRS: {:?})",
        features.len(),
        format.name(),
        path.display(),
        epsg
    );

    Ok(VectorDataset { name, path: path.to_path_buf(), format, epsg, features })
}

/// Paths of the component files present next to a Shapefile
pub fn shapefile_components(path: &Path) -> Vec<PathBuf> {
    SHAPEFILE_COMPONENTS
        .iter()
        .map(|ext| path.with_extension(ext))
        .filter(|p| p.exists())
        .collect()
}

fn verify_components(path: &Path) -> Result<()> {
    for ext in REQUIRED_SHAPEFILE_COMPONENTS {
        let component = path.with_extension(ext);
        if !component.exists() {
            return Err(JnrError::DataNotFound { path: component });
        }
    }
    Ok(())
}

fn shapefile_error(message: String) -> JnrError {
    JnrError::Format { format: "Shapefile".to_string(), message }
}

fn read_shapefile(path: &Path) -> Result<(Option<u32>, Vec<VectorFeature>)> {
    verify_components(path)?;

    let epsg = read_prj(path)?;

    let mut reader = ShapefileReader::from_path(path)
        .map_err(|e| shapefile_error(format!("Failed to open Shapefile: {}", e)))?;

    let mut features = Vec::new();
    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) =
            result.map_err(|e| shapefile_error(format!("Failed to read feature {}: {}", index, e)))?;

        let properties = record
            .into_iter()
            .map(|(name, value)| (name, convert_dbase_value(&value)))
            .collect();

        features.push(VectorFeature {
            id: index.to_string(),
            geometry: convert_shape(&shape)?,
            properties,
        });
    }

    Ok((epsg, features))
}

/// Resolve the CRS declared by the .prj sidecar.
///
/// A missing .prj yields `None`; a .prj naming no recognizable CRS is an error.
fn read_prj(path: &Path) -> Result<Option<u32>> {
    let prj_path = path.with_extension("prj");
    if !prj_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&prj_path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    parse_epsg_from_wkt(&content)
        .map(Some)
        .ok_or_else(|| JnrError::CrsUnresolved { source_name: prj_path.display().to_string() })
}

/// Extract an EPSG code from CRS WKT as found in .prj files.
///
/// Recognizes, in order: the outermost `AUTHORITY["EPSG","n"]`, an `EPSG:n`
/// reference, ESRI/OGC UTM zone names, web mercator and plain WGS 84.
pub fn parse_epsg_from_wkt(wkt: &str) -> Option<u32> {
    // The outermost object's AUTHORITY closes the WKT, so search from the end
    const AUTHORITY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(start) = wkt.rfind(AUTHORITY) {
        let code_start = start + AUTHORITY.len();
        if let Some(end) = wkt[code_start..].find('"') {
            if let Ok(code) = wkt[code_start..code_start + end].parse::<u32>() {
                return Some(code);
            }
        }
    }

    if let Some(start) = wkt.find("EPSG:") {
        let code: String =
            wkt[start + 5..].chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(code) = code.parse::<u32>() {
            return Some(code);
        }
    }

    let lower = wkt.to_ascii_lowercase();
    if let Some(code) = parse_utm_zone_name(&lower) {
        return Some(code);
    }

    if lower.contains("web_mercator") || lower.contains("pseudo-mercator") {
        return Some(3857);
    }

    if !lower.contains("projcs")
        && (lower.contains("gcs_wgs_1984") || lower.contains("\"wgs 84\""))
    {
        return Some(4326);
    }

    None
}

/// `WGS_1984_UTM_Zone_19S` or `WGS 84 / UTM zone 19S`
fn parse_utm_zone_name(lower: &str) -> Option<u32> {
    if !lower.contains("wgs_1984") && !lower.contains("wgs 84") {
        return None;
    }

    let start = ["utm_zone_", "utm zone "].iter().find_map(|p| lower.find(p).map(|i| i + p.len()))?;
    let rest = &lower[start..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let zone: u32 = digits.parse().ok()?;
    if !(1..=60).contains(&zone) {
        return None;
    }

    match rest[digits.len()..].chars().next() {
        Some('n') => Some(32600 + zone),
        Some('s') => Some(32700 + zone),
        _ => None,
    }
}

fn ring_coords<'a, P: 'a>(points: &'a [P], xy: fn(&P) -> (f64, f64)) -> LineString<f64> {
    LineString::from(
        points
            .iter()
            .map(|p| {
                let (x, y) = xy(p);
                Coord { x, y }
            })
            .collect::<Vec<_>>(),
    )
}

/// Group rings into polygons: each outer ring starts a polygon and inner
/// rings attach to the outer ring before them.
fn rings_to_multipolygon<P>(rings: &[PolygonRing<P>], xy: fn(&P) -> (f64, f64)) -> MultiPolygon<f64> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for ring in rings {
        let line = ring_coords(ring.points(), xy);
        match ring {
            PolygonRing::Outer(_) => polygons.push((line, Vec::new())),
            PolygonRing::Inner(_) => match polygons.last_mut() {
                Some((_, interiors)) => interiors.push(line),
                // Hole without a shell: treat it as a shell
                None => polygons.push((line, Vec::new())),
            },
        }
    }

    MultiPolygon(
        polygons.into_iter().map(|(exterior, interiors)| Polygon::new(exterior, interiors)).collect(),
    )
}

fn parts_to_multilinestring<P>(parts: &[Vec<P>], xy: fn(&P) -> (f64, f64)) -> MultiLineString<f64> {
    MultiLineString(parts.iter().map(|part| ring_coords(part, xy)).collect())
}

fn points_to_multipoint<P>(points: &[P], xy: fn(&P) -> (f64, f64)) -> MultiPoint<f64> {
    MultiPoint(
        points
            .iter()
            .map(|p| {
                let (x, y) = xy(p);
                Point::new(x, y)
            })
            .collect(),
    )
}

/// Convert a Shapefile shape into a planar geometry, dropping Z and M
fn convert_shape(shape: &Shape) -> Result<Option<Geometry<f64>>> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => Geometry::Point(Point::new(p.x, p.y)),
        Shape::PointM(p) => Geometry::Point(Point::new(p.x, p.y)),
        Shape::PointZ(p) => Geometry::Point(Point::new(p.x, p.y)),
        Shape::Polyline(l) => {
            Geometry::MultiLineString(parts_to_multilinestring(l.parts(), |p| (p.x, p.y)))
        }
        Shape::PolylineM(l) => {
            Geometry::MultiLineString(parts_to_multilinestring(l.parts(), |p| (p.x, p.y)))
        }
        Shape::PolylineZ(l) => {
            Geometry::MultiLineString(parts_to_multilinestring(l.parts(), |p| (p.x, p.y)))
        }
        Shape::Polygon(poly) => {
            Geometry::MultiPolygon(rings_to_multipolygon(poly.rings(), |p| (p.x, p.y)))
        }
        Shape::PolygonM(poly) => {
            Geometry::MultiPolygon(rings_to_multipolygon(poly.rings(), |p| (p.x, p.y)))
        }
        Shape::PolygonZ(poly) => {
            Geometry::MultiPolygon(rings_to_multipolygon(poly.rings(), |p| (p.x, p.y)))
        }
        Shape::Multipoint(mp) => {
            Geometry::MultiPoint(points_to_multipoint(mp.points(), |p| (p.x, p.y)))
        }
        Shape::MultipointM(mp) => {
            Geometry::MultiPoint(points_to_multipoint(mp.points(), |p| (p.x, p.y)))
        }
        Shape::MultipointZ(mp) => {
            Geometry::MultiPoint(points_to_multipoint(mp.points(), |p| (p.x, p.y)))
        }
        Shape::Multipatch(_) => {
            return Err(shapefile_error(
                "Multipatch geometry type is not supported".to_string(),
            ))
        }
    };
    Ok(Some(geometry))
}

fn json_number(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Convert dBase field value to JSON value
fn convert_dbase_value(value: &DbaseFieldValue) -> serde_json::Value {
    match value {
        DbaseFieldValue::Character(Some(s)) => serde_json::Value::String(s.trim().to_string()),
        DbaseFieldValue::Numeric(Some(n)) => json_number(*n),
        DbaseFieldValue::Logical(Some(b)) => serde_json::Value::Bool(*b),
        DbaseFieldValue::Float(Some(f)) => json_number(*f as f64),
        DbaseFieldValue::Integer(i) => serde_json::Value::Number((*i).into()),
        DbaseFieldValue::Double(d) => json_number(*d),
        DbaseFieldValue::Currency(c) => json_number(*c),
        DbaseFieldValue::Memo(s) => serde_json::Value::String(s.clone()),
        _ => serde_json::Value::Null,
    }
}

fn geojson_error(message: String) -> JnrError {
    JnrError::Format { format: "GeoJSON".to_string(), message }
}

fn read_geojson(path: &Path) -> Result<(Option<u32>, Vec<VectorFeature>)> {
    let content = fs::read_to_string(path)?;
    let geojson: geojson::GeoJson = content
        .parse()
        .map_err(|e| geojson_error(format!("Failed to parse GeoJSON: {}", e)))?;

    match geojson {
        geojson::GeoJson::FeatureCollection(fc) => {
            let epsg = match fc.foreign_members.as_ref().and_then(|fm| fm.get("crs")) {
                Some(crs) => Some(epsg_from_crs_member(crs).ok_or_else(|| {
                    JnrError::CrsUnresolved { source_name: path.display().to_string() }
                })?),
                None => None,
            };

            let features = fc
                .features
                .into_iter()
                .enumerate()
                .map(|(index, feature)| convert_feature(feature, index))
                .collect::<Result<Vec<_>>>()?;

            Ok((epsg, features))
        }
        geojson::GeoJson::Feature(feature) => Ok((None, vec![convert_feature(feature, 0)?])),
        geojson::GeoJson::Geometry(geometry) => Ok((
            None,
            vec![VectorFeature {
                id: "0".to_string(),
                geometry: Some(convert_geojson_value(geometry.value)?),
                properties: HashMap::new(),
            }],
        )),
    }
}

fn convert_geojson_value(value: geojson::Value) -> Result<Geometry<f64>> {
    Geometry::<f64>::try_from(value)
        .map_err(|e| geojson_error(format!("Unsupported geometry: {}", e)))
}

fn convert_feature(feature: geojson::Feature, index: usize) -> Result<VectorFeature> {
    let id = match &feature.id {
        Some(geojson::feature::Id::String(s)) => s.clone(),
        Some(geojson::feature::Id::Number(n)) => n.to_string(),
        None => index.to_string(),
    };

    let geometry = feature.geometry.map(|g| convert_geojson_value(g.value)).transpose()?;

    let properties =
        feature.properties.map(|props| props.into_iter().collect()).unwrap_or_default();

    Ok(VectorFeature { id, geometry, properties })
}

/// Extract EPSG code from a legacy GeoJSON `crs` member
fn epsg_from_crs_member(crs: &serde_json::Value) -> Option<u32> {
    let name = crs.get("properties")?.get("name")?.as_str()?;

    if name.ends_with("CRS84") {
        return Some(4326);
    }

    // "EPSG:3857" or "urn:ogc:def:crs:EPSG::32719"
    let code = name.rsplit(':').next()?;
    code.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_epsg_from_authority() {
        let wkt = r#"PROJCS["WGS 84 / UTM zone 19S",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],AUTHORITY["EPSG","32719"]]"#;
        assert_eq!(parse_epsg_from_wkt(wkt), Some(32719));

        let geographic = r#"GEOGCS["WGS 84",AUTHORITY["EPSG","4326"]]"#;
        assert_eq!(parse_epsg_from_wkt(geographic), Some(4326));
    }

    #[test]
    fn test_parse_epsg_prefix() {
        assert_eq!(parse_epsg_from_wkt("EPSG:3857"), Some(3857));
    }

    #[test]
    fn test_parse_esri_names() {
        let utm = r#"PROJCS["WGS_1984_UTM_Zone_19S",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],UNIT["Meter",1.0]]"#;
        assert_eq!(parse_epsg_from_wkt(utm), Some(32719));

        let gcs = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(parse_epsg_from_wkt(gcs), Some(4326));
    }

    #[test]
    fn test_unknown_wkt() {
        let wkt = r#"PROJCS["Local_Grid",GEOGCS["GCS_Unknown"],PROJECTION["Transverse_Mercator"]]"#;
        assert_eq!(parse_epsg_from_wkt(wkt), None);
    }

    #[test]
    fn test_crs_member_forms() {
        let urn = serde_json::json!({"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32719"}});
        assert_eq!(epsg_from_crs_member(&urn), Some(32719));

        let crs84 =
            serde_json::json!({"type": "name", "properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}});
        assert_eq!(epsg_from_crs_member(&crs84), Some(4326));

        let short = serde_json::json!({"type": "name", "properties": {"name": "EPSG:3857"}});
        assert_eq!(epsg_from_crs_member(&short), Some(3857));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(VectorFormat::from_path(Path::new("a.SHP")).unwrap(), VectorFormat::Shapefile);
        assert_eq!(VectorFormat::from_path(Path::new("a.geojson")).unwrap(), VectorFormat::GeoJson);
        assert!(matches!(
            VectorFormat::from_path(Path::new("a.kml")),
            Err(JnrError::Format { .. })
        ));
    }

    #[test]
    fn test_rings_grouping() {
        use shapefile::Point as ShpPoint;

        let ring = |coords: &[(f64, f64)]| -> Vec<ShpPoint> {
            coords.iter().map(|(x, y)| ShpPoint::new(*x, *y)).collect()
        };
        let rings = vec![
            PolygonRing::Outer(ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)])),
            PolygonRing::Inner(ring(&[(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0), (2.0, 2.0)])),
            PolygonRing::Outer(ring(&[(20.0, 0.0), (20.0, 5.0), (25.0, 5.0), (20.0, 0.0)])),
        ];

        let mp = rings_to_multipolygon(&rings, |p| (p.x, p.y));
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert!(mp.0[1].interiors().is_empty());
    }

    proptest! {
        #[test]
        fn prop_utm_zone_names(zone in 1u32..=60, south in any::<bool>()) {
            let hemisphere = if south { "S" } else { "N" };
            let wkt = format!("PROJCS[\"WGS_1984_UTM_Zone_{}{}\",GEOGCS[\"GCS_WGS_1984\"]]", zone, hemisphere);
            let expected = if south { 32700 + zone } else { 32600 + zone };
            prop_assert_eq!(parse_epsg_from_wkt(&wkt), Some(expected));
        }
    }
}
