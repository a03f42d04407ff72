//! Boundary preparation: load, assign a CRS, filter, and reproject.

use crate::reader::{read_vector, shapefile_components, VectorDataset, VectorFormat};
use crate::transform::Reprojector;
use crate::validation::validate_multipolygon;
use geo::{Geometry, MultiPolygon, Rect};
use jnr_core::error::{JnrError, Result};
use jnr_core::models::{union_bounds, AdminLevel, AdminRegion, BoundaryFeature, Crs};
use std::path::{Path, PathBuf};

/// A project boundary in both its source CRS and the working CRS
#[derive(Debug, Clone)]
pub struct PreparedBoundary {
    source: PathBuf,
    format: VectorFormat,
    source_crs: Crs,
    crs_assumed: bool,
    target_crs: Crs,
    features: Vec<BoundaryFeature>,
    reprojected: Vec<BoundaryFeature>,
}

impl PreparedBoundary {
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    /// CRS of the file, after the default was applied to files declaring none
    pub fn source_crs(&self) -> &Crs {
        &self.source_crs
    }

    /// True when the file declared no CRS and the default was assigned
    pub fn crs_assumed(&self) -> bool {
        self.crs_assumed
    }

    pub fn target_crs(&self) -> &Crs {
        &self.target_crs
    }

    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    pub fn reprojected_features(&self) -> &[BoundaryFeature] {
        &self.reprojected
    }

    /// Geometries as read, in the source CRS
    pub fn geometries(&self) -> Vec<MultiPolygon<f64>> {
        self.features.iter().map(|f| f.geometry.clone()).collect()
    }

    /// Geometries in the target CRS
    pub fn reprojected_geometries(&self) -> Vec<MultiPolygon<f64>> {
        self.reprojected.iter().map(|f| f.geometry.clone()).collect()
    }

    /// Geometries in an arbitrary CRS, e.g. the CRS of a raster to clip
    pub fn geometries_in(&self, crs: &Crs) -> Result<Vec<MultiPolygon<f64>>> {
        if crs.epsg == self.target_crs.epsg {
            return Ok(self.reprojected_geometries());
        }
        let reprojector = Reprojector::new(&self.source_crs, crs)?;
        self.features.iter().map(|f| reprojector.multipolygon(&f.geometry)).collect()
    }

    /// Bounding rectangle of the boundary in the target CRS
    pub fn envelope(&self) -> Option<Rect<f64>> {
        union_bounds(&self.reprojected_geometries())
    }

    /// Files making up the boundary dataset on disk
    pub fn sidecar_paths(&self) -> Vec<PathBuf> {
        match self.format {
            VectorFormat::Shapefile => shapefile_components(&self.source),
            VectorFormat::GeoJson => vec![self.source.clone()],
        }
    }
}

/// Loads vector boundaries and brings them into the working CRS
#[derive(Debug, Clone)]
pub struct BoundaryPreparer {
    target: Crs,
    default: Crs,
}

impl BoundaryPreparer {
    /// `target` must be projected with metre units; `default` is assigned to
    /// files that declare no CRS.
    pub fn new(target: Crs, default: Crs) -> Result<Self> {
        if !target.is_projected_metric() {
            return Err(JnrError::ConfigInvalid {
                key: "target_epsg".to_string(),
                reason: format!("{} is not a projected CRS with metre units", target),
            });
        }
        Ok(Self { target, default })
    }

    pub fn target(&self) -> &Crs {
        &self.target
    }

    /// Load the project boundary at `path`
    pub fn prepare(&self, path: &Path) -> Result<PreparedBoundary> {
        let dataset = read_vector(path)?;
        let source_name = dataset.path.display().to_string();
        let format = dataset.format;

        let (source_crs, crs_assumed) = match dataset.epsg {
            Some(epsg) => (Crs::from_epsg(epsg), false),
            None => {
                tracing::warn!(
                    "{} declares no CRS, assuming {}",
                    source_name,
                    self.default
                );
                (self.default.clone(), true)
            }
        };

        let features = polygon_features(dataset)?;
        if features.is_empty() {
            return Err(JnrError::NoGeometry { source_name });
        }

        let reprojector = Reprojector::new(&source_crs, &self.target)?;
        let reprojected = features
            .iter()
            .map(|f| {
                Ok(BoundaryFeature {
                    id: f.id.clone(),
                    geometry: reprojector.multipolygon(&f.geometry)?,
                    properties: f.properties.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            "Prepared {} boundary features from {} ({} -> {})",
            reprojected.len(),
            source_name,
            source_crs,
            self.target
        );

        Ok(PreparedBoundary {
            source: path.to_path_buf(),
            format,
            source_crs,
            crs_assumed,
            target_crs: self.target.clone(),
            features,
            reprojected,
        })
    }

    /// Load administrative regions in the target CRS
    pub fn admin_regions(&self, path: &Path, level: AdminLevel) -> Result<Vec<AdminRegion>> {
        let prepared = self.prepare(path)?;
        Ok(prepared
            .reprojected
            .into_iter()
            .map(|feature| AdminRegion::new(level, feature))
            .collect())
    }
}

/// Keep the polygonal features, dropping null, empty and non-areal geometries
fn polygon_features(dataset: VectorDataset) -> Result<Vec<BoundaryFeature>> {
    let mut features = Vec::new();
    let mut skipped = 0usize;

    for feature in dataset.features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };

        let Some(multipolygon) = as_multipolygon(geometry) else {
            tracing::warn!(
                "Feature {} in {} is not polygonal, skipping",
                feature.id,
                dataset.name
            );
            skipped += 1;
            continue;
        };

        let boundary = BoundaryFeature {
            id: feature.id,
            geometry: multipolygon,
            properties: feature.properties,
        };
        if boundary.is_empty() {
            skipped += 1;
            continue;
        }

        let validation = validate_multipolygon(&boundary.geometry);
        if !validation.is_valid {
            return Err(JnrError::InvalidGeometry {
                feature_id: boundary.id,
                reason: validation.summary(),
            });
        }

        features.push(boundary);
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} null, empty or non-polygonal features", skipped);
    }

    Ok(features)
}

fn as_multipolygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::Rect(r) => Some(MultiPolygon(vec![r.to_polygon()])),
        Geometry::GeometryCollection(gc) => {
            let polygons: Vec<_> =
                gc.0.into_iter().filter_map(as_multipolygon).flat_map(|mp| mp.0).collect();
            (!polygons.is_empty()).then_some(MultiPolygon(polygons))
        }
        _ => None,
    }
}
