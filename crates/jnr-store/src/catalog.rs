//! Local GeoTIFF catalog standing in for the remote forest-change and
//! biomass collections.
//!
//! The session (credential check plus image index) is built on first use
//! and reused for every later query.

use chrono::NaiveDate;
use geo::{Intersects, Rect};
use jnr_core::config::{BiomassSettings, ChangeSettings, CredentialSettings, PipelineConfig};
use jnr_core::error::{JnrError, Result};
use jnr_core::models::{Crs, RasterGrid, RasterMetadata};
use jnr_core::ports::{BiomassSource, DateRange, ForestChangeLayers, ForestChangeSource};
use jnr_geo::Reprojector;
use jnr_raster::{crop, read_geotiff, read_metadata};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const SOURCE_NAME: &str = "local catalog";

/// An indexed biomass image
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub date: NaiveDate,
    pub path: PathBuf,
    /// Extent in the image's own CRS
    pub footprint: Rect<f64>,
    pub crs: Crs,
}

impl CatalogEntry {
    pub fn from_metadata(date: NaiveDate, path: PathBuf, metadata: &RasterMetadata) -> Self {
        let (x0, y0) = metadata.transform.pixel_to_world(0.0, 0.0);
        let (x1, y1) =
            metadata.transform.pixel_to_world(metadata.width as f64, metadata.height as f64);
        Self { date, path, footprint: Rect::new((x0, y0), (x1, y1)), crs: metadata.crs.clone() }
    }

    fn intersects(&self, region: &Rect<f64>, region_crs: &Crs) -> Result<bool> {
        let region = Reprojector::new(region_crs, &self.crs)?.rect(region)?;
        Ok(self.footprint.intersects(&region))
    }
}

/// Earliest entry dated inside `range` whose footprint intersects `region`
pub fn first_matching<'a>(
    entries: &'a [CatalogEntry],
    region: &Rect<f64>,
    region_crs: &Crs,
    range: DateRange,
) -> Result<Option<&'a CatalogEntry>> {
    let mut candidates: Vec<&CatalogEntry> =
        entries.iter().filter(|e| range.contains(e.date)).collect();
    candidates.sort_by_key(|e| e.date);

    for entry in candidates {
        if entry.intersects(region, region_crs)? {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

/// State established on first use
#[derive(Debug)]
struct Session {
    service_account: String,
    biomass: Vec<CatalogEntry>,
}

/// Catalog of precomputed GeoTIFFs
#[derive(Debug)]
pub struct LocalCatalog {
    credentials: CredentialSettings,
    change: ChangeSettings,
    biomass: BiomassSettings,
    session: OnceLock<Session>,
}

impl LocalCatalog {
    pub fn new(
        credentials: CredentialSettings,
        change: ChangeSettings,
        biomass: BiomassSettings,
    ) -> Self {
        Self { credentials, change, biomass, session: OnceLock::new() }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.credentials.clone(), config.change.clone(), config.biomass.clone())
    }

    /// Whether the session has been established
    pub fn is_initialized(&self) -> bool {
        self.session.get().is_some()
    }

    /// Service account the session was opened with
    pub fn service_account(&self) -> Result<&str> {
        Ok(&self.session()?.service_account)
    }

    /// Indexed biomass images, earliest first
    pub fn biomass_entries(&self) -> Result<&[CatalogEntry]> {
        Ok(&self.session()?.biomass)
    }

    fn session(&self) -> Result<&Session> {
        if let Some(session) = self.session.get() {
            return Ok(session);
        }

        let session = self.open_session()?;
        // A concurrent initializer may have won; either session is equivalent
        let _ = self.session.set(session);
        self.session.get().ok_or_else(|| remote("session was not stored".to_string()))
    }

    fn open_session(&self) -> Result<Session> {
        let service_account = self
            .credentials
            .service_account
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| remote("no service account configured".to_string()))?;

        let key_file = self
            .credentials
            .key_file
            .as_deref()
            .ok_or_else(|| remote("no credentials key file configured".to_string()))?;
        if !key_file.is_file() {
            return Err(remote(format!("credentials key file {} not found", key_file.display())));
        }

        let mut biomass = Vec::with_capacity(self.biomass.images.len());
        for image in &self.biomass.images {
            let metadata = read_metadata(&image.path)?;
            biomass.push(CatalogEntry::from_metadata(image.date, image.path.clone(), &metadata));
        }
        biomass.sort_by_key(|e| e.date);

        tracing::info!(
            "Opened {} as {} with {} {} images",
            SOURCE_NAME,
            service_account,
            biomass.len(),
            self.biomass.collection
        );

        Ok(Session { service_account, biomass })
    }

    fn read_layer(&self, path: &Path, region: &Rect<f64>, crs: &Crs) -> Result<RasterGrid<u8>> {
        let raster = read_geotiff::<u8>(path)?;
        let region = Reprojector::new(crs, raster.crs())?.rect(region)?;
        let (cropped, window) = crop(&raster, &region).map_err(|e| match e {
            JnrError::NoOverlap { .. } => JnrError::NoOverlap { raster: path.display().to_string() },
            other => other,
        })?;
        tracing::debug!("Cropped {} to {:?}", path.display(), window);
        Ok(cropped)
    }
}

impl ForestChangeSource for LocalCatalog {
    fn forest_change(
        &self,
        region: &Rect<f64>,
        crs: &Crs,
        dataset_version: &str,
    ) -> Result<ForestChangeLayers> {
        self.session()?;

        if dataset_version != self.change.dataset_version {
            return Err(remote(format!(
                "dataset {} is not available, catalog holds {}",
                dataset_version, self.change.dataset_version
            )));
        }

        let treecover2000 = self.read_layer(&self.change.treecover_path, region, crs)?;
        let lossyear = self.read_layer(&self.change.lossyear_path, region, crs)?;

        Ok(ForestChangeLayers { treecover2000, lossyear })
    }
}

impl BiomassSource for LocalCatalog {
    fn first_image(&self, region: &Rect<f64>, crs: &Crs, range: DateRange) -> Result<RasterGrid<f32>> {
        let entries = self.biomass_entries()?;
        let entry = first_matching(entries, region, crs, range)?.ok_or_else(|| {
            JnrError::NoDataInRange { start: range.start.to_string(), end: range.end.to_string() }
        })?;

        tracing::info!("Using {} image dated {}", self.biomass.band, entry.date);
        read_geotiff::<f32>(&entry.path)
    }
}

fn remote(message: String) -> JnrError {
    JnrError::Remote { source_name: SOURCE_NAME.to_string(), message }
}
