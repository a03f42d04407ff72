use geo::{BoundingRect, MultiPolygon};
use jnr_core::config::PipelineConfig;
use jnr_core::error::{JnrError, PipelineStage, Result, StageContext};
use jnr_core::models::{
    AdminLevel, ChangeSummary, EmissionReport, PublishedArtifact, RasterGrid, StoredUpload,
};
use jnr_core::ports::{ArtifactPublisher, BiomassSource, DateRange, ForestChangeSource};
use jnr_geo::{
    write_regions_geojson, BoundaryPreparer, OverlayResolver, OverlayResult, PreparedBoundary,
    Reprojector,
};
use jnr_raster::{
    clip, clip_path, read_metadata, summarize, write_geotiff, ChangeClassifier,
    EmissionCalculator,
};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{file_name, ArtifactNames, LocalArtifacts};

/// Components built from a validated configuration
struct Stages {
    preparer: BoundaryPreparer,
    resolver: OverlayResolver,
    classifier: ChangeClassifier,
    calculator: EmissionCalculator,
    biomass_range: DateRange,
}

/// Emission pipeline running every stage in order for one boundary
pub struct EmissionPipeline<F, B, P>
where
    F: ForestChangeSource,
    B: BiomassSource,
    P: ArtifactPublisher,
{
    config: PipelineConfig,
    forest: F,
    biomass: B,
    publisher: P,
    names: ArtifactNames,
}

impl<F, B, P> EmissionPipeline<F, B, P>
where
    F: ForestChangeSource,
    B: BiomassSource,
    P: ArtifactPublisher,
{
    pub fn new(config: PipelineConfig, forest: F, biomass: B, publisher: P) -> Self {
        Self { config, forest, biomass, publisher, names: ArtifactNames::default() }
    }

    pub fn with_artifact_names(mut self, names: ArtifactNames) -> Self {
        self.names = names;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run against the configured boundary
    pub fn run(&self) -> Result<EmissionReport> {
        self.run_boundary(&self.config.boundary)
    }

    /// Run against an uploaded boundary file
    pub fn run_upload(&self, upload: &StoredUpload) -> Result<EmissionReport> {
        tracing::info!("Running upload {} ({})", upload.name, upload.id);
        self.run_boundary(upload.path())
    }

    /// Run every stage for the boundary at `boundary_path`.
    ///
    /// Errors carry the stage they were raised in. Artifacts already
    /// published stay published when a later upload fails.
    pub fn run_boundary(&self, boundary_path: &Path) -> Result<EmissionReport> {
        tracing::info!("Starting emission run for {}", boundary_path.display());

        let stages = self.configure().stage(PipelineStage::Configure)?;
        let mut local = LocalArtifacts::default();

        let boundary =
            stages.preparer.prepare(boundary_path).stage(PipelineStage::PrepareBoundary)?;

        let overlay = self
            .resolve_overlay(&stages, &boundary, &mut local)
            .stage(PipelineStage::ResolveOverlay)?;

        let change_summary = self
            .classify_change(&stages, &overlay, &mut local)
            .stage(PipelineStage::ClassifyChange)?;

        let (density, biomass) = self
            .clip_inputs(&stages, &boundary, &mut local)
            .stage(PipelineStage::ClipRaster)?;

        let breakdown = stages
            .calculator
            .compute_grids(&density, &biomass)
            .stage(PipelineStage::ComputeEmission)?;

        local.extend(boundary.sidecar_paths().into_iter().filter(|p| p.is_file()));
        let artifacts = self.publish(&local).stage(PipelineStage::Publish)?;

        tracing::info!(
            "Run finished: total emission {:.4}, {} artifacts published",
            breakdown.total_emission,
            artifacts.len()
        );

        Ok(EmissionReport {
            total_emission: breakdown.total_emission,
            breakdown,
            factors: self.config.emission,
            target_epsg: boundary.target_crs().epsg,
            source_epsg: boundary.source_crs().epsg,
            change_summary,
            level1_regions: overlay.level1_names(),
            level2_regions: overlay.level2_names(),
            artifacts,
        })
    }

    fn configure(&self) -> Result<Stages> {
        self.config.validate()?;

        let precomputed = &self.config.inputs.precomputed_dir;
        if !precomputed.is_dir() {
            return Err(JnrError::DataNotFound { path: precomputed.clone() });
        }
        fs::create_dir_all(&self.config.output_dir)?;

        Ok(Stages {
            preparer: BoundaryPreparer::new(
                self.config.target_crs.clone(),
                self.config.default_crs.clone(),
            )?,
            resolver: OverlayResolver::new(self.config.overlay.buffer),
            classifier: ChangeClassifier::from_settings(&self.config.change)?,
            calculator: EmissionCalculator::new(self.config.emission),
            biomass_range: self.config.biomass_range()?,
        })
    }

    fn output_path(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }

    fn resolve_overlay(
        &self,
        stages: &Stages,
        boundary: &PreparedBoundary,
        local: &mut LocalArtifacts,
    ) -> Result<OverlayResult> {
        let inputs = &self.config.inputs;
        let level1 = stages.preparer.admin_regions(&inputs.admin_level1, AdminLevel::Level1)?;
        let level2 = stages.preparer.admin_regions(&inputs.admin_level2, AdminLevel::Level2)?;

        let overlay =
            stages.resolver.resolve(&boundary.reprojected_geometries(), level1, level2)?;
        if overlay.skipped > 0 {
            tracing::warn!("{} features collapsed under the overlay buffer", overlay.skipped);
        }

        let target = boundary.target_crs();
        for (regions, name) in [(&overlay.level1, &self.names.level1), (&overlay.level2, &self.names.level2)]
        {
            let path = self.output_path(name);
            write_regions_geojson(&path, regions, target)?;
            local.push(path);
        }

        Ok(overlay)
    }

    /// Change raster over the dissolved level-1 region; skipped when no
    /// level-1 region overlaps the boundary
    fn classify_change(
        &self,
        stages: &Stages,
        overlay: &OverlayResult,
        local: &mut LocalArtifacts,
    ) -> Result<Option<ChangeSummary>> {
        let region = &overlay.dissolved_level1;
        let Some(bounds) = region.bounding_rect() else {
            tracing::warn!("No level-1 region overlaps the boundary, skipping change raster");
            return Ok(None);
        };

        let target = stages.preparer.target();
        let layers =
            self.forest.forest_change(&bounds, target, &self.config.change.dataset_version)?;
        let (change, _) = stages.classifier.classify(&layers.treecover2000, &layers.lossyear)?;

        let region: MultiPolygon<f64> = Reprojector::new(target, change.crs())?.multipolygon(region)?;
        let clipped = clip(&change, &[region])?;
        let summary = summarize(clipped.grid.band(1)?);

        let path = self.output_path(&self.names.change);
        write_geotiff(&clipped.grid, &path)?;
        local.push(path);

        Ok(Some(summary))
    }

    fn clip_inputs(
        &self,
        stages: &Stages,
        boundary: &PreparedBoundary,
        local: &mut LocalArtifacts,
    ) -> Result<(RasterGrid<f32>, RasterGrid<f32>)> {
        let density_path = &self.config.inputs.density_raster;
        let density_crs = read_metadata(density_path)?.crs;
        let density = clip_path::<f32>(density_path, &boundary.geometries_in(&density_crs)?)?;

        let envelope = boundary.envelope().ok_or_else(|| JnrError::NoGeometry {
            source_name: boundary.source_path().display().to_string(),
        })?;
        let image =
            self.biomass.first_image(&envelope, boundary.target_crs(), stages.biomass_range)?;
        let biomass = clip(&image, &boundary.geometries_in(image.crs())?)?;

        tracing::info!(
            "Clipped density to {}x{} and biomass to {}x{}",
            density.grid.rows(),
            density.grid.cols(),
            biomass.grid.rows(),
            biomass.grid.cols()
        );

        for (grid, name) in [(&density.grid, &self.names.density), (&biomass.grid, &self.names.biomass)] {
            let path = self.output_path(name);
            write_geotiff(grid, &path)?;
            local.push(path);
        }

        Ok((density.into_grid(), biomass.into_grid()))
    }

    fn publish(&self, local: &LocalArtifacts) -> Result<Vec<PublishedArtifact>> {
        let mut artifacts = Vec::with_capacity(local.len());

        for path in local.files() {
            let name = file_name(path).ok_or_else(|| JnrError::Upload {
                key: path.display().to_string(),
                message: "artifact path has no file name".to_string(),
            })?;
            let key = self.config.object_key(&name);

            self.publisher.store(path, &key)?;
            let url = self.publisher.presigned_url(&key, self.config.url_expiry_secs)?;
            artifacts.push(PublishedArtifact { key, url });
        }

        Ok(artifacts)
    }
}
