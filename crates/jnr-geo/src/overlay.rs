//! Administrative regions overlapping the project boundary.
//!
//! Resolution runs in two narrowing stages. The project boundary is shrunk
//! by the configured buffer and level-1 regions touching its envelope are
//! kept; the kept level-1 regions are shrunk the same way and select the
//! level-2 regions. Features whose buffer collapses are skipped, and a stage
//! fails with [`JnrError::EmptyBuffer`] only when every feature collapses.

use geo::{Area, BooleanOps, Buffer, Intersects, MultiPolygon};
use jnr_core::error::{JnrError, Result};
use jnr_core::models::{union_bounds, AdminRegion, Distance};

/// Regions overlapping the project, in the target CRS
#[derive(Debug, Clone)]
pub struct OverlayResult {
    pub level1: Vec<AdminRegion>,
    pub level2: Vec<AdminRegion>,
    /// Union of the kept level-1 regions
    pub dissolved_level1: MultiPolygon<f64>,
    /// Features whose buffer collapsed, across both stages
    pub skipped: usize,
}

impl OverlayResult {
    pub fn level1_names(&self) -> Vec<String> {
        self.level1.iter().map(AdminRegion::display_name).collect()
    }

    pub fn level2_names(&self) -> Vec<String> {
        self.level2.iter().map(AdminRegion::display_name).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OverlayResolver {
    distance: f64,
}

impl OverlayResolver {
    pub fn new(buffer: Distance) -> Self {
        Self { distance: buffer.to_meters() }
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Select the level-1 and level-2 regions overlapping `project`.
    ///
    /// All geometries must share one projected CRS with metre units.
    pub fn resolve(
        &self,
        project: &[MultiPolygon<f64>],
        level1: Vec<AdminRegion>,
        level2: Vec<AdminRegion>,
    ) -> Result<OverlayResult> {
        let (buffered, mut skipped) =
            self.buffer_all(project.iter().enumerate().map(|(i, g)| (i.to_string(), g)))?;
        let kept1 = filter_by_envelope(&buffered, level1);

        tracing::info!(
            "{} level-1 regions overlap the boundary buffered by {} m",
            kept1.len(),
            self.distance
        );

        let kept2 = if kept1.is_empty() {
            Vec::new()
        } else {
            let (buffered1, skipped1) = self.buffer_all(
                kept1.iter().map(|r| (r.feature.id.clone(), &r.feature.geometry)),
            )?;
            skipped += skipped1;
            filter_by_envelope(&buffered1, level2)
        };

        tracing::info!("{} level-2 regions overlap the buffered level-1 set", kept2.len());

        let dissolved_level1 = kept1
            .iter()
            .fold(MultiPolygon::new(Vec::new()), |acc, r| acc.union(&r.feature.geometry));

        Ok(OverlayResult { level1: kept1, level2: kept2, dissolved_level1, skipped })
    }

    fn buffer_all<'a>(
        &self,
        geometries: impl Iterator<Item = (String, &'a MultiPolygon<f64>)>,
    ) -> Result<(Vec<MultiPolygon<f64>>, usize)> {
        let mut buffered = Vec::new();
        let mut skipped = 0;

        for (id, geometry) in geometries {
            let result = geometry.buffer(self.distance);
            if result.0.is_empty() || result.unsigned_area() <= 0.0 {
                tracing::warn!(
                    "Buffer of {} m collapses feature {}, skipping it",
                    self.distance,
                    id
                );
                skipped += 1;
                continue;
            }
            buffered.push(result);
        }

        if buffered.is_empty() {
            return Err(JnrError::EmptyBuffer { distance: self.distance });
        }

        Ok((buffered, skipped))
    }
}

fn filter_by_envelope(buffered: &[MultiPolygon<f64>], regions: Vec<AdminRegion>) -> Vec<AdminRegion> {
    let Some(envelope) = union_bounds(buffered) else {
        return Vec::new();
    };
    let envelope = envelope.to_polygon();

    regions.into_iter().filter(|r| r.feature.geometry.intersects(&envelope)).collect()
}
