//! Error types for JNR

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Configure,
    PrepareBoundary,
    ResolveOverlay,
    ClassifyChange,
    ClipRaster,
    ComputeEmission,
    Publish,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Configure => "configure",
            PipelineStage::PrepareBoundary => "prepare boundary",
            PipelineStage::ResolveOverlay => "resolve overlay",
            PipelineStage::ClassifyChange => "classify change",
            PipelineStage::ClipRaster => "clip raster",
            PipelineStage::ComputeEmission => "compute emission",
            PipelineStage::Publish => "publish",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum JnrError {
    // Input data errors
    #[error("Required data not found: {path}")]
    DataNotFound { path: PathBuf },

    #[error("No valid geometries found in {source_name}")]
    NoGeometry { source_name: String },

    #[error("Invalid geometry at feature {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },

    #[error("Failed to read {format} data: {message}")]
    Format { format: String, message: String },

    // CRS errors
    #[error("Could not determine an EPSG code for {source_name}")]
    CrsUnresolved { source_name: String },

    #[error("Projection from EPSG:{from} to EPSG:{to} failed: {reason}")]
    Projection { from: u32, to: u32, reason: String },

    // Raster errors
    #[error("Grid mismatch: {left} does not match {right}")]
    GridMismatch { left: String, right: String },

    #[error("Input shapes do not overlap raster {raster}")]
    NoOverlap { raster: String },

    #[error("Raster error: {0}")]
    Raster(String),

    // Overlay errors
    #[error("Buffering by {distance} left no geometry")]
    EmptyBuffer { distance: f64 },

    // Data source errors
    #[error("No data found between {start} and {end}")]
    NoDataInRange { start: String, end: String },

    #[error("Data source {source_name} failed: {message}")]
    Remote { source_name: String, message: String },

    // Publisher errors
    #[error("Failed to publish {key}: {message}")]
    Upload { key: String, message: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<JnrError>,
    },
}

impl JnrError {
    /// Attribute this error to a pipeline stage, keeping the innermost stage
    pub fn in_stage(self, stage: PipelineStage) -> Self {
        match self {
            JnrError::Stage { .. } => self,
            other => JnrError::Stage { stage, source: Box::new(other) },
        }
    }

    /// Stage this error was raised in, if known
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            JnrError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The error without its stage wrapper
    pub fn root(&self) -> &JnrError {
        match self {
            JnrError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, JnrError>;

/// Extension for tagging results with the stage they belong to
pub trait StageContext<T> {
    fn stage(self, stage: PipelineStage) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    fn stage(self, stage: PipelineStage) -> Result<T> {
        self.map_err(|e| e.in_stage(stage))
    }
}
