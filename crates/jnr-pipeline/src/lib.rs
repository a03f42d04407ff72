//! JNR Pipeline - Emission run orchestration
//!
//! This crate wires the boundary, overlay, raster and publishing stages into
//! a single sequential run that produces an [`jnr_core::models::EmissionReport`].

pub mod models;
pub mod pipeline;

pub use models::{ArtifactNames, LocalArtifacts};
pub use pipeline::EmissionPipeline;
