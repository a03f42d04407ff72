//! Port trait definitions
//!
//! These traits define the interfaces that adapters must implement.

pub mod publisher;
pub mod sources;

pub use publisher::ArtifactPublisher;
pub use sources::{BiomassSource, DateRange, ForestChangeLayers, ForestChangeSource};
