//! JNR Store - Data source and publisher adapters
//!
//! Adapters for the ports defined in `jnr-core`: a local GeoTIFF catalog
//! serving forest-change and biomass layers, and publishers writing to a
//! local directory or to memory.

pub mod catalog;
pub mod memory;
pub mod publisher;

pub use catalog::{first_matching, CatalogEntry, LocalCatalog};
pub use memory::MemoryPublisher;
pub use publisher::LocalDirectoryPublisher;
