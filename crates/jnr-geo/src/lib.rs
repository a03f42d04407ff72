//! JNR Geo - Vector boundaries, CRS transformations, and overlay
//!
//! This crate loads project and administrative boundaries from Shapefiles or
//! GeoJSON, reprojects them into the working CRS, and resolves which
//! administrative regions overlap the project.

pub mod export;
pub mod overlay;
pub mod prepare;
pub mod reader;
pub mod transform;
pub mod validation;

pub use export::write_regions_geojson;
pub use overlay::{OverlayResolver, OverlayResult};
pub use prepare::{BoundaryPreparer, PreparedBoundary};
pub use reader::{read_vector, VectorDataset, VectorFeature, VectorFormat};
pub use transform::{crs_match, reproject_multipolygon, Reprojector};
