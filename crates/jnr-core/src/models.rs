pub mod geometry;
pub mod raster;
pub mod report;
pub mod upload;

pub use geometry::{
    union_bounds, AdminLevel, AdminRegion, BoundaryFeature, Crs, Distance, DistanceUnit,
};
pub use raster::{ensure_same_grid, GeoTransform, RasterGrid, RasterMetadata};
pub use report::{
    ChangeSummary, EmissionBreakdown, EmissionFactors, EmissionReport, PublishedArtifact,
};
pub use upload::{StoredUpload, UPLOAD_DIR};
