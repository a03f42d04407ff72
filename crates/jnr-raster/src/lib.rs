//! JNR Raster - GeoTIFF I/O, forest-change classification, clipping and
//! emission arithmetic
//!
//! Every operation works on in-memory [`jnr_core::models::RasterGrid`]s;
//! only [`io`] touches GDAL.

pub mod classify;
pub mod clip;
pub mod emission;
pub mod io;

pub use classify::{categorize, summarize, ChangeClassifier};
pub use clip::{clip, clip_path, crop, ClippedRaster, PixelWindow};
pub use emission::EmissionCalculator;
pub use io::{convert_gdal_error, gtiff_available, read_geotiff, read_metadata, write_geotiff};
