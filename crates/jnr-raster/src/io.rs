//! GeoTIFF reading and writing through GDAL
//!
//! Datasets are opened, read fully into a [`RasterGrid`] and dropped before
//! returning, so no GDAL handle outlives a call.

use gdal::errors::GdalError;
use gdal::raster::{Buffer, GdalType};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use jnr_core::error::{JnrError, Result};
use jnr_core::models::{Crs, GeoTransform, RasterGrid, RasterMetadata};
use ndarray::Array3;
use std::fs;
use std::path::Path;

/// Convert GDAL errors to JNR errors with context
pub fn convert_gdal_error(err: GdalError, context: &str) -> JnrError {
    JnrError::Raster(format!("{}: {}", context, err))
}

/// Verify that a file exists and is readable
pub fn verify_file_exists(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(JnrError::DataNotFound { path: path.to_path_buf() });
    }
    Ok(())
}

/// True when the GTiff driver is registered with GDAL
pub fn gtiff_available() -> bool {
    DriverManager::get_driver_by_name("GTiff").is_ok()
}

fn dataset_crs(dataset: &Dataset, path: &Path) -> Result<Crs> {
    let unresolved = || JnrError::CrsUnresolved { source_name: path.display().to_string() };

    let mut srs = dataset.spatial_ref().map_err(|_| unresolved())?;
    if let Ok(code) = srs.auth_code() {
        return Ok(Crs::from_epsg(code as u32));
    }

    // GeoTIFF keys without an explicit authority
    srs.auto_identify_epsg().map_err(|_| unresolved())?;
    srs.auth_code().map(|code| Crs::from_epsg(code as u32)).map_err(|_| unresolved())
}

fn open(path: &Path) -> Result<Dataset> {
    verify_file_exists(path)?;
    Dataset::open(path)
        .map_err(|e| convert_gdal_error(e, &format!("Failed to open {}", path.display())))
}

/// Read georeferencing and dimensions without loading pixels
pub fn read_metadata(path: &Path) -> Result<RasterMetadata> {
    let dataset = open(path)?;
    let (width, height) = dataset.raster_size();
    let transform = dataset
        .geo_transform()
        .map_err(|e| convert_gdal_error(e, "Failed to read geotransform"))?;
    let band = dataset.rasterband(1).map_err(|e| convert_gdal_error(e, "Failed to get band 1"))?;

    Ok(RasterMetadata {
        height,
        width,
        band_count: dataset.raster_count(),
        transform: GeoTransform(transform),
        crs: dataset_crs(&dataset, path)?,
        nodata: band.no_data_value(),
    })
}

/// Read every band of a GeoTIFF as `T`
pub fn read_geotiff<T: GdalType + Copy>(path: &Path) -> Result<RasterGrid<T>> {
    tracing::debug!("Opening raster: {}", path.display());
    let dataset = open(path)?;

    let (width, height) = dataset.raster_size();
    let band_count = dataset.raster_count();
    if width == 0 || height == 0 || band_count == 0 {
        return Err(JnrError::Raster(format!(
            "{} has no pixels ({}x{}, {} bands)",
            path.display(),
            width,
            height,
            band_count
        )));
    }

    let transform = dataset
        .geo_transform()
        .map_err(|e| convert_gdal_error(e, "Failed to read geotransform"))?;
    let crs = dataset_crs(&dataset, path)?;

    let mut values = Vec::with_capacity(band_count * width * height);
    let mut nodata = None;
    for index in 1..=band_count {
        let band = dataset
            .rasterband(index)
            .map_err(|e| convert_gdal_error(e, &format!("Failed to get band {}", index)))?;
        if index == 1 {
            nodata = band.no_data_value();
        }
        let buffer = band
            .read_as::<T>((0, 0), (width, height), (width, height), None)
            .map_err(|e| convert_gdal_error(e, &format!("Failed to read band {}", index)))?;
        values.extend_from_slice(buffer.data());
    }

    let data = Array3::from_shape_vec((band_count, height, width), values)
        .map_err(|e| JnrError::Raster(format!("Unexpected buffer size: {}", e)))?;

    tracing::debug!(
        "Read {} ({} bands, {}x{}, {})",
        path.display(),
        band_count,
        width,
        height,
        crs
    );

    Ok(RasterGrid::new(data, GeoTransform(transform), crs).with_nodata(nodata))
}

/// Write a grid as a GeoTIFF with its transform, CRS and nodata value
pub fn write_geotiff<T: GdalType + Copy>(grid: &RasterGrid<T>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let driver = DriverManager::get_driver_by_name("GTiff")
        .map_err(|e| convert_gdal_error(e, "Failed to get GTiff driver"))?;

    let (rows, cols) = (grid.rows(), grid.cols());
    let mut dataset = driver
        .create_with_band_type::<T, _>(path, cols, rows, grid.band_count())
        .map_err(|e| convert_gdal_error(e, &format!("Failed to create {}", path.display())))?;

    dataset
        .set_geo_transform(&grid.transform().0)
        .map_err(|e| convert_gdal_error(e, "Failed to set geo transform"))?;

    let epsg = grid.crs().epsg;
    let wkt = SpatialRef::from_epsg(epsg)
        .and_then(|srs| srs.to_wkt())
        .map_err(|e| convert_gdal_error(e, &format!("Failed to build SpatialRef for EPSG:{}", epsg)))?;
    dataset.set_projection(&wkt).map_err(|e| convert_gdal_error(e, "Failed to set projection"))?;

    for (i, band_data) in grid.data().outer_iter().enumerate() {
        let mut band = dataset
            .rasterband(i + 1)
            .map_err(|e| convert_gdal_error(e, &format!("Failed to get band {}", i + 1)))?;

        if let Some(nodata) = grid.nodata() {
            band.set_no_data_value(Some(nodata))
                .map_err(|e| convert_gdal_error(e, "Failed to set no data value"))?;
        }

        // GDAL expects row-major order
        let mut buffer = Buffer::new((cols, rows), band_data.iter().copied().collect());
        band.write((0, 0), (cols, rows), &mut buffer)
            .map_err(|e| convert_gdal_error(e, &format!("Failed to write band {}", i + 1)))?;
    }

    tracing::debug!("Wrote {} ({}x{})", path.display(), cols, rows);
    Ok(())
}
