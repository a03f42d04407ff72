//! Cropping and masking rasters to boundary geometries.
//!
//! The output window is the geometries' bounding box in pixel space, floored
//! at the top-left and ceiled at the bottom-right, then intersected with the
//! raster. Inside the window, pixels whose centre falls outside every
//! geometry receive the raster's nodata value, or zero when it has none.

use crate::io::read_geotiff;
use gdal::raster::GdalType;
use geo::{BoundingRect, Intersects, MultiPolygon, Point, Rect};
use jnr_core::error::{JnrError, Result};
use jnr_core::models::{union_bounds, RasterGrid, RasterMetadata};
use ndarray::{s, Axis};
use num_traits::{NumCast, Zero};
use std::path::Path;

/// Pixel window of a crop, in source raster coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    /// Window covering `bounds`, clamped to a `cols` x `rows` raster.
    /// `None` when nothing overlaps.
    pub fn from_bounds(
        raster: &RasterMetadata,
        bounds: &Rect<f64>,
    ) -> Result<Option<Self>> {
        let transform = raster.transform;
        let (c0, r0) = transform.world_to_pixel(bounds.min().x, bounds.max().y)?;
        let (c1, r1) = transform.world_to_pixel(bounds.max().x, bounds.min().y)?;

        let clamp = |v: f64, max: usize| v.max(0.0).min(max as f64) as usize;
        let col_min = clamp(c0.min(c1).floor(), raster.width);
        let col_max = clamp(c0.max(c1).ceil(), raster.width);
        let row_min = clamp(r0.min(r1).floor(), raster.height);
        let row_max = clamp(r0.max(r1).ceil(), raster.height);

        if col_min >= col_max || row_min >= row_max {
            return Ok(None);
        }

        Ok(Some(Self {
            col_off: col_min,
            row_off: row_min,
            width: col_max - col_min,
            height: row_max - row_min,
        }))
    }
}

/// A raster cropped and masked to a boundary
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedRaster<T> {
    pub grid: RasterGrid<T>,
    pub window: PixelWindow,
    /// Pixels inside the window set to the fill value
    pub masked_pixels: usize,
}

impl<T: Copy> ClippedRaster<T> {
    pub fn metadata(&self) -> RasterMetadata {
        self.grid.metadata()
    }

    pub fn into_grid(self) -> RasterGrid<T> {
        self.grid
    }
}

/// Value written to masked pixels
fn fill_value<T: NumCast + Zero>(nodata: Option<f64>) -> T {
    nodata.and_then(|nd| <T as NumCast>::from(nd)).unwrap_or_else(T::zero)
}

/// Crop `raster` to the pixel window covering `bounds`, without masking
pub fn crop<T: Copy>(raster: &RasterGrid<T>, bounds: &Rect<f64>) -> Result<(RasterGrid<T>, PixelWindow)> {
    let metadata = raster.metadata();
    let window = PixelWindow::from_bounds(&metadata, bounds)?.ok_or_else(|| {
        JnrError::NoOverlap { raster: raster.describe(&metadata.crs.authority_string()) }
    })?;

    let data = raster
        .data()
        .slice(s![
            ..,
            window.row_off..window.row_off + window.height,
            window.col_off..window.col_off + window.width
        ])
        .to_owned();

    let transform = raster.transform().shifted(window.col_off, window.row_off);
    let grid = RasterGrid::new(data, transform, raster.crs().clone()).with_nodata(raster.nodata());
    Ok((grid, window))
}

/// Crop `raster` to `geometries` and mask pixels outside them.
///
/// Geometries must be in the raster's CRS.
pub fn clip<T>(raster: &RasterGrid<T>, geometries: &[MultiPolygon<f64>]) -> Result<ClippedRaster<T>>
where
    T: Copy + NumCast + Zero,
{
    let bounds = union_bounds(geometries).ok_or_else(|| JnrError::NoGeometry {
        source_name: "clip geometries".to_string(),
    })?;

    let (cropped, window) = crop(raster, &bounds)?;
    let (mut data, transform, crs, nodata) = cropped.into_parts();
    let fill: T = fill_value(nodata);

    let candidates: Vec<(Rect<f64>, &MultiPolygon<f64>)> = geometries
        .iter()
        .filter_map(|g| g.bounding_rect().map(|r| (r, g)))
        .collect();

    let mut masked_pixels = 0;
    for row in 0..window.height {
        for col in 0..window.width {
            let (x, y) = transform.pixel_center(col, row);
            let centre = Point::new(x, y);
            let inside = candidates
                .iter()
                .any(|(rect, geometry)| rect.intersects(&centre) && geometry.intersects(&centre));

            if !inside {
                masked_pixels += 1;
                for mut band in data.axis_iter_mut(Axis(0)) {
                    band[[row, col]] = fill;
                }
            }
        }
    }

    tracing::debug!(
        "Clipped {} to window {:?}, {} pixels masked",
        raster.describe("raster"),
        window,
        masked_pixels
    );

    let grid = RasterGrid::new(data, transform, crs).with_nodata(nodata);
    Ok(ClippedRaster { grid, window, masked_pixels })
}

/// Read a GeoTIFF and clip it to `geometries`
pub fn clip_path<T>(path: &Path, geometries: &[MultiPolygon<f64>]) -> Result<ClippedRaster<T>>
where
    T: GdalType + Copy + NumCast + Zero,
{
    let raster = read_geotiff::<T>(path)?;
    clip(&raster, geometries).map_err(|e| match e {
        JnrError::NoOverlap { .. } => JnrError::NoOverlap { raster: path.display().to_string() },
        other => other,
    })
}
