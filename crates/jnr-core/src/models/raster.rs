//! In-memory raster grids with their georeferencing.
//!
//! A [`RasterGrid`] owns its pixel array, affine transform and CRS together so
//! that the three can only change as a unit. [`RasterMetadata`] is always
//! derived from the array, never stored beside it.

use geo::{coord, Rect};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::geometry::Crs;
use crate::error::{JnrError, Result};

/// Affine pixel-to-world transform in GDAL coefficient order:
/// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform from an upper-left origin and a positive pixel size
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self([origin_x, pixel_width, 0.0, origin_y, 0.0, -pixel_height.abs()])
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.0[0], self.0[3])
    }

    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    /// Pixel height as stored (negative for north-up rasters)
    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }

    /// True when the transform has no rotation terms
    pub fn is_north_up(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0 && self.0[1] != 0.0 && self.0[5] != 0.0
    }

    /// World coordinate of a fractional pixel position
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        let [x0, a, b, y0, d, e] = self.0;
        (x0 + col * a + row * b, y0 + col * d + row * e)
    }

    /// World coordinate of a pixel centre
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional pixel position of a world coordinate (north-up only)
    pub fn world_to_pixel(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !self.is_north_up() {
            return Err(JnrError::Raster(
                "rotated geotransforms are not supported".to_string(),
            ));
        }
        let [x0, a, _, y0, _, e] = self.0;
        Ok(((x - x0) / a, (y - y0) / e))
    }

    /// Coefficient-wise equality within a millionth of a pixel
    pub fn approx_eq(&self, other: &GeoTransform) -> bool {
        let pixel = self.pixel_width().abs().min(self.pixel_height().abs());
        let tolerance = 1e-6 * pixel.max(f64::EPSILON);
        self.0.iter().zip(other.0.iter()).all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Transform of a window starting at the given pixel offset
    pub fn shifted(&self, col_off: usize, row_off: usize) -> Self {
        let (x, y) = self.pixel_to_world(col_off as f64, row_off as f64);
        let mut coeffs = self.0;
        coeffs[0] = x;
        coeffs[3] = y;
        Self(coeffs)
    }
}

/// Spatial metadata of a raster, derived from its grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    pub height: usize,
    pub width: usize,
    pub band_count: usize,
    pub transform: GeoTransform,
    pub crs: Crs,
    pub nodata: Option<f64>,
}

/// A banded raster held fully in memory
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid<T> {
    data: Array3<T>,
    transform: GeoTransform,
    crs: Crs,
    nodata: Option<f64>,
}

impl<T: Copy> RasterGrid<T> {
    /// Create a grid from a `(bands, rows, cols)` array
    pub fn new(data: Array3<T>, transform: GeoTransform, crs: Crs) -> Self {
        Self { data, transform, crs, nodata: None }
    }

    /// Create a single-band grid from a `(rows, cols)` array
    pub fn single_band(data: Array2<T>, transform: GeoTransform, crs: Crs) -> Self {
        Self::new(data.insert_axis(Axis(0)), transform, crs)
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn band_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// View of a band, 1-based like GDAL
    pub fn band(&self, index: usize) -> Result<ArrayView2<'_, T>> {
        if index == 0 || index > self.band_count() {
            return Err(JnrError::Raster(format!(
                "band {} out of range (raster has {} bands)",
                index,
                self.band_count()
            )));
        }
        Ok(self.data.index_axis(Axis(0), index - 1))
    }

    pub fn metadata(&self) -> RasterMetadata {
        RasterMetadata {
            height: self.rows(),
            width: self.cols(),
            band_count: self.band_count(),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    /// World-space extent covered by the grid (north-up)
    pub fn extent(&self) -> Rect<f64> {
        let (x0, y0) = self.transform.pixel_to_world(0.0, 0.0);
        let (x1, y1) = self.transform.pixel_to_world(self.cols() as f64, self.rows() as f64);
        Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 })
    }

    /// `"name (bands x rows x cols)"` description used in mismatch errors
    pub fn describe(&self, name: &str) -> String {
        format!("{} ({}x{}x{})", name, self.band_count(), self.rows(), self.cols())
    }

    pub fn into_parts(self) -> (Array3<T>, GeoTransform, Crs, Option<f64>) {
        (self.data, self.transform, self.crs, self.nodata)
    }
}

/// Fail with `GridMismatch` unless both grids share rows, columns, CRS and
/// transform
pub fn ensure_same_grid<A: Copy, B: Copy>(
    left: &RasterGrid<A>,
    left_name: &str,
    right: &RasterGrid<B>,
    right_name: &str,
) -> Result<()> {
    let mismatch = |left: String, right: String| Err(JnrError::GridMismatch { left, right });

    if left.rows() != right.rows() || left.cols() != right.cols() {
        return mismatch(left.describe(left_name), right.describe(right_name));
    }
    if left.crs().epsg != right.crs().epsg {
        return mismatch(
            format!("{} in EPSG:{}", left_name, left.crs().epsg),
            format!("{} in EPSG:{}", right_name, right.crs().epsg),
        );
    }
    if !left.transform().approx_eq(right.transform()) {
        return mismatch(
            format!("{} at {:?}", left_name, left.transform().0),
            format!("{} at {:?}", right_name, right.transform().0),
        );
    }
    Ok(())
}
