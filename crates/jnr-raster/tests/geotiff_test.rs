//! GeoTIFF round trips through clipping and classification
//!
//! Skipped when GDAL was built without the GTiff driver.

use geo::{polygon, MultiPolygon};
use jnr_core::models::{Crs, GeoTransform, RasterGrid};
use jnr_core::JnrError;
use jnr_raster::{
    clip_path, gtiff_available, read_geotiff, write_geotiff, ChangeClassifier, EmissionCalculator,
};
use ndarray::{array, Array2};
use tempfile::TempDir;

const ORIGIN: (f64, f64) = (500_000.0, 9_000_000.0);

fn transform() -> GeoTransform {
    GeoTransform::north_up(ORIGIN.0, ORIGIN.1, 30.0, 30.0)
}

/// Square covering the top-left `cells` x `cells` pixels
fn top_left_square(cells: f64) -> MultiPolygon<f64> {
    let (x0, y0) = ORIGIN;
    let side = cells * 30.0;
    MultiPolygon(vec![polygon![
        (x: x0, y: y0),
        (x: x0 + side, y: y0),
        (x: x0 + side, y: y0 - side),
        (x: x0, y: y0 - side),
    ]])
}

#[test]
fn test_clip_path_crops_written_raster() {
    if !gtiff_available() {
        eprintln!("GTiff driver not available; skipping test");
        return;
    }

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("density.tif");
    let grid = RasterGrid::single_band(Array2::from_elem((6, 6), 2.0f32), transform(), Crs::utm_19s())
        .with_nodata(Some(-9999.0));
    write_geotiff(&grid, &path).unwrap();

    let clipped = clip_path::<f32>(&path, &[top_left_square(3.0)]).unwrap();

    assert_eq!(clipped.window.width, 3);
    assert_eq!(clipped.window.height, 3);
    assert_eq!(clipped.masked_pixels, 0);
    assert_eq!(clipped.grid.crs().epsg, 32719);
    assert_eq!(clipped.grid.data().sum(), 18.0);

    let emission = EmissionCalculator::default()
        .compute_grids(&clipped.grid, &clipped.grid)
        .unwrap();
    assert_eq!(emission.raw_sum, 36.0);
}

#[test]
fn test_clip_path_reports_path_on_no_overlap() {
    if !gtiff_available() {
        eprintln!("GTiff driver not available; skipping test");
        return;
    }

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("density.tif");
    let grid = RasterGrid::single_band(Array2::from_elem((2, 2), 1.0f32), transform(), Crs::utm_19s());
    write_geotiff(&grid, &path).unwrap();

    let far = MultiPolygon(vec![polygon![
        (x: 0.0, y: 0.0),
        (x: 10.0, y: 0.0),
        (x: 10.0, y: 10.0),
        (x: 0.0, y: 10.0),
    ]]);

    match clip_path::<f32>(&path, &[far]).unwrap_err() {
        JnrError::NoOverlap { raster } => assert!(raster.ends_with("density.tif")),
        other => panic!("expected NoOverlap, got {:?}", other),
    }
}

#[test]
fn test_change_raster_roundtrip() {
    if !gtiff_available() {
        eprintln!("GTiff driver not available; skipping test");
        return;
    }

    let treecover = RasterGrid::single_band(array![[80u8, 80, 5]], transform(), Crs::utm_19s());
    let lossyear = RasterGrid::single_band(array![[0u8, 20, 0]], transform(), Crs::utm_19s());
    let (change, summary) = ChangeClassifier::default().classify(&treecover, &lossyear).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("change.tif");
    write_geotiff(&change, &path).unwrap();
    let read = read_geotiff::<u8>(&path).unwrap();

    assert_eq!(read.band(1).unwrap(), array![[3u8, 2, 0]]);
    assert_eq!(read.transform(), &transform());
    assert_eq!(summary.total(), 3);
}
