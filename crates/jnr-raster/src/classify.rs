//! Forest-cover change classification.
//!
//! A pixel is baseline forest when its year-2000 tree cover reaches the
//! threshold. For each epoch `e` it is still forest unless the loss year
//! lies in `1..=e`. The three forest flags map to one class:
//!
//! | (f1, f2, f3) | class |
//! |--------------|-------|
//! | (1, 0, 0)    | 1     |
//! | (1, 1, 0)    | 2     |
//! | (1, 1, 1)    | 3     |
//! | otherwise    | 0     |
//!
//! Change rasters carry [`CHANGE_NODATA`] so pixels masked out by a later
//! clip stay distinct from class 0.

use jnr_core::config::{validate_epochs, ChangeSettings};
use jnr_core::error::Result;
use jnr_core::models::{ensure_same_grid, ChangeSummary, RasterGrid};
use ndarray::{ArrayView2, Zip};

pub const CLASS_OTHER: u8 = 0;
pub const CLASS_EARLY_LOSS: u8 = 1;
pub const CLASS_LATE_LOSS: u8 = 2;
pub const CLASS_STABLE_FOREST: u8 = 3;
pub const CHANGE_NODATA: u8 = 255;

/// Class for a tuple of forest flags
pub fn categorize(f1: bool, f2: bool, f3: bool) -> u8 {
    match (f1, f2, f3) {
        (true, false, false) => CLASS_EARLY_LOSS,
        (true, true, false) => CLASS_LATE_LOSS,
        (true, true, true) => CLASS_STABLE_FOREST,
        _ => CLASS_OTHER,
    }
}

/// Pixel counts per class of a change raster band; nodata pixels are not counted
pub fn summarize(classes: ArrayView2<'_, u8>) -> ChangeSummary {
    let mut summary = ChangeSummary::default();
    for &class in classes.iter() {
        match class {
            CHANGE_NODATA => {}
            CLASS_EARLY_LOSS => summary.early_loss += 1,
            CLASS_LATE_LOSS => summary.late_loss += 1,
            CLASS_STABLE_FOREST => summary.stable_forest += 1,
            _ => summary.other += 1,
        }
    }
    summary
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeClassifier {
    forest_threshold: u8,
    epochs: [u8; 3],
}

impl ChangeClassifier {
    /// Epochs must be positive and strictly increasing
    pub fn new(forest_threshold: u8, epochs: [u8; 3]) -> Result<Self> {
        validate_epochs(epochs)?;
        Ok(Self { forest_threshold, epochs })
    }

    pub fn from_settings(settings: &ChangeSettings) -> Result<Self> {
        Self::new(settings.forest_threshold, settings.epochs)
    }

    pub fn epochs(&self) -> [u8; 3] {
        self.epochs
    }

    /// Forest flag per epoch for one pixel
    pub fn forest_flags(&self, treecover: u8, lossyear: u8) -> [bool; 3] {
        let forest = treecover >= self.forest_threshold;
        self.epochs.map(|e| forest && !(1..=e).contains(&lossyear))
    }

    pub fn classify_pixel(&self, treecover: u8, lossyear: u8) -> u8 {
        let [f1, f2, f3] = self.forest_flags(treecover, lossyear);
        categorize(f1, f2, f3)
    }

    /// Classify band 1 of both layers into a single-band change raster
    /// carrying the tree-cover transform and CRS.
    pub fn classify(
        &self,
        treecover: &RasterGrid<u8>,
        lossyear: &RasterGrid<u8>,
    ) -> Result<(RasterGrid<u8>, ChangeSummary)> {
        ensure_same_grid(treecover, "treecover2000", lossyear, "lossyear")?;

        let cover = treecover.band(1)?;
        let loss = lossyear.band(1)?;

        let classes = Zip::from(&cover).and(&loss).map_collect(|&t, &l| self.classify_pixel(t, l));

        let summary = summarize(classes.view());

        tracing::info!(
            "Classified {} pixels: {} stable, {} late loss, {} early loss, {} other",
            summary.total(),
            summary.stable_forest,
            summary.late_loss,
            summary.early_loss,
            summary.other
        );

        let grid =
            RasterGrid::single_band(classes, *treecover.transform(), treecover.crs().clone())
                .with_nodata(Some(f64::from(CHANGE_NODATA)));
        Ok((grid, summary))
    }
}

impl Default for ChangeClassifier {
    fn default() -> Self {
        Self { forest_threshold: 10, epochs: [14, 18, 22] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::clip;
    use geo::{polygon, MultiPolygon};
    use jnr_core::error::JnrError;
    use jnr_core::models::{Crs, GeoTransform};
    use ndarray::array;
    use proptest::prelude::*;

    #[test]
    fn test_categorize_all_tuples() {
        let expected = [
            ((false, false, false), 0),
            ((false, false, true), 0),
            ((false, true, false), 0),
            ((false, true, true), 0),
            ((true, false, false), 1),
            ((true, false, true), 0),
            ((true, true, false), 2),
            ((true, true, true), 3),
        ];
        for ((f1, f2, f3), class) in expected {
            assert_eq!(categorize(f1, f2, f3), class, "tuple ({}, {}, {})", f1, f2, f3);
        }
    }

    #[test]
    fn test_pixel_classes() {
        let classifier = ChangeClassifier::default();
        // Never lost
        assert_eq!(classifier.classify_pixel(80, 0), CLASS_STABLE_FOREST);
        // Lost 2020: forest in 2015 and 2019
        assert_eq!(classifier.classify_pixel(80, 20), CLASS_LATE_LOSS);
        // Lost 2016: forest in 2015 only
        assert_eq!(classifier.classify_pixel(80, 16), CLASS_EARLY_LOSS);
        // Lost 2010: gone before the first epoch
        assert_eq!(classifier.classify_pixel(80, 10), CLASS_OTHER);
        // Below the cover threshold
        assert_eq!(classifier.classify_pixel(9, 0), CLASS_OTHER);
        // Epoch boundaries are inclusive
        assert_eq!(classifier.classify_pixel(10, 14), CLASS_OTHER);
        assert_eq!(classifier.classify_pixel(10, 18), CLASS_EARLY_LOSS);
        assert_eq!(classifier.classify_pixel(10, 22), CLASS_LATE_LOSS);
    }

    #[test]
    fn test_classify_grid() {
        let transform = GeoTransform::north_up(500_000.0, 9_000_000.0, 30.0, 30.0);
        let treecover =
            RasterGrid::single_band(array![[80u8, 80], [80, 5]], transform, Crs::utm_19s());
        let lossyear =
            RasterGrid::single_band(array![[0u8, 16], [20, 0]], transform, Crs::utm_19s());

        let (change, summary) = ChangeClassifier::default().classify(&treecover, &lossyear).unwrap();

        assert_eq!(change.band(1).unwrap(), array![[3u8, 1], [2, 0]]);
        assert_eq!(change.transform(), &transform);
        assert_eq!(
            summary,
            ChangeSummary { other: 1, early_loss: 1, late_loss: 1, stable_forest: 1 }
        );
    }

    #[test]
    fn test_masked_pixels_are_not_counted_as_other() {
        let transform = GeoTransform::north_up(0.0, 60.0, 30.0, 30.0);
        let treecover =
            RasterGrid::single_band(array![[80u8, 80], [80, 5]], transform, Crs::utm_19s());
        let lossyear =
            RasterGrid::single_band(array![[0u8, 16], [20, 0]], transform, Crs::utm_19s());
        let (change, _) = ChangeClassifier::default().classify(&treecover, &lossyear).unwrap();
        assert_eq!(change.nodata(), Some(255.0));

        // Only the upper-left pixel centre lies inside the triangle
        let triangle = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 60.0),
            (x: 55.0, y: 60.0),
            (x: 0.0, y: 0.0),
        ]]);
        let clipped = clip(&change, &[triangle]).unwrap();

        assert_eq!(clipped.grid.band(1).unwrap(), array![[3u8, 255], [255, 255]]);
        assert_eq!(
            summarize(clipped.grid.band(1).unwrap()),
            ChangeSummary { other: 0, early_loss: 0, late_loss: 0, stable_forest: 1 }
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let transform = GeoTransform::north_up(0.0, 0.0, 30.0, 30.0);
        let treecover = RasterGrid::single_band(array![[80u8, 80]], transform, Crs::utm_19s());
        let lossyear = RasterGrid::single_band(array![[0u8], [0]], transform, Crs::utm_19s());

        let err = ChangeClassifier::default().classify(&treecover, &lossyear).unwrap_err();
        assert!(matches!(err, JnrError::GridMismatch { .. }));
    }

    #[test]
    fn test_invalid_epochs() {
        assert!(ChangeClassifier::new(10, [14, 14, 22]).is_err());
        assert!(ChangeClassifier::new(10, [0, 18, 22]).is_err());
        assert!(ChangeClassifier::new(10, [22, 18, 14]).is_err());
    }

    proptest! {
        #[test]
        fn prop_classes_in_range_and_monotone(treecover in 0u8..=100, lossyear in 0u8..=23) {
            let classifier = ChangeClassifier::default();
            let class = classifier.classify_pixel(treecover, lossyear);
            prop_assert!(class <= 3);

            // Forest flags never come back once lost
            let [f1, f2, f3] = classifier.forest_flags(treecover, lossyear);
            prop_assert!(f1 || !f2);
            prop_assert!(f2 || !f3);
        }
    }
}
