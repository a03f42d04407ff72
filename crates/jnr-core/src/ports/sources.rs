use chrono::NaiveDate;
use geo::Rect;
use serde::{Deserialize, Serialize};

use crate::error::{JnrError, Result};
use crate::models::{Crs, RasterGrid};

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end <= start {
            return Err(JnrError::ConfigInvalid {
                key: "biomass.date_range".to_string(),
                reason: format!("end {} must be after start {}", end, start),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// Baseline tree cover and loss-year layers of a forest-change dataset
#[derive(Debug, Clone)]
pub struct ForestChangeLayers {
    /// Percent tree cover in the baseline year (0-100)
    pub treecover2000: RasterGrid<u8>,
    /// Year of loss counted from the baseline, 0 when no loss was observed
    pub lossyear: RasterGrid<u8>,
}

/// Port for a forest-change dataset queryable by region
pub trait ForestChangeSource {
    /// Fetch the baseline cover and loss-year layers covering `region`,
    /// expressed in `crs`
    fn forest_change(
        &self,
        region: &Rect<f64>,
        crs: &Crs,
        dataset_version: &str,
    ) -> Result<ForestChangeLayers>;
}

/// Port for an above-ground-biomass image collection
pub trait BiomassSource {
    /// First image in `range` whose footprint intersects `region` (in `crs`).
    ///
    /// Fails with [`JnrError::NoDataInRange`] when nothing matches.
    fn first_image(&self, region: &Rect<f64>, crs: &Crs, range: DateRange)
        -> Result<RasterGrid<f32>>;
}

impl<S: ForestChangeSource + ?Sized> ForestChangeSource for &S {
    fn forest_change(
        &self,
        region: &Rect<f64>,
        crs: &Crs,
        dataset_version: &str,
    ) -> Result<ForestChangeLayers> {
        (**self).forest_change(region, crs, dataset_version)
    }
}

impl<S: BiomassSource + ?Sized> BiomassSource for &S {
    fn first_image(&self, region: &Rect<f64>, crs: &Crs, range: DateRange)
        -> Result<RasterGrid<f32>> {
        (**self).first_image(region, crs, range)
    }
}
