//! Emission arithmetic over co-registered density and biomass rasters.
//!
//! `total = sum(density * biomass) * root_to_shoot * carbon_fraction * co2_per_carbon`
//!
//! NaN pixels count as zero. The sum is accumulated in `f64`.

use jnr_core::error::{JnrError, Result};
use jnr_core::models::{ensure_same_grid, EmissionBreakdown, EmissionFactors, RasterGrid};
use ndarray::{ArrayView2, Zip};
use num_traits::Float;

#[derive(Debug, Clone, Copy, Default)]
pub struct EmissionCalculator {
    factors: EmissionFactors,
}

impl EmissionCalculator {
    pub fn new(factors: EmissionFactors) -> Self {
        Self { factors }
    }

    pub fn factors(&self) -> &EmissionFactors {
        &self.factors
    }

    /// Emission from two equally shaped arrays
    pub fn compute<T: Float>(
        &self,
        density: ArrayView2<'_, T>,
        biomass: ArrayView2<'_, T>,
    ) -> Result<EmissionBreakdown> {
        self.accumulate(density, biomass, None, None)
    }

    /// Emission from band 1 of two grids; each grid's nodata value counts as zero
    pub fn compute_grids<T: Float>(
        &self,
        density: &RasterGrid<T>,
        biomass: &RasterGrid<T>,
    ) -> Result<EmissionBreakdown> {
        ensure_same_grid(density, "density", biomass, "biomass")?;
        self.accumulate(density.band(1)?, biomass.band(1)?, density.nodata(), biomass.nodata())
    }

    fn accumulate<T: Float>(
        &self,
        density: ArrayView2<'_, T>,
        biomass: ArrayView2<'_, T>,
        density_nodata: Option<f64>,
        biomass_nodata: Option<f64>,
    ) -> Result<EmissionBreakdown> {
        if density.shape() != biomass.shape() {
            return Err(JnrError::GridMismatch {
                left: format!("density {:?}", density.shape()),
                right: format!("biomass {:?}", biomass.shape()),
            });
        }

        let mut raw_sum = 0.0f64;
        let mut contributing_pixels = 0usize;
        let mut masked_pixels = 0usize;

        Zip::from(&density).and(&biomass).for_each(|&d, &b| {
            let d = clean(d, density_nodata);
            let b = clean(b, biomass_nodata);
            if d.is_none() || b.is_none() {
                masked_pixels += 1;
            }

            let product = d.unwrap_or(0.0) * b.unwrap_or(0.0);
            if product != 0.0 {
                contributing_pixels += 1;
            }
            raw_sum += product;
        });

        let total_emission = raw_sum * self.factors.multiplier();

        tracing::info!(
            "Emission sum {:.4} over {} contributing pixels ({} masked) -> total {:.4}",
            raw_sum,
            contributing_pixels,
            masked_pixels,
            total_emission
        );

        Ok(EmissionBreakdown { raw_sum, contributing_pixels, masked_pixels, total_emission })
    }
}

/// `None` for NaN or nodata pixels
fn clean<T: Float>(value: T, nodata: Option<f64>) -> Option<f64> {
    let value = value.to_f64()?;
    if value.is_nan() || nodata.is_some_and(|nd| value == nd) {
        None
    } else {
        Some(value)
    }
}
