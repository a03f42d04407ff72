use serde::{Deserialize, Serialize};

/// Emission-factor constants applied to the density x biomass sum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionFactors {
    /// Below-ground to above-ground biomass expansion
    pub root_to_shoot: f64,
    /// Carbon fraction of dry biomass
    pub carbon_fraction: f64,
    /// CO2 to carbon molecular weight ratio (44/12)
    pub co2_per_carbon: f64,
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self { root_to_shoot: 1.24, carbon_fraction: 0.47, co2_per_carbon: 44.0 / 12.0 }
    }
}

impl EmissionFactors {
    /// Combined multiplier applied to the raw sum
    pub fn multiplier(&self) -> f64 {
        self.root_to_shoot * self.carbon_fraction * self.co2_per_carbon
    }
}

/// Result of the emission arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionBreakdown {
    /// Sum of density x biomass over all pixels
    pub raw_sum: f64,
    /// Pixels with a non-zero product
    pub contributing_pixels: usize,
    /// Pixels replaced by zero because they were NaN or nodata
    pub masked_pixels: usize,
    /// Scaled total emission
    pub total_emission: f64,
}

/// Pixel counts per change class, excluding nodata pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Non-forest or lost before the first epoch
    pub other: usize,
    /// Lost between the first and second epoch
    pub early_loss: usize,
    /// Lost between the second and third epoch
    pub late_loss: usize,
    /// Forest at every epoch
    pub stable_forest: usize,
}

impl ChangeSummary {
    pub fn total(&self) -> usize {
        self.other + self.early_loss + self.late_loss + self.stable_forest
    }
}

/// An artifact handed to the publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedArtifact {
    pub key: String,
    pub url: String,
}

/// Result payload of a successful pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionReport {
    pub total_emission: f64,
    pub breakdown: EmissionBreakdown,
    pub factors: EmissionFactors,
    pub target_epsg: u32,
    pub source_epsg: u32,
    pub change_summary: Option<ChangeSummary>,
    pub level1_regions: Vec<String>,
    pub level2_regions: Vec<String>,
    pub artifacts: Vec<PublishedArtifact>,
}

impl EmissionReport {
    /// URL of the first artifact whose key ends with `suffix`
    pub fn artifact_url(&self, suffix: &str) -> Option<&str> {
        self.artifacts.iter().find(|a| a.key.ends_with(suffix)).map(|a| a.url.as_str())
    }
}
