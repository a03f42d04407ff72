use jnr_core::models::{ChangeSummary, EmissionBreakdown, EmissionFactors};
use serde::Serialize;
use tabled::Tabled;

/// Output for classify command
#[derive(Debug, Serialize)]
pub struct ClassifyOutput {
    pub output: String,
    pub epsg: u32,
    pub rows: usize,
    pub cols: usize,
    pub summary: ChangeSummary,
}

/// Row of the change class table
#[derive(Debug, Tabled)]
pub struct ClassRow {
    #[tabled(rename = "Class")]
    pub class: u8,
    #[tabled(rename = "Meaning")]
    pub meaning: &'static str,
    #[tabled(rename = "Pixels")]
    pub pixels: usize,
}

impl ClassRow {
    pub fn rows(summary: &ChangeSummary) -> Vec<ClassRow> {
        vec![
            ClassRow { class: 0, meaning: "non-forest or lost early", pixels: summary.other },
            ClassRow { class: 1, meaning: "lost in the second epoch", pixels: summary.early_loss },
            ClassRow { class: 2, meaning: "lost in the third epoch", pixels: summary.late_loss },
            ClassRow { class: 3, meaning: "stable forest", pixels: summary.stable_forest },
        ]
    }
}

/// Output for emission command
#[derive(Debug, Serialize)]
pub struct EmissionOutput {
    pub density: String,
    pub biomass: String,
    pub factors: EmissionFactors,
    pub breakdown: EmissionBreakdown,
}

/// Published artifact row
#[derive(Debug, Tabled)]
pub struct ArtifactRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "URL")]
    pub url: String,
}

/// Resolved configuration value with its source
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigEntry {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}
