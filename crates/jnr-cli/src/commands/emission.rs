//! Emission command implementation

use crate::cli::EmissionArgs;
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use crate::output_types::EmissionOutput;
use anyhow::Result;
use jnr_raster::{read_geotiff, EmissionCalculator};
use std::path::Path;

pub fn execute(args: EmissionArgs, config_file: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let config = load_config(config_file)?.resolve()?;

    let density = read_geotiff::<f32>(&args.density)?;
    let biomass = read_geotiff::<f32>(&args.biomass)?;

    let calculator = EmissionCalculator::new(config.emission);
    let breakdown = calculator.compute_grids(&density, &biomass)?;

    if output.is_json() {
        return output.result(EmissionOutput {
            density: args.density.display().to_string(),
            biomass: args.biomass.display().to_string(),
            factors: config.emission,
            breakdown,
        });
    }

    output.section("Emission");
    output.kv("Density x biomass sum", format!("{:.4}", breakdown.raw_sum));
    output.kv("Multiplier", format!("{:.6}", calculator.factors().multiplier()));
    output.kv("Contributing pixels", breakdown.contributing_pixels);
    output.kv("Masked pixels", breakdown.masked_pixels);
    output.success(format!("Total emission {:.4}", breakdown.total_emission));
    Ok(())
}
