//! Run command implementation

use crate::cli::RunArgs;
use crate::config_loader::load_config_with_overrides;
use crate::output::OutputWriter;
use crate::output_types::ArtifactRow;
use anyhow::Result;
use jnr_core::config::CliConfigOverrides;
use jnr_pipeline::EmissionPipeline;
use jnr_store::{LocalCatalog, LocalDirectoryPublisher};
use std::path::Path;

pub fn execute(args: RunArgs, config_file: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let overrides = CliConfigOverrides {
        target_epsg: args.target_epsg,
        default_epsg: args.default_epsg,
        boundary: args.boundary,
        output_dir: args.output_dir,
        bucket: args.bucket,
    };
    let config = load_config_with_overrides(config_file, overrides)?.resolve()?;

    let catalog = LocalCatalog::from_config(&config);
    let publisher = LocalDirectoryPublisher::from_config(&config);
    let pipeline = EmissionPipeline::new(config, &catalog, &catalog, publisher);

    let report = pipeline.run()?;

    if output.is_json() {
        return output.result(&report);
    }

    output.section("Emission");
    output.kv("Total emission", format!("{:.4}", report.total_emission));
    output.kv("Density x biomass sum", format!("{:.4}", report.breakdown.raw_sum));
    output.kv("Contributing pixels", report.breakdown.contributing_pixels);
    output.kv("Masked pixels", report.breakdown.masked_pixels);
    output.kv(
        "Factors",
        format!(
            "root/shoot {} x carbon {} x CO2/C {:.4}",
            report.factors.root_to_shoot, report.factors.carbon_fraction, report.factors.co2_per_carbon
        ),
    );
    output.kv("CRS", format!("EPSG:{} -> EPSG:{}", report.source_epsg, report.target_epsg));

    output.section("Overlapping regions");
    output.kv("Level 1", report.level1_regions.join(", "));
    output.kv("Level 2", report.level2_regions.join(", "));

    if let Some(summary) = &report.change_summary {
        output.section("Forest change");
        output.table(crate::output_types::ClassRow::rows(summary));
    } else {
        output.info("No level-1 region overlaps the boundary; change raster skipped");
    }

    output.section("Published artifacts");
    output.table(
        report
            .artifacts
            .iter()
            .map(|a| ArtifactRow { key: a.key.clone(), url: a.url.clone() })
            .collect(),
    );

    output.success(format!("Published {} artifacts", report.artifacts.len()));
    Ok(())
}
