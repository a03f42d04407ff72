//! Classify command implementation

use crate::cli::ClassifyArgs;
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use crate::output_types::{ClassRow, ClassifyOutput};
use anyhow::{bail, Context, Result};
use jnr_raster::{read_geotiff, write_geotiff, ChangeClassifier};
use std::path::Path;

pub fn execute(args: ClassifyArgs, config_file: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let settings = load_config(config_file)?.sections.change;

    let threshold = args.threshold.unwrap_or(settings.forest_threshold);
    let epochs = match args.epochs.as_deref() {
        None => settings.epochs,
        Some(&[e1, e2, e3]) => [e1, e2, e3],
        Some(other) => bail!("Expected three epochs, got {}", other.len()),
    };
    let classifier = ChangeClassifier::new(threshold, epochs)?;

    let treecover = read_geotiff::<u8>(&args.treecover)
        .with_context(|| format!("Failed to read tree cover {}", args.treecover.display()))?;
    let lossyear = read_geotiff::<u8>(&args.lossyear)
        .with_context(|| format!("Failed to read loss year {}", args.lossyear.display()))?;

    let (change, summary) = classifier.classify(&treecover, &lossyear)?;
    write_geotiff(&change, &args.output)?;

    if output.is_json() {
        return output.result(ClassifyOutput {
            output: args.output.display().to_string(),
            epsg: change.crs().epsg,
            rows: change.rows(),
            cols: change.cols(),
            summary,
        });
    }

    output.section("Forest change");
    output.kv("Epochs", format!("{:?}", classifier.epochs()));
    output.kv("Grid", format!("{} x {} ({})", change.rows(), change.cols(), change.crs()));
    output.table(ClassRow::rows(&summary));
    output.success(format!("Wrote {}", args.output.display()));
    Ok(())
}
