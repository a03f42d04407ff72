use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// JNR - Forest-carbon emission estimation for a project boundary
#[derive(Parser, Debug)]
#[command(name = "jnr")]
#[command(about = "Forest-carbon emission estimation for a project boundary", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./jnr.toml when present)
    #[arg(long, short = 'c', global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full emission pipeline for a boundary
    Run(RunArgs),

    /// Derive a forest-change raster from tree-cover and loss-year GeoTIFFs
    Classify(ClassifyArgs),

    /// Compute the emission total from density and biomass GeoTIFFs
    Emission(EmissionArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Project boundary (Shapefile or GeoJSON)
    #[arg(long)]
    pub boundary: Option<PathBuf>,

    /// Target CRS EPSG code (must be projected, in metres)
    #[arg(long)]
    pub target_epsg: Option<u32>,

    /// CRS assigned to boundaries that declare none
    #[arg(long)]
    pub default_epsg: Option<u32>,

    /// Directory for intermediate artifacts
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Bucket artifacts are published to
    #[arg(long)]
    pub bucket: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ClassifyArgs {
    /// Baseline tree-cover GeoTIFF (percent)
    pub treecover: PathBuf,

    /// Loss-year GeoTIFF (years since the baseline, 0 for no loss)
    pub lossyear: PathBuf,

    /// Output change GeoTIFF
    #[arg(long, short = 'o', default_value = "change.tif")]
    pub output: PathBuf,

    /// Minimum percent tree cover counted as forest
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Three loss-year epochs, comma separated (e.g. 14,18,22)
    #[arg(long, value_delimiter = ',')]
    pub epochs: Option<Vec<u8>>,
}

#[derive(Parser, Debug)]
pub struct EmissionArgs {
    /// Deforestation density GeoTIFF
    pub density: PathBuf,

    /// Above-ground biomass GeoTIFF on the same grid
    pub biomass: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show resolved values and where each came from
    Show,
}
