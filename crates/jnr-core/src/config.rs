use crate::error::{JnrError, Result};
use crate::models::{Crs, Distance, EmissionFactors};
use crate::ports::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Longest validity accepted for presigned URLs (seven days)
pub const MAX_URL_EXPIRY_SECS: u64 = 7 * 24 * 3600;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Locations of the precomputed local inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Directory produced by the catalog export step
    pub precomputed_dir: PathBuf,
    /// Deforestation density raster
    pub density_raster: PathBuf,
    /// First-level administrative boundaries
    pub admin_level1: PathBuf,
    /// Second-level administrative boundaries
    pub admin_level2: PathBuf,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            precomputed_dir: PathBuf::from("./precomputed_results"),
            density_raster: PathBuf::from("./out/application_adjusted_density_v1.tif"),
            admin_level1: PathBuf::from("./precomputed_results/gaul_level1.shp"),
            admin_level2: PathBuf::from("./precomputed_results/gaul_level2.shp"),
        }
    }
}

/// Forest-change classification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeSettings {
    pub dataset_version: String,
    /// Minimum percent tree cover counted as forest
    pub forest_threshold: u8,
    /// Loss-year epoch boundaries, counted from the baseline year
    pub epochs: [u8; 3],
    pub treecover_path: PathBuf,
    pub lossyear_path: PathBuf,
}

impl Default for ChangeSettings {
    fn default() -> Self {
        Self {
            dataset_version: "UMD/hansen/global_forest_change_2022_v1_10".to_string(),
            forest_threshold: 10,
            epochs: [14, 18, 22],
            treecover_path: PathBuf::from("./precomputed_results/hansen_treecover2000.tif"),
            lossyear_path: PathBuf::from("./precomputed_results/hansen_lossyear.tif"),
        }
    }
}

/// A dated above-ground-biomass image in the local catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomassImage {
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Biomass collection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomassSettings {
    pub collection: String,
    pub band: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub images: Vec<BiomassImage>,
}

impl Default for BiomassSettings {
    fn default() -> Self {
        Self {
            collection: "projects/sat-io/open-datasets/ESA/ESA_CCI_AGB".to_string(),
            band: "AGB".to_string(),
            start: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            images: Vec::new(),
        }
    }
}

/// Administrative overlay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Buffer applied before the overlap test; negative shrinks
    pub buffer: Distance,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self { buffer: Distance::meters(-1000.0) }
    }
}

/// Service-account credentials for the data catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub service_account: Option<String>,
    pub key_file: Option<PathBuf>,
}

/// Object store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    /// Key prefix prepended to every published artifact
    pub prefix: String,
    /// Directory the local publisher writes objects into
    pub root: PathBuf,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self { prefix: String::new(), root: PathBuf::from("./published") }
    }
}

/// Sections that are only configurable through the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSettings {
    pub inputs: InputSettings,
    pub change: ChangeSettings,
    pub biomass: BiomassSettings,
    pub overlay: OverlaySettings,
    pub emission: EmissionFactors,
    pub credentials: CredentialSettings,
    pub publish: PublishSettings,
}

/// Layered configuration for JNR
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub target_epsg: ConfigValue<u32>,
    pub default_epsg: ConfigValue<u32>,
    pub boundary: ConfigValue<PathBuf>,
    pub output_dir: ConfigValue<PathBuf>,
    pub bucket: ConfigValue<String>,
    pub url_expiry_secs: ConfigValue<u64>,
    pub sections: SectionSettings,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            target_epsg: ConfigValue::new(32719, ConfigSource::Default),
            default_epsg: ConfigValue::new(4326, ConfigSource::Default),
            boundary: ConfigValue::new(
                PathBuf::from("./precomputed_results/VCS1566_UTM.shp"),
                ConfigSource::Default,
            ),
            output_dir: ConfigValue::new(PathBuf::from("./out"), ConfigSource::Default),
            bucket: ConfigValue::new("geoproject1".to_string(), ConfigSource::Default),
            url_expiry_secs: ConfigValue::new(3600, ConfigSource::Default),
            sections: SectionSettings::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| JnrError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| JnrError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(epsg) = file_config.target_epsg {
            self.target_epsg.update(epsg, ConfigSource::File);
        }
        if let Some(epsg) = file_config.default_epsg {
            self.default_epsg.update(epsg, ConfigSource::File);
        }
        if let Some(boundary) = file_config.boundary {
            self.boundary.update(boundary, ConfigSource::File);
        }
        if let Some(output_dir) = file_config.output_dir {
            self.output_dir.update(output_dir, ConfigSource::File);
        }
        if let Some(bucket) = file_config.bucket {
            self.bucket.update(bucket, ConfigSource::File);
        }
        if let Some(expiry) = file_config.url_expiry_secs {
            self.url_expiry_secs.update(expiry, ConfigSource::File);
        }

        self.sections = file_config.sections;
        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // JNR_TARGET_EPSG
        if let Ok(value) = env::var("JNR_TARGET_EPSG") {
            match value.parse::<u32>() {
                Ok(epsg) => self.target_epsg.update(epsg, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid JNR_TARGET_EPSG value '{}': expected integer EPSG code",
                    value
                ),
            }
        }

        // JNR_DEFAULT_EPSG
        if let Ok(value) = env::var("JNR_DEFAULT_EPSG") {
            match value.parse::<u32>() {
                Ok(epsg) => self.default_epsg.update(epsg, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid JNR_DEFAULT_EPSG value '{}': expected integer EPSG code",
                    value
                ),
            }
        }

        if let Ok(value) = env::var("JNR_BOUNDARY") {
            self.boundary.update(PathBuf::from(value), ConfigSource::Environment);
        }

        if let Ok(value) = env::var("JNR_OUTPUT_DIR") {
            self.output_dir.update(PathBuf::from(value), ConfigSource::Environment);
        }

        if let Ok(value) = env::var("JNR_BUCKET") {
            self.bucket.update(value, ConfigSource::Environment);
        }

        // JNR_URL_EXPIRY_SECS
        if let Ok(value) = env::var("JNR_URL_EXPIRY_SECS") {
            match value.parse::<u64>() {
                Ok(secs) => self.url_expiry_secs.update(secs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid JNR_URL_EXPIRY_SECS value '{}': expected seconds",
                    value
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(epsg) = overrides.target_epsg {
            self.target_epsg.update(epsg, ConfigSource::Cli);
        }
        if let Some(epsg) = overrides.default_epsg {
            self.default_epsg.update(epsg, ConfigSource::Cli);
        }
        if let Some(boundary) = overrides.boundary {
            self.boundary.update(boundary, ConfigSource::Cli);
        }
        if let Some(output_dir) = overrides.output_dir {
            self.output_dir.update(output_dir, ConfigSource::Cli);
        }
        if let Some(bucket) = overrides.bucket {
            self.bucket.update(bucket, ConfigSource::Cli);
        }
    }

    /// Get the layered values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "target_epsg".to_string(),
            (format!("EPSG:{}", self.target_epsg.value), self.target_epsg.source),
        );
        map.insert(
            "default_epsg".to_string(),
            (format!("EPSG:{}", self.default_epsg.value), self.default_epsg.source),
        );
        map.insert(
            "boundary".to_string(),
            (self.boundary.value.display().to_string(), self.boundary.source),
        );
        map.insert(
            "output_dir".to_string(),
            (self.output_dir.value.display().to_string(), self.output_dir.source),
        );
        map.insert("bucket".to_string(), (self.bucket.value.clone(), self.bucket.source));
        map.insert(
            "url_expiry_secs".to_string(),
            (self.url_expiry_secs.value.to_string(), self.url_expiry_secs.source),
        );

        map
    }

    /// Validate every value and produce the configuration the pipeline runs with
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let config = PipelineConfig {
            target_crs: Crs::from_epsg(self.target_epsg.value),
            default_crs: Crs::from_epsg(self.default_epsg.value),
            boundary: self.boundary.value.clone(),
            output_dir: self.output_dir.value.clone(),
            bucket: self.bucket.value.clone(),
            url_expiry_secs: self.url_expiry_secs.value,
            inputs: self.sections.inputs.clone(),
            change: self.sections.change.clone(),
            biomass: self.sections.biomass.clone(),
            overlay: self.sections.overlay.clone(),
            emission: self.sections.emission,
            credentials: self.sections.credentials.clone(),
            publish: self.sections.publish.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    target_epsg: Option<u32>,
    default_epsg: Option<u32>,
    boundary: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    bucket: Option<String>,
    url_expiry_secs: Option<u64>,
    #[serde(flatten)]
    sections: SectionSettings,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub target_epsg: Option<u32>,
    pub default_epsg: Option<u32>,
    pub boundary: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub bucket: Option<String>,
}

/// Validated configuration consumed by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub target_crs: Crs,
    pub default_crs: Crs,
    pub boundary: PathBuf,
    pub output_dir: PathBuf,
    pub bucket: String,
    pub url_expiry_secs: u64,
    pub inputs: InputSettings,
    pub change: ChangeSettings,
    pub biomass: BiomassSettings,
    pub overlay: OverlaySettings,
    pub emission: EmissionFactors,
    pub credentials: CredentialSettings,
    pub publish: PublishSettings,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.target_crs.is_projected_metric() {
            return Err(invalid(
                "target_epsg",
                format!("{} is not a projected CRS with metre units", self.target_crs),
            ));
        }

        validate_epochs(self.change.epochs)?;

        if self.change.forest_threshold > 100 {
            return Err(invalid(
                "change.forest_threshold",
                format!("{} is not a percentage", self.change.forest_threshold),
            ));
        }

        self.biomass_range()?;

        let factors = [
            ("emission.root_to_shoot", self.emission.root_to_shoot),
            ("emission.carbon_fraction", self.emission.carbon_fraction),
            ("emission.co2_per_carbon", self.emission.co2_per_carbon),
        ];
        for (key, value) in factors {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(key, format!("{} must be a positive number", value)));
            }
        }

        if !self.overlay.buffer.value.is_finite() {
            return Err(invalid("overlay.buffer", "buffer distance must be finite".to_string()));
        }

        if self.bucket.trim().is_empty() {
            return Err(JnrError::ConfigMissing { key: "bucket".to_string() });
        }

        if self.url_expiry_secs == 0 || self.url_expiry_secs > MAX_URL_EXPIRY_SECS {
            return Err(invalid(
                "url_expiry_secs",
                format!("must be between 1 and {} seconds", MAX_URL_EXPIRY_SECS),
            ));
        }

        Ok(())
    }

    pub fn biomass_range(&self) -> Result<DateRange> {
        DateRange::new(self.biomass.start, self.biomass.end)
    }

    /// Object key for an artifact file name
    pub fn object_key(&self, file_name: &str) -> String {
        let prefix = self.publish.prefix.trim_matches('/');
        if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", prefix, file_name)
        }
    }
}

/// Loss-year epochs must be positive and strictly increasing
pub fn validate_epochs(epochs: [u8; 3]) -> Result<()> {
    let [e1, e2, e3] = epochs;
    if e1 == 0 || e1 >= e2 || e2 >= e3 {
        return Err(invalid(
            "change.epochs",
            format!("epochs must be positive and strictly increasing, got {:?}", epochs),
        ));
    }
    Ok(())
}

fn invalid(key: &str, reason: String) -> JnrError {
    JnrError::ConfigInvalid { key: key.to_string(), reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.target_epsg.value, 32719);
        assert_eq!(config.default_epsg.value, 4326);
        assert_eq!(config.target_epsg.source, ConfigSource::Default);
        assert_eq!(config.bucket.value, "geoproject1");
        assert_eq!(config.sections.change.epochs, [14, 18, 22]);
    }

    #[test]
    fn test_defaults_resolve() {
        let config = LayeredConfig::with_defaults().resolve().unwrap();
        assert_eq!(config.target_crs, Crs::utm_19s());
        assert_eq!(config.overlay.buffer.to_meters(), -1000.0);
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
target_epsg = 32720
bucket = "forest-artifacts"

[change]
epochs = [10, 15, 20]

[biomass]
start = "2018-01-01"
end = "2019-01-01"

[[biomass.images]]
date = "2018-06-01"
path = "agb_2018.tif"

[publish]
prefix = "vcs1566"
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.target_epsg.value, 32720);
        assert_eq!(config.target_epsg.source, ConfigSource::File);
        assert_eq!(config.bucket.value, "forest-artifacts");
        assert_eq!(config.default_epsg.source, ConfigSource::Default);
        assert_eq!(config.sections.change.epochs, [10, 15, 20]);
        assert_eq!(config.sections.change.forest_threshold, 10);
        assert_eq!(config.sections.biomass.images.len(), 1);

        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.object_key("a.tif"), "vcs1566/a.tif");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        config.update_from_cli(CliConfigOverrides {
            target_epsg: Some(32718),
            boundary: Some(PathBuf::from("/data/project.shp")),
            ..Default::default()
        });

        assert_eq!(config.target_epsg.value, 32718);
        assert_eq!(config.target_epsg.source, ConfigSource::Cli);
        assert_eq!(config.boundary.value, PathBuf::from("/data/project.shp"));
        assert_eq!(config.bucket.source, ConfigSource::Default);
    }

    #[test]
    fn test_geographic_target_rejected() {
        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            target_epsg: Some(4326),
            ..Default::default()
        });

        let err = config.resolve().unwrap_err();
        assert!(matches!(err, JnrError::ConfigInvalid { ref key, .. } if key == "target_epsg"));
    }

    #[test]
    fn test_epochs_must_increase() {
        let mut config = LayeredConfig::with_defaults();
        config.sections.change.epochs = [18, 14, 22];
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_url_expiry_bounds() {
        let mut config = LayeredConfig::with_defaults();
        config.url_expiry_secs.update(0, ConfigSource::Cli);
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_empty_prefix_key() {
        let config = LayeredConfig::with_defaults().resolve().unwrap();
        assert_eq!(config.object_key("jnr_agb_1566_clipped.tif"), "jnr_agb_1566_clipped.tif");
    }

    #[test]
    fn test_inspection_map() {
        let map = LayeredConfig::with_defaults().to_inspection_map();

        let (value, source) = &map["target_epsg"];
        assert_eq!(value, "EPSG:32719");
        assert_eq!(*source, ConfigSource::Default);
        assert!(map.contains_key("bucket"));
    }
}
