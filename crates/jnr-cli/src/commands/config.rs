//! Config command implementation

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config_loader::{config_path, load_config};
use crate::output::OutputWriter;
use crate::output_types::ConfigEntry;
use anyhow::Result;
use std::path::Path;

pub fn execute(args: ConfigArgs, config_file: Option<&Path>, output: &OutputWriter) -> Result<()> {
    match args.action {
        ConfigAction::Show => show(config_file, output),
    }
}

fn show(config_file: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let config = load_config(config_file)?;

    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry {
            key,
            value,
            source: format!("{:?}", source).to_lowercase(),
        })
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    // Surface validation problems without failing the listing
    let validation = config.resolve().err().map(|e| e.to_string());

    if output.is_json() {
        return output.result(serde_json::json!({
            "file": config_path(config_file).map(|p| p.display().to_string()),
            "entries": entries,
            "valid": validation.is_none(),
            "error": validation,
        }));
    }

    output.section("Configuration");
    match config_path(config_file) {
        Some(path) => output.kv("File", path.display()),
        None => output.kv("File", "(none)"),
    }
    output.table(entries);

    match validation {
        Some(error) => output.warning(error),
        None => output.success("Configuration is valid"),
    }
    Ok(())
}
