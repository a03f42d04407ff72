use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names of the artifacts a run writes and publishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNames {
    pub density: String,
    pub biomass: String,
    pub change: String,
    pub level1: String,
    pub level2: String,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            density: "application_adjusted_density_v1_clipped.tif".to_string(),
            biomass: "jnr_agb_clipped.tif".to_string(),
            change: "lct_hansen.tif".to_string(),
            level1: "overlap_level1.geojson".to_string(),
            level2: "overlap_level2.geojson".to_string(),
        }
    }
}

/// Files written to the output directory during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalArtifacts {
    files: Vec<PathBuf>,
}

impl LocalArtifacts {
    pub fn push(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    pub fn extend(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        self.files.extend(paths);
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// File name component of a path, used as the object name
pub fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/out/VCS1566.shp")), Some("VCS1566.shp".to_string()));
        assert_eq!(file_name(Path::new("/")), None);
    }
}
