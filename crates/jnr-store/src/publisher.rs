//! Object store backed by a local directory
//!
//! Objects live at `<root>/<bucket>/<key>`. URLs are `file://` locations
//! carrying their expiry time as a query parameter.

use chrono::Utc;
use jnr_core::config::PipelineConfig;
use jnr_core::error::{JnrError, Result};
use jnr_core::ports::ArtifactPublisher;
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalDirectoryPublisher {
    root: PathBuf,
    bucket: String,
}

impl LocalDirectoryPublisher {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self { root: root.into(), bucket: bucket.into() }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.publish.root.clone(), config.bucket.clone())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Location of `key` on disk
    pub fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(JnrError::Upload {
                key: key.to_string(),
                message: "object keys must be relative paths without '..'".to_string(),
            });
        }
        Ok(self.root.join(&self.bucket).join(relative))
    }
}

impl ArtifactPublisher for LocalDirectoryPublisher {
    fn store(&self, local_path: &Path, key: &str) -> Result<()> {
        let upload_err = |message: String| JnrError::Upload { key: key.to_string(), message };

        if !local_path.is_file() {
            return Err(upload_err(format!("{} is not a file", local_path.display())));
        }

        let destination = self.object_path(key)?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| upload_err(e.to_string()))?;
        }
        fs::copy(local_path, &destination).map_err(|e| upload_err(e.to_string()))?;

        tracing::info!("Stored {} as {}/{}", local_path.display(), self.bucket, key);
        Ok(())
    }

    fn presigned_url(&self, key: &str, expiry_secs: u64) -> Result<String> {
        let path = self.object_path(key)?;
        if !path.is_file() {
            return Err(JnrError::Upload {
                key: key.to_string(),
                message: "no object stored under this key".to_string(),
            });
        }

        let absolute = fs::canonicalize(&path)?;
        let seconds = i64::try_from(expiry_secs).unwrap_or(i64::MAX);
        let expires = Utc::now().timestamp().saturating_add(seconds);

        Ok(format!("file://{}?expires={}", absolute.display(), expires))
    }
}
