//! In-memory publisher for development and testing.

use jnr_core::error::{JnrError, Result};
use jnr_core::ports::ArtifactPublisher;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Publisher keeping object bytes in a shared map
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryPublisher {
    /// Create an empty publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let objects = self.objects.read().map_err(|_| poisoned(key))?;
        Ok(objects.get(key).cloned())
    }

    /// Stored keys in lexical order
    pub fn keys(&self) -> Result<Vec<String>> {
        let objects = self.objects.read().map_err(|_| poisoned("*"))?;
        let mut keys: Vec<String> = objects.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl ArtifactPublisher for MemoryPublisher {
    fn store(&self, local_path: &Path, key: &str) -> Result<()> {
        let bytes = fs::read(local_path).map_err(|e| JnrError::Upload {
            key: key.to_string(),
            message: format!("failed to read {}: {}", local_path.display(), e),
        })?;

        let mut objects = self.objects.write().map_err(|_| poisoned(key))?;
        objects.insert(key.to_string(), bytes);
        Ok(())
    }

    fn presigned_url(&self, key: &str, expiry_secs: u64) -> Result<String> {
        let objects = self.objects.read().map_err(|_| poisoned(key))?;
        if !objects.contains_key(key) {
            return Err(JnrError::Upload {
                key: key.to_string(),
                message: "no object stored under this key".to_string(),
            });
        }
        Ok(format!("memory://{}?expires_in={}", key, expiry_secs))
    }
}

fn poisoned(key: &str) -> JnrError {
    JnrError::Upload { key: key.to_string(), message: "object map lock poisoned".to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn file_with(contents: &[u8]) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn test_store_same_key_twice_overwrites() {
        let publisher = MemoryPublisher::new();

        publisher.store(file_with(b"first").path(), "change.tif").unwrap();
        publisher.store(file_with(b"second").path(), "change.tif").unwrap();

        assert_eq!(publisher.get("change.tif").unwrap(), Some(b"second".to_vec()));
        assert_eq!(publisher.keys().unwrap(), vec!["change.tif".to_string()]);
    }

    #[test]
    fn test_clones_share_objects() {
        let publisher = MemoryPublisher::new();
        let clone = publisher.clone();

        clone.store(file_with(b"x").path(), "a.geojson").unwrap();

        assert!(publisher.get("a.geojson").unwrap().is_some());
        assert_eq!(
            publisher.presigned_url("a.geojson", 3600).unwrap(),
            "memory://a.geojson?expires_in=3600"
        );
    }

    #[test]
    fn test_url_for_missing_key() {
        let err = MemoryPublisher::new().presigned_url("missing", 60).unwrap_err();
        assert!(matches!(err, JnrError::Upload { .. }));
    }
}
