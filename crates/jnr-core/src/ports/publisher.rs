use std::path::Path;

use crate::error::Result;

/// Port for the object store finished artifacts are published to.
///
/// `store` overwrites any object already stored under the same key.
pub trait ArtifactPublisher {
    /// Persist the file at `local_path` under `key`
    fn store(&self, local_path: &Path, key: &str) -> Result<()>;

    /// Retrievable location for `key`, valid for `expiry_secs` seconds
    fn presigned_url(&self, key: &str, expiry_secs: u64) -> Result<String>;
}

impl<P: ArtifactPublisher + ?Sized> ArtifactPublisher for &P {
    fn store(&self, local_path: &Path, key: &str) -> Result<()> {
        (**self).store(local_path, key)
    }

    fn presigned_url(&self, key: &str, expiry_secs: u64) -> Result<String> {
        (**self).presigned_url(key, expiry_secs)
    }
}
