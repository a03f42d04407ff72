use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Directory uploads are filed under, relative to the upload root
pub const UPLOAD_DIR: &str = "jnr_works";

/// A file uploaded through the surrounding application.
///
/// The pipeline only ever reads [`StoredUpload::file`]; creating and storing
/// uploads is the application's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUpload {
    pub id: Uuid,
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    pub file: PathBuf,
}

impl StoredUpload {
    /// Record an upload of `filename` beneath `root`
    pub fn new(name: impl Into<String>, root: &Path, filename: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            uploaded_at: Utc::now(),
            file: upload_path(root, filename),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }
}

/// Location an uploaded file is stored at
pub fn upload_path(root: &Path, filename: &str) -> PathBuf {
    root.join(UPLOAD_DIR).join(filename)
}
