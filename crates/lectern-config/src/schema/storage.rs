use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where uploaded documents live and what is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_upload_mb: u32,
    /// Lowercase extensions without the dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_upload_mb: 50,
            allowed_extensions: vec!["pdf".into()],
        }
    }
}

impl StorageConfig {
    pub fn max_upload_bytes(&self) -> u64 {
        u64::from(self.max_upload_mb) * 1024 * 1024
    }
}
