//! Directory-backed document store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lectern_common::StorageError;
use rand::Rng;
use tracing::{debug, info, warn};

use super::DocumentStore;
use crate::state::DocumentId;

/// Stored file names look like `pdfFile-<millis>-<random>.<ext>`.
const STORED_NAME_PREFIX: &str = "pdfFile";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Keeps each document as one file in a flat directory.
pub struct FsDocumentStore {
    root: PathBuf,
    max_bytes: u64,
    allowed_extensions: Vec<String>,
}

impl FsDocumentStore {
    /// Creates `root` if needed. Extensions are matched case-insensitively.
    pub fn new(
        root: impl Into<PathBuf>,
        max_bytes: u64,
        allowed_extensions: &[String],
    ) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            max_bytes,
            allowed_extensions: allowed_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn allowed_extension(&self, name: &str) -> Option<String> {
        let ext = Path::new(name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        self.allowed_extensions.contains(&ext).then_some(ext)
    }

    /// Resolve a reference to a path inside `root`, refusing anything that
    /// could point elsewhere.
    fn path_for(&self, document: &DocumentId) -> Option<PathBuf> {
        let name = document.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return None;
        }
        Some(self.root.join(name))
    }
}

fn stored_name(ext: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{STORED_NAME_PREFIX}-{millis}-{suffix}.{ext}")
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn upload(
        &self,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentId, StorageError> {
        let ext = self.allowed_extension(original_name).ok_or_else(|| {
            StorageError::Rejected(format!(
                "only {} files are allowed",
                self.allowed_extensions.join(", ")
            ))
        })?;

        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(StorageError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        if ext == "pdf" && !bytes.starts_with(PDF_MAGIC) {
            return Err(StorageError::Rejected(
                "file content is not a PDF document".into(),
            ));
        }

        let name = stored_name(&ext);
        tokio::fs::write(self.root.join(&name), &bytes).await?;
        info!(original = original_name, stored = %name, bytes = size, "Document uploaded");
        Ok(DocumentId::new(name))
    }

    async fn list(&self) -> Result<Vec<DocumentId>, StorageError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut documents = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if self.allowed_extension(&name).is_some() {
                documents.push(DocumentId::new(name));
            }
        }

        documents.sort();
        Ok(documents)
    }

    async fn fetch(&self, document: &DocumentId) -> Result<Vec<u8>, StorageError> {
        let Some(path) = self.path_for(document) else {
            warn!(document = %document, "Refusing to fetch suspicious document reference");
            return Err(StorageError::NotFound(document.to_string()));
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(document = %document, bytes = bytes.len(), "Document fetched");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(document.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<usize, StorageError> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            tokio::fs::remove_file(entry.path()).await.map_err(|e| {
                warn!(file = %entry.path().display(), error = %e, "Failed to delete document");
                e
            })?;
            removed += 1;
        }

        info!(removed, "Cleared stored documents");
        Ok(removed)
    }
}
