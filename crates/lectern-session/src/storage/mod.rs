//! Document storage collaborator.
//!
//! The session core only ever passes [`DocumentId`]s around; bytes live
//! behind this trait.

mod fs;

pub use fs::FsDocumentStore;

use async_trait::async_trait;
use lectern_common::StorageError;

use crate::state::DocumentId;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a new document and return the reference it was filed under.
    async fn upload(&self, original_name: &str, bytes: Vec<u8>)
        -> Result<DocumentId, StorageError>;

    /// Every stored document, sorted.
    async fn list(&self) -> Result<Vec<DocumentId>, StorageError>;

    /// `StorageError::NotFound` if there is no such document.
    async fn fetch(&self, document: &DocumentId) -> Result<Vec<u8>, StorageError>;

    /// Delete every stored document, returning how many were removed.
    async fn clear(&self) -> Result<usize, StorageError>;
}
