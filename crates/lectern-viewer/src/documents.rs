//! Where the viewer gets document bytes from.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lectern_common::StorageError;
use lectern_session::{ClientEvent, DocumentId};
use tokio::sync::oneshot;

use crate::remote::SessionClient;

/// Read-only access to documents by id.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch a document's bytes. `StorageError::NotFound` when it no longer exists.
    async fn fetch(&self, document: &DocumentId) -> Result<Vec<u8>, StorageError>;
}

type Waiters = HashMap<DocumentId, Vec<oneshot::Sender<Option<Vec<u8>>>>>;

/// Fetches documents over the session connection.
///
/// A fetch sends `fetch_document` and parks until the matching
/// `document_content` reply is passed to [`RemoteDocuments::resolve`].
/// Concurrent fetches of the same id share one request.
#[derive(Clone)]
pub struct RemoteDocuments {
    client: SessionClient,
    waiters: Arc<Mutex<Waiters>>,
    timeout: Duration,
}

impl RemoteDocuments {
    pub fn new(client: SessionClient, timeout: Duration) -> Self {
        Self {
            client,
            waiters: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    /// Deliver a `document_content` reply. Returns false if nobody was waiting.
    pub fn resolve(&self, document: &DocumentId, bytes: Option<Vec<u8>>) -> bool {
        let waiting = self.lock().remove(document).unwrap_or_default();
        if waiting.is_empty() {
            return false;
        }
        for waiter in waiting {
            let _ = waiter.send(bytes.clone());
        }
        true
    }

    /// Fail every outstanding fetch; replies will never arrive on a dead connection.
    pub fn fail_all(&self) {
        let dropped = std::mem::take(&mut *self.lock());
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "Abandoning pending document fetches");
        }
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Waiters> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentSource for RemoteDocuments {
    async fn fetch(&self, document: &DocumentId) -> Result<Vec<u8>, StorageError> {
        let (tx, rx) = oneshot::channel();
        let first = {
            let mut waiters = self.lock();
            let queue = waiters.entry(document.clone()).or_default();
            queue.push(tx);
            queue.len() == 1
        };

        if first {
            let request = ClientEvent::FetchDocument {
                document: document.clone(),
            };
            if let Err(e) = self.client.send(request).await {
                self.lock().remove(document);
                return Err(StorageError::NotFound(format!("{document}: {e}")));
            }
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Some(bytes))) => Ok(bytes),
            Ok(Ok(None)) => Err(StorageError::NotFound(document.to_string())),
            Ok(Err(_)) => Err(StorageError::NotFound(format!(
                "{document}: connection lost"
            ))),
            Err(_) => {
                self.lock().remove(document);
                tracing::warn!(document = %document, timeout_secs = self.timeout.as_secs(), "Document fetch timed out");
                Err(StorageError::NotFound(format!("{document}: timed out")))
            }
        }
    }
}
