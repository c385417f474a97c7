//! Rendering surface abstraction.

use std::sync::{LazyLock, Mutex};

use async_trait::async_trait;
use lectern_session::{DocumentId, PageIndex};
use regex::bytes::Regex;

/// Page objects, not the `/Pages` tree node.
static PAGE_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Type\s*/Page([^s]|$)").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("document could not be opened: {0}")]
    Open(String),

    #[error("page {page} is past the end of a {page_count}-page document")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("render failed: {0}")]
    Failed(String),
}

/// Something that can show one page of a document.
///
/// Calls never overlap; the scheduler guarantees at most one is in flight.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Load a document and return its page count.
    async fn open(&self, document: &DocumentId, bytes: Vec<u8>) -> Result<u32, RenderError>;

    /// Present `page` of the most recently opened document.
    async fn render(&self, document: &DocumentId, page: PageIndex) -> Result<(), RenderError>;

    /// Show the "no presentation available" state.
    async fn blank(&self);
}

/// Renderer for headless viewers: validates the document, counts its
/// pages, and logs what would be on screen.
#[derive(Default)]
pub struct LogRenderer {
    current: Mutex<Option<(DocumentId, u32)>>,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn count_pages(bytes: &[u8]) -> u32 {
        let count = PAGE_OBJECT_RE.find_iter(bytes).count();
        u32::try_from(count).unwrap_or(u32::MAX).max(1)
    }
}

#[async_trait]
impl Renderer for LogRenderer {
    async fn open(&self, document: &DocumentId, bytes: Vec<u8>) -> Result<u32, RenderError> {
        if !bytes.starts_with(b"%PDF-") {
            return Err(RenderError::Open(format!("{document} is not a PDF")));
        }
        let pages = Self::count_pages(&bytes);
        tracing::info!(document = %document, pages, "Opened document");
        if let Ok(mut current) = self.current.lock() {
            *current = Some((document.clone(), pages));
        }
        Ok(pages)
    }

    async fn render(&self, document: &DocumentId, page: PageIndex) -> Result<(), RenderError> {
        let pages = match self.current.lock() {
            Ok(current) => match current.as_ref() {
                Some((open, pages)) if open == document => *pages,
                _ => return Err(RenderError::Failed(format!("{document} is not open"))),
            },
            Err(_) => return Err(RenderError::Failed("renderer state poisoned".into())),
        };
        if page.get() > pages {
            return Err(RenderError::PageOutOfRange {
                page: page.get(),
                page_count: pages,
            });
        }
        tracing::info!(document = %document, page = page.get(), pages, "Showing page {page} of {pages}");
        Ok(())
    }

    async fn blank(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
        tracing::info!("No presentation available");
    }
}
