//! Authoritative session state: which document is up and which page it is on.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Opaque reference to a stored document. Existence is never checked here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1-based page number. Zero is unrepresentable, including on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageIndex(NonZeroU32);

impl PageIndex {
    pub const FIRST: PageIndex = PageIndex(NonZeroU32::MIN);

    /// `None` for zero.
    pub fn new(page: u32) -> Option<Self> {
        NonZeroU32::new(page).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Previous page, staying on the first page.
    pub fn prev(self) -> Self {
        Self::new(self.get() - 1).unwrap_or(Self::FIRST)
    }
}

impl Default for PageIndex {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The shared (document, page) pair every participant converges to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub document: Option<DocumentId>,
    pub page: PageIndex,
}

/// Owner of the single `SessionState`.
///
/// Not shared: the hub owns it outright and every write goes through the
/// hub's event loop, so reads right after a write are never stale.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: SessionState,
}

impl SessionStore {
    /// Starts with no document on page 1.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> SessionState {
        self.state.clone()
    }

    /// Partial update. Omitted fields keep their value, except that any
    /// document selection moves back to page 1. An explicit `page` passed
    /// alongside a document is applied after that reset.
    pub fn set(&mut self, document: Option<DocumentId>, page: Option<PageIndex>) -> SessionState {
        if let Some(document) = document {
            self.state.document = Some(document);
            self.state.page = PageIndex::FIRST;
        }
        if let Some(page) = page {
            self.state.page = page;
        }
        self.get()
    }
}
