//! Client-side session cache and event routing.
//!
//! The server is authoritative. [`LocalSession`] mirrors its state from
//! snapshots and broadcasts; for the presenter it also applies local
//! navigation immediately, since the presenter never hears its own page
//! changes echoed back.

use lectern_session::protocol::decode_payload;
use lectern_session::{ClientEvent, DocumentId, PageIndex, Role, ServerEvent, SessionState};

use crate::documents::RemoteDocuments;
use crate::remote::ConnectionEvent;
use crate::scheduler::{RenderScheduler, RenderTarget};

/// Last known session state, as seen by one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSession {
    role: Role,
    state: SessionState,
}

impl LocalSession {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            state: SessionState::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Fold a server event into the cache. Returns what to render, if the
    /// event changed what should be on screen.
    pub fn apply(&mut self, event: &ServerEvent) -> Option<RenderTarget> {
        match event {
            ServerEvent::Snapshot { document, page } => {
                self.state = SessionState {
                    document: document.clone(),
                    page: *page,
                };
                Some(RenderTarget::reload(document.clone(), *page))
            }
            ServerEvent::UpdatePage { page } => {
                self.state.page = *page;
                Some(RenderTarget::page(self.state.document.clone(), *page))
            }
            ServerEvent::DocumentUpdated { document } => {
                self.state = SessionState {
                    document: Some(document.clone()),
                    page: PageIndex::FIRST,
                };
                Some(RenderTarget::reload(
                    Some(document.clone()),
                    PageIndex::FIRST,
                ))
            }
            _ => None,
        }
    }

    /// Presenter navigation. Moves locally and returns the event to send,
    /// or `None` if not allowed or already there.
    ///
    /// `page_count` bounds the move when known.
    pub fn goto(
        &mut self,
        page: PageIndex,
        page_count: Option<u32>,
    ) -> Option<(ClientEvent, RenderTarget)> {
        if self.role != Role::Presenter || self.state.document.is_none() {
            return None;
        }
        let page = match page_count.and_then(PageIndex::new) {
            Some(last) => page.min(last),
            None => page,
        };
        if page == self.state.page {
            return None;
        }
        self.state.page = page;
        Some((
            ClientEvent::PageChange { page },
            RenderTarget::page(self.state.document.clone(), page),
        ))
    }

    pub fn next_page(&mut self, page_count: Option<u32>) -> Option<(ClientEvent, RenderTarget)> {
        // Without a page count there is no known last page to stop at.
        if page_count.is_none() {
            return None;
        }
        self.goto(self.state.page.next(), page_count)
    }

    pub fn prev_page(&mut self) -> Option<(ClientEvent, RenderTarget)> {
        self.goto(self.state.page.prev(), None)
    }

    /// Presenter document selection. Local state changes only when the
    /// server's `document_updated` arrives.
    pub fn select(&self, document: DocumentId) -> Option<ClientEvent> {
        (self.role == Role::Presenter).then_some(ClientEvent::SelectDocument { document })
    }
}

/// Routes connection events to the session cache, the document fetcher,
/// and the render scheduler.
pub struct Follower {
    session: LocalSession,
    scheduler: RenderScheduler,
    documents: RemoteDocuments,
}

impl Follower {
    pub fn new(role: Role, scheduler: RenderScheduler, documents: RemoteDocuments) -> Self {
        Self {
            session: LocalSession::new(role),
            scheduler,
            documents,
        }
    }

    pub fn session(&self) -> &LocalSession {
        &self.session
    }

    /// Handle one connection event. Replies that only the caller cares
    /// about (lists, upload confirmations, errors) are handed back.
    pub fn handle(&mut self, event: ConnectionEvent) -> Option<ServerEvent> {
        match event {
            ConnectionEvent::Connected => {
                tracing::info!(role = ?self.session.role(), "Joined session");
                None
            }
            ConnectionEvent::Disconnected => {
                tracing::warn!("Lost connection to session; the next snapshot will resync");
                self.documents.fail_all();
                None
            }
            ConnectionEvent::Error(message) => {
                tracing::debug!(message = %message, "Connection error");
                None
            }
            ConnectionEvent::Server(ServerEvent::DocumentContent { document, data }) => {
                let bytes = data.and_then(|data| match decode_payload(&data) {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        tracing::warn!(document = %document, error = %e, "Undecodable document content");
                        None
                    }
                });
                if !self.documents.resolve(&document, bytes) {
                    tracing::debug!(document = %document, "Unsolicited document content");
                }
                None
            }
            ConnectionEvent::Server(event) => match self.session.apply(&event) {
                Some(target) => {
                    self.scheduler.request(target);
                    None
                }
                None => Some(event),
            },
        }
    }

    /// Presenter: advance one page. Returns the event to send to the server.
    pub fn next_page(&mut self) -> Option<ClientEvent> {
        let page_count = self.scheduler.page_count();
        let (event, target) = self.session.next_page(page_count)?;
        self.scheduler.request(target);
        Some(event)
    }

    pub fn prev_page(&mut self) -> Option<ClientEvent> {
        let (event, target) = self.session.prev_page()?;
        self.scheduler.request(target);
        Some(event)
    }

    pub fn goto(&mut self, page: PageIndex) -> Option<ClientEvent> {
        let page_count = self.scheduler.page_count();
        let (event, target) = self.session.goto(page, page_count)?;
        self.scheduler.request(target);
        Some(event)
    }

    pub fn select(&self, document: DocumentId) -> Option<ClientEvent> {
        self.session.select(document)
    }
}
