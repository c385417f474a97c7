//! Wire protocol. Every frame is a JSON text message tagged by `type`.
//!
//! The first frame a client sends is a [`Hello`], which fixes its role for
//! the rest of the connection. After that it sends [`ClientEvent`]s and
//! receives [`ServerEvent`]s, the first of which is always a snapshot.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::role::Role;
use crate::state::{DocumentId, PageIndex, SessionState};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid document payload: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// First message a client sends to identify itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Hello {
    PresenterHello,
    ViewerHello,
}

impl Hello {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Presenter => Hello::PresenterHello,
            Role::Viewer => Hello::ViewerHello,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Hello::PresenterHello => Role::Presenter,
            Hello::ViewerHello => Role::Viewer,
        }
    }
}

/// Messages a participant sends after its hello.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    PageChange { page: PageIndex },
    SelectDocument { document: DocumentId },
    /// `data` is base64.
    UploadDocument { name: String, data: String },
    ListDocuments,
    FetchDocument { document: DocumentId },
    ClearDocuments,
}

impl ClientEvent {
    pub fn upload(name: impl Into<String>, bytes: &[u8]) -> Self {
        ClientEvent::UploadDocument {
            name: name.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// The hub-level mutation this event carries, if any.
    pub fn as_mutation(&self) -> Option<Mutation> {
        match self {
            ClientEvent::PageChange { page } => Some(Mutation::PageChange(*page)),
            ClientEvent::SelectDocument { document } => {
                Some(Mutation::SelectDocument(document.clone()))
            }
            _ => None,
        }
    }
}

/// State changes the hub applies. Presenter-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    PageChange(PageIndex),
    SelectDocument(DocumentId),
}

/// Messages the server sends to participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full state, sent once right after joining.
    Snapshot {
        document: Option<DocumentId>,
        page: PageIndex,
    },
    UpdatePage {
        page: PageIndex,
    },
    DocumentUpdated {
        document: DocumentId,
    },
    DocumentList {
        documents: Vec<DocumentId>,
    },
    /// `data` is base64; absent when the document does not exist.
    DocumentContent {
        document: DocumentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    Uploaded {
        document: DocumentId,
    },
    Cleared {
        removed: usize,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn snapshot(state: &SessionState) -> Self {
        ServerEvent::Snapshot {
            document: state.document.clone(),
            page: state.page,
        }
    }

    pub fn content(document: DocumentId, bytes: Option<&[u8]>) -> Self {
        ServerEvent::DocumentContent {
            document,
            data: bytes.map(|b| STANDARD.encode(b)),
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn decode_payload(data: &str) -> Result<Vec<u8>, ProtocolError> {
    Ok(STANDARD.decode(data)?)
}

/// Room for the JSON envelope around an encoded document.
const ENVELOPE_BYTES: usize = 64 * 1024;

/// Largest WebSocket message needed to carry a document of
/// `max_document_bytes` as an upload or a `document_content` reply.
pub fn message_limit(max_document_bytes: u64) -> usize {
    let encoded = max_document_bytes.div_ceil(3).saturating_mul(4);
    usize::try_from(encoded)
        .unwrap_or(usize::MAX)
        .saturating_add(ENVELOPE_BYTES)
}
