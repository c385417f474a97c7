//! Session synchronization core for lectern.
//!
//! One presenter drives page navigation and document selection; every
//! connected viewer mirrors it.
//!
//! ```text
//! presenter ──mutation──► HubHandle ──► Hub (single task)
//!                                        │  role check
//!                                        │  SessionStore::set
//!                                        ▼
//!                              fan-out to each participant's
//!                              bounded outbound queue
//! ```
//!
//! - [`state`]: the authoritative (document, page) pair
//! - [`role`]: presenter/viewer classification and the mutation gate
//! - [`protocol`]: JSON wire events
//! - [`hub`]: the serialized event-processing actor
//! - [`storage`]: document storage collaborator

pub mod hub;
pub mod protocol;
pub mod role;
pub mod state;
pub mod storage;

pub use hub::{Hub, HubError, HubHandle, Membership};
pub use protocol::{message_limit, ClientEvent, Hello, Mutation, ProtocolError, ServerEvent};
pub use role::{can_mutate, Participant, Role};
pub use state::{DocumentId, PageIndex, SessionState, SessionStore};
pub use storage::{DocumentStore, FsDocumentStore};
