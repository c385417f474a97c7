//! lectern-viewer: follow (or drive) a live presentation session.
//!
//! ```text
//!  server ──ws──▶ SessionClient ──ConnectionEvent──▶ Follower
//!                      ▲                              │   │
//!                      │ fetch_document               │   └─▶ LocalSession
//!                 RemoteDocuments ◀── DocumentSource ─┤
//!                                                     ▼
//!                                              RenderScheduler ──▶ Renderer
//! ```

pub mod console;
pub mod documents;
pub mod follow;
pub mod remote;
pub mod render;
pub mod scheduler;

pub use documents::{DocumentSource, RemoteDocuments};
pub use follow::{Follower, LocalSession};
pub use remote::{ClientConfig, ConnectionEvent, SessionClient};
pub use render::{LogRenderer, RenderError, Renderer};
pub use scheduler::{DisplayState, RenderScheduler, RenderTarget};
