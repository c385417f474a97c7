//! Event broadcast hub.
//!
//! A single task owns the [`SessionStore`](crate::state::SessionStore) and
//! the participant table. Every join, mutation, and leave is a message on
//! one command channel, so mutations are applied and broadcast in one total
//! order. Each participant gets its own bounded outbound queue; the first
//! thing placed on it is the snapshot.

mod actor;
mod handle;

#[cfg(test)]
mod tests;

pub use actor::Hub;
pub use handle::{HubHandle, Membership};

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("session hub has shut down")]
    Closed,
}
