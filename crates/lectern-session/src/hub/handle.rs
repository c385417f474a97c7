//! Cloneable handle used by connection tasks to talk to the hub.

use lectern_common::ParticipantId;
use tokio::sync::{mpsc, oneshot};

use super::HubError;
use crate::protocol::{Mutation, ServerEvent};
use crate::role::{Participant, Role};
use crate::state::SessionState;

#[derive(Debug)]
pub(crate) enum HubCommand {
    Join {
        role: Role,
        reply: oneshot::Sender<Membership>,
    },
    Mutate {
        from: ParticipantId,
        mutation: Mutation,
    },
    Leave {
        id: ParticipantId,
    },
    State {
        reply: oneshot::Sender<SessionState>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// A joined participant and the queue of events addressed to it.
///
/// The first event on `events` is always the snapshot. The queue closes
/// when the hub drops the participant.
#[derive(Debug)]
pub struct Membership {
    pub participant: Participant,
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Handle to a running [`Hub`](super::Hub).
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub(crate) fn new(commands: mpsc::Sender<HubCommand>) -> Self {
        Self { commands }
    }

    /// Register a participant. Its snapshot is already queued when this returns.
    pub async fn join(&self, role: Role) -> Result<Membership, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Join { role, reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Submit a mutation on behalf of `from`. Authorization happens in the hub.
    pub async fn submit(&self, from: &ParticipantId, mutation: Mutation) -> Result<(), HubError> {
        self.send(HubCommand::Mutate {
            from: from.clone(),
            mutation,
        })
        .await
    }

    pub async fn leave(&self, id: &ParticipantId) -> Result<(), HubError> {
        self.send(HubCommand::Leave { id: id.clone() }).await
    }

    /// Current session state, ordered after every previously submitted command.
    pub async fn state(&self) -> Result<SessionState, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::State { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Number of registered participants.
    pub async fn participant_count(&self) -> Result<usize, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Count { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands.send(command).await.map_err(|_| HubError::Closed)
    }
}
