//! The hub task: owns session state and the participant table.

use std::collections::HashMap;

use lectern_common::ParticipantId;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::handle::{HubCommand, HubHandle, Membership};
use crate::protocol::{Mutation, ServerEvent};
use crate::role::{can_mutate, Participant, Role};
use crate::state::SessionStore;

/// Queue length for commands into the hub.
const COMMAND_CAPACITY: usize = 1024;

struct Member {
    participant: Participant,
    outbound: mpsc::Sender<ServerEvent>,
}

/// Serialized event processor for one presentation session.
pub struct Hub {
    store: SessionStore,
    members: HashMap<ParticipantId, Member>,
    outbound_buffer: usize,
}

impl Hub {
    /// `outbound_buffer` is the per-participant queue length; a participant
    /// whose queue is full when an update is fanned out gets dropped.
    pub fn new(outbound_buffer: usize) -> Self {
        Self {
            store: SessionStore::new(),
            members: HashMap::new(),
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    /// Start the hub on its own task and return a handle to it.
    pub fn spawn(self) -> HubHandle {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        tokio::spawn(self.run(rx));
        HubHandle::new(tx)
    }

    /// Process commands until every handle has been dropped.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<HubCommand>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        debug!("Hub command channel closed, stopping");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Join { role, reply } => self.join(role, reply),
            HubCommand::Mutate { from, mutation } => self.mutate(&from, mutation),
            HubCommand::Leave { id } => self.leave(&id),
            HubCommand::State { reply } => {
                let _ = reply.send(self.store.get());
            }
            HubCommand::Count { reply } => {
                let _ = reply.send(self.members.len());
            }
        }
    }

    fn join(&mut self, role: Role, reply: oneshot::Sender<Membership>) {
        let participant = Participant::new(role);
        let (outbound, events) = mpsc::channel(self.outbound_buffer);

        // The queue is fresh, so the snapshot always fits and is always first.
        let snapshot = ServerEvent::snapshot(&self.store.get());
        if outbound.try_send(snapshot).is_err() {
            warn!(participant = %participant.id, "Could not queue snapshot");
            return;
        }

        let membership = Membership {
            participant: participant.clone(),
            events,
        };
        if reply.send(membership).is_err() {
            debug!(participant = %participant.id, "Joiner went away before registration");
            return;
        }

        info!(
            participant = %participant.id,
            role = ?participant.role,
            participants = self.members.len() + 1,
            "Participant joined"
        );
        self.members.insert(
            participant.id.clone(),
            Member {
                participant,
                outbound,
            },
        );
    }

    fn mutate(&mut self, from: &ParticipantId, mutation: Mutation) {
        let Some(member) = self.members.get(from) else {
            debug!(participant = %from, "Mutation from unknown participant dropped");
            return;
        };

        if !can_mutate(&member.participant) {
            warn!(
                participant = %from,
                role = ?member.participant.role,
                mutation = ?mutation,
                "Mutation rejected: participant is not the presenter"
            );
            return;
        }

        match mutation {
            Mutation::PageChange(page) => {
                self.store.set(None, Some(page));
                debug!(participant = %from, page = page.get(), "Page changed");
                self.fan_out(&ServerEvent::UpdatePage { page }, Some(from));
            }
            Mutation::SelectDocument(document) => {
                self.store.set(Some(document.clone()), None);
                info!(participant = %from, document = %document, "Document selected");
                self.fan_out(&ServerEvent::DocumentUpdated { document }, None);
            }
        }
    }

    fn leave(&mut self, id: &ParticipantId) {
        if let Some(member) = self.members.remove(id) {
            info!(
                participant = %id,
                role = ?member.participant.role,
                participants = self.members.len(),
                "Participant left"
            );
        }
    }

    /// Queue `event` for every member except `except`. Members whose queue is
    /// full or closed are removed; dropping their sender ends their connection.
    fn fan_out(&mut self, event: &ServerEvent, except: Option<&ParticipantId>) {
        let mut evicted = Vec::new();

        for (id, member) in &self.members {
            if Some(id) == except {
                continue;
            }
            match member.outbound.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(participant = %id, "Outbound queue full, disconnecting participant");
                    evicted.push(id.clone());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(participant = %id, "Outbound queue closed");
                    evicted.push(id.clone());
                }
            }
        }

        for id in evicted {
            self.leave(&id);
        }
    }
}
