//! Participant roles and the mutation gate.

use lectern_common::ParticipantId;
use serde::{Deserialize, Serialize};

/// Role of a connected participant, fixed when the connection is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Presenter,
    Viewer,
}

/// One live connection as seen by the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub role: Role,
}

impl Participant {
    pub fn new(role: Role) -> Self {
        Self {
            id: ParticipantId::new(),
            role,
        }
    }
}

/// Only presenters may change session state. Checked server-side on every
/// mutation; the client's own view of its role is never trusted.
pub fn can_mutate(participant: &Participant) -> bool {
    participant.role == Role::Presenter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presenter_can_mutate() {
        assert!(can_mutate(&Participant::new(Role::Presenter)));
    }

    #[test]
    fn viewer_cannot_mutate() {
        assert!(!can_mutate(&Participant::new(Role::Viewer)));
    }

    #[test]
    fn each_participant_gets_its_own_id() {
        let a = Participant::new(Role::Viewer);
        let b = Participant::new(Role::Viewer);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Role::Presenter).unwrap(),
            "\"presenter\""
        );
        assert_eq!(
            serde_json::from_str::<Role>("\"viewer\"").unwrap(),
            Role::Viewer
        );
    }
}
