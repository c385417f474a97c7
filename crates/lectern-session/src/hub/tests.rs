//! Hub behavior: snapshots, role gating, fan-out audiences, ordering, eviction.

use tokio::sync::mpsc::error::TryRecvError;

use super::*;
use crate::protocol::{Mutation, ServerEvent};
use crate::role::Role;
use crate::state::{DocumentId, PageIndex, SessionState};

fn page(n: u32) -> PageIndex {
    PageIndex::new(n).unwrap()
}

fn spawn_hub() -> HubHandle {
    Hub::new(64).spawn()
}

/// Join and consume the snapshot, returning it alongside the membership.
async fn join(hub: &HubHandle, role: Role) -> (Membership, ServerEvent) {
    let mut membership = hub.join(role).await.unwrap();
    let snapshot = membership.events.recv().await.unwrap();
    (membership, snapshot)
}

/// Every command before this one has been fully processed once it returns.
async fn settle(hub: &HubHandle) -> SessionState {
    hub.state().await.unwrap()
}

#[tokio::test]
async fn first_event_is_snapshot_of_initial_state() {
    let hub = spawn_hub();
    let (_presenter, snapshot) = join(&hub, Role::Presenter).await;
    assert_eq!(
        snapshot,
        ServerEvent::Snapshot {
            document: None,
            page: PageIndex::FIRST,
        }
    );
}

#[tokio::test]
async fn page_change_reaches_everyone_but_the_presenter() {
    let hub = spawn_hub();
    let (mut presenter, _) = join(&hub, Role::Presenter).await;
    let (mut viewer_a, _) = join(&hub, Role::Viewer).await;
    let (mut viewer_b, _) = join(&hub, Role::Viewer).await;

    hub.submit(&presenter.participant.id, Mutation::PageChange(page(3)))
        .await
        .unwrap();
    let state = settle(&hub).await;
    assert_eq!(state.page, page(3));

    let expected = ServerEvent::UpdatePage { page: page(3) };
    assert_eq!(viewer_a.events.try_recv().unwrap(), expected);
    assert_eq!(viewer_b.events.try_recv().unwrap(), expected);
    assert!(matches!(
        presenter.events.try_recv(),
        Err(TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn document_select_reaches_everyone_and_resets_page() {
    let hub = spawn_hub();
    let (mut presenter, _) = join(&hub, Role::Presenter).await;
    let (mut viewer, _) = join(&hub, Role::Viewer).await;

    let id = presenter.participant.id.clone();
    hub.submit(&id, Mutation::SelectDocument("a.pdf".into()))
        .await
        .unwrap();
    hub.submit(&id, Mutation::PageChange(page(8))).await.unwrap();
    hub.submit(&id, Mutation::SelectDocument("b.pdf".into()))
        .await
        .unwrap();
    let state = settle(&hub).await;

    assert_eq!(state.document, Some(DocumentId::from("b.pdf")));
    assert_eq!(state.page, PageIndex::FIRST);

    let updated = ServerEvent::DocumentUpdated {
        document: "b.pdf".into(),
    };
    // Presenter sees both selections but not its own page change.
    assert!(matches!(
        presenter.events.try_recv().unwrap(),
        ServerEvent::DocumentUpdated { .. }
    ));
    assert_eq!(presenter.events.try_recv().unwrap(), updated);
    assert!(presenter.events.try_recv().is_err());

    assert!(matches!(
        viewer.events.try_recv().unwrap(),
        ServerEvent::DocumentUpdated { .. }
    ));
    assert_eq!(
        viewer.events.try_recv().unwrap(),
        ServerEvent::UpdatePage { page: page(8) }
    );
    assert_eq!(viewer.events.try_recv().unwrap(), updated);
}

#[tokio::test]
async fn viewer_mutations_change_nothing_and_broadcast_nothing() {
    let hub = spawn_hub();
    let (mut presenter, _) = join(&hub, Role::Presenter).await;
    let (mut viewer, _) = join(&hub, Role::Viewer).await;
    let (mut other, _) = join(&hub, Role::Viewer).await;
    let before = settle(&hub).await;

    let id = viewer.participant.id.clone();
    hub.submit(&id, Mutation::PageChange(page(3))).await.unwrap();
    hub.submit(&id, Mutation::SelectDocument("evil.pdf".into()))
        .await
        .unwrap();

    assert_eq!(settle(&hub).await, before);
    assert!(presenter.events.try_recv().is_err());
    assert!(viewer.events.try_recv().is_err());
    assert!(other.events.try_recv().is_err());
    // The rejected viewer stays connected.
    assert_eq!(hub.participant_count().await.unwrap(), 3);
}

#[tokio::test]
async fn late_joiner_snapshot_reflects_current_state() {
    let hub = spawn_hub();
    let (presenter, _) = join(&hub, Role::Presenter).await;
    let id = presenter.participant.id.clone();
    hub.submit(&id, Mutation::SelectDocument("D1".into()))
        .await
        .unwrap();
    hub.submit(&id, Mutation::PageChange(page(4))).await.unwrap();

    let (mut late, snapshot) = join(&hub, Role::Viewer).await;
    assert_eq!(
        snapshot,
        ServerEvent::Snapshot {
            document: Some("D1".into()),
            page: page(4),
        }
    );

    hub.submit(&id, Mutation::PageChange(page(5))).await.unwrap();
    settle(&hub).await;
    assert_eq!(
        late.events.try_recv().unwrap(),
        ServerEvent::UpdatePage { page: page(5) }
    );
}

#[tokio::test]
async fn viewers_see_updates_in_presenter_order() {
    let hub = spawn_hub();
    let (presenter, _) = join(&hub, Role::Presenter).await;
    let (mut viewer, _) = join(&hub, Role::Viewer).await;
    let id = presenter.participant.id.clone();

    hub.submit(&id, Mutation::SelectDocument("D1".into()))
        .await
        .unwrap();
    for n in [5, 6, 7] {
        hub.submit(&id, Mutation::PageChange(page(n))).await.unwrap();
    }
    let state = settle(&hub).await;
    assert_eq!(state.document, Some(DocumentId::from("D1")));
    assert_eq!(state.page, page(7));

    let mut received = Vec::new();
    while let Ok(event) = viewer.events.try_recv() {
        received.push(event);
    }
    assert_eq!(
        received,
        vec![
            ServerEvent::DocumentUpdated {
                document: "D1".into()
            },
            ServerEvent::UpdatePage { page: page(5) },
            ServerEvent::UpdatePage { page: page(6) },
            ServerEvent::UpdatePage { page: page(7) },
        ]
    );
}

#[tokio::test]
async fn presenter_disconnect_keeps_state_and_new_presenter_resumes() {
    let hub = spawn_hub();
    let (presenter, _) = join(&hub, Role::Presenter).await;
    let (mut viewer, _) = join(&hub, Role::Viewer).await;

    let id = presenter.participant.id.clone();
    hub.submit(&id, Mutation::SelectDocument("D1".into()))
        .await
        .unwrap();
    hub.submit(&id, Mutation::PageChange(page(2))).await.unwrap();
    hub.leave(&id).await.unwrap();
    drop(presenter);

    // Mutations from a departed participant are ignored.
    hub.submit(&id, Mutation::PageChange(page(9))).await.unwrap();
    let state = settle(&hub).await;
    assert_eq!(state.page, page(2));
    assert_eq!(hub.participant_count().await.unwrap(), 1);

    let (successor, snapshot) = join(&hub, Role::Presenter).await;
    assert_eq!(
        snapshot,
        ServerEvent::Snapshot {
            document: Some("D1".into()),
            page: page(2),
        }
    );
    hub.submit(&successor.participant.id, Mutation::PageChange(page(3)))
        .await
        .unwrap();
    assert_eq!(settle(&hub).await.page, page(3));

    let mut last = None;
    while let Ok(event) = viewer.events.try_recv() {
        last = Some(event);
    }
    assert_eq!(last, Some(ServerEvent::UpdatePage { page: page(3) }));
}

#[tokio::test]
async fn slow_participant_is_evicted_without_stalling_others() {
    let hub = Hub::new(2).spawn();
    let (presenter, _) = join(&hub, Role::Presenter).await;
    let (mut fast, _) = join(&hub, Role::Viewer).await;
    // Never drained after the snapshot.
    let mut slow = hub.join(Role::Viewer).await.unwrap();

    let id = presenter.participant.id.clone();
    for n in 2..=4 {
        hub.submit(&id, Mutation::PageChange(page(n))).await.unwrap();
        settle(&hub).await;
        assert_eq!(
            fast.events.try_recv().unwrap(),
            ServerEvent::UpdatePage { page: page(n) }
        );
    }

    assert_eq!(hub.participant_count().await.unwrap(), 2);

    // The slow queue drains what it had, then reports closure.
    assert!(matches!(
        slow.events.recv().await,
        Some(ServerEvent::Snapshot { .. })
    ));
    assert_eq!(
        slow.events.recv().await,
        Some(ServerEvent::UpdatePage { page: page(2) })
    );
    assert_eq!(slow.events.recv().await, None);
}

#[tokio::test]
async fn dropped_receiver_is_cleaned_up_on_next_broadcast() {
    let hub = spawn_hub();
    let (presenter, _) = join(&hub, Role::Presenter).await;
    let (viewer, _) = join(&hub, Role::Viewer).await;
    drop(viewer);

    hub.submit(
        &presenter.participant.id,
        Mutation::SelectDocument("D1".into()),
    )
    .await
    .unwrap();
    assert_eq!(hub.participant_count().await.unwrap(), 1);
}
