#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Autosave sessions against the real SQLite store and owner-scoped gateway,
//! on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use planink::auth::{OwnerId, SessionIdentity};
use planink::PlaninkError;
use planink::autosave::{
    AutosaveEvent, AutosaveSession, GatewayError, OwnerScopedGateway, SaveTrigger,
    SnapshotGateway,
};
use planink::config::AutosaveConfig;
use planink::drawing::{DrawingEditor, Sketch, shared};
use planink::store::{DrawingTarget, NewDocument, NewTask, SqliteEntityStore};
use tokio::sync::mpsc;
use tokio::time::sleep;

struct Fixture {
    store: Arc<SqliteEntityStore>,
    alice: OwnerId,
    identity: Arc<SessionIdentity>,
}

impl Fixture {
    fn new() -> Self {
        let alice = OwnerId::new("alice").expect("owner");
        Self {
            store: Arc::new(SqliteEntityStore::open_in_memory().expect("store")),
            identity: Arc::new(SessionIdentity::signed_in(alice.clone())),
            alice,
        }
    }

    fn gateway(&self) -> Arc<dyn SnapshotGateway> {
        Arc::new(OwnerScopedGateway::new(
            Arc::clone(&self.store),
            self.identity.clone(),
        ))
    }

    fn task(&self) -> DrawingTarget {
        let task = self
            .store
            .create_task(
                &self.alice,
                &NewTask {
                    title: "draw the garden".to_owned(),
                    notes: String::new(),
                    due_date: NaiveDate::from_ymd_opt(2026, 10, 14).expect("date"),
                },
            )
            .expect("create task");
        DrawingTarget::task(task.id)
    }

    fn stored(&self, target: &DrawingTarget) -> Option<String> {
        self.store.read_drawing(&self.alice, target).expect("read")
    }
}

async fn drain(mut rx: mpsc::UnboundedReceiver<AutosaveEvent>) -> Vec<AutosaveEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn persisted(events: &[AutosaveEvent]) -> Vec<(u64, SaveTrigger)> {
    events
        .iter()
        .filter_map(|e| match e {
            AutosaveEvent::Persisted {
                attempt, trigger, ..
            } => Some((*attempt, *trigger)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn debounced_write_lands_in_store() {
    let fx = Fixture::new();
    let target = fx.task();
    let editor = shared(Sketch::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = AutosaveSession::new(target.clone(), Arc::clone(&editor), fx.gateway())
        .with_events(tx)
        .open()
        .await
        .expect("open");

    editor.lock().unwrap().draw("#000", 2.0, &[(0.0, 0.0), (1.0, 1.0)]);
    handle.notify_change().unwrap();
    sleep(Duration::from_millis(100)).await;
    editor.lock().unwrap().draw("#000", 2.0, &[(2.0, 2.0)]);
    handle.notify_change().unwrap();

    sleep(Duration::from_millis(250)).await;
    assert_eq!(fx.stored(&target), None, "debounce has not fired yet");

    sleep(Duration::from_millis(100)).await;
    let expected = editor.lock().unwrap().serialize().unwrap();
    assert_eq!(fx.stored(&target), Some(expected));

    handle.close().await.unwrap();
    let events = drain(rx).await;
    assert_eq!(persisted(&events), vec![(1, SaveTrigger::Debounce)]);
}

#[tokio::test(start_paused = true)]
async fn custom_intervals_are_honoured() {
    let fx = Fixture::new();
    let target = fx.task();
    let editor = shared(Sketch::new());
    let config = AutosaveConfig {
        debounce_ms: 50,
        periodic_ms: 200,
    };
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = AutosaveSession::new(target.clone(), Arc::clone(&editor), fx.gateway())
        .with_config(&config)
        .with_events(tx)
        .open()
        .await
        .expect("open");

    // Edits every 30 ms never leave a 50 ms gap.
    for i in 0..10u8 {
        editor.lock().unwrap().draw("#111", 1.0, &[(f32::from(i), 0.0)]);
        handle.notify_change().unwrap();
        sleep(Duration::from_millis(30)).await;
    }
    handle.close().await.unwrap();

    let events = drain(rx).await;
    let triggers: Vec<SaveTrigger> = persisted(&events).into_iter().map(|(_, t)| t).collect();
    assert_eq!(
        triggers,
        vec![SaveTrigger::Periodic, SaveTrigger::Teardown]
    );
    assert_eq!(
        fx.stored(&target),
        Some(editor.lock().unwrap().serialize().unwrap())
    );
}

#[tokio::test(start_paused = true)]
async fn teardown_writes_latest_state_once() {
    let fx = Fixture::new();
    let target = fx.task();
    let editor = shared(Sketch::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = AutosaveSession::new(target.clone(), Arc::clone(&editor), fx.gateway())
        .with_events(tx)
        .open()
        .await
        .expect("open");

    editor.lock().unwrap().draw("#f00", 3.0, &[(5.0, 5.0)]);
    handle.notify_change().unwrap();
    handle.close().await.unwrap();

    let events = drain(rx).await;
    assert_eq!(persisted(&events), vec![(1, SaveTrigger::Teardown)]);
    assert_eq!(
        fx.stored(&target),
        Some(editor.lock().unwrap().serialize().unwrap())
    );
}

#[tokio::test(start_paused = true)]
async fn reopened_session_hydrates_previous_drawing() {
    let fx = Fixture::new();
    let target = fx.task();

    let first = shared(Sketch::new());
    first.lock().unwrap().draw("#0a0", 1.0, &[(1.0, 2.0), (3.0, 4.0)]);
    let handle = AutosaveSession::new(target.clone(), Arc::clone(&first), fx.gateway())
        .open()
        .await
        .expect("open");
    handle.notify_blur().unwrap();
    handle.close().await.unwrap();
    sleep(Duration::from_millis(1)).await;

    let second = shared(Sketch::new());
    let handle = AutosaveSession::new(target, Arc::clone(&second), fx.gateway())
        .open()
        .await
        .expect("reopen");
    assert_eq!(*second.lock().unwrap(), *first.lock().unwrap());
    handle.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn foreign_owner_cannot_overwrite_drawing() {
    let fx = Fixture::new();
    let target = fx.task();
    fx.store
        .write_drawing(&fx.alice, &target, "{\"version\":1,\"strokes\":[]}")
        .expect("seed");

    let mallory = Arc::new(SessionIdentity::signed_in(
        OwnerId::new("mallory").expect("owner"),
    ));
    let gateway: Arc<dyn SnapshotGateway> =
        Arc::new(OwnerScopedGateway::new(Arc::clone(&fx.store), mallory));

    // Opening through the gateway fails: the entity is not visible.
    let editor = shared(Sketch::new());
    let refused = AutosaveSession::new(target.clone(), Arc::clone(&editor), Arc::clone(&gateway))
        .open()
        .await;
    assert!(matches!(
        refused,
        Err(PlaninkError::Gateway(GatewayError::Rejected(_)))
    ));

    // A session started without the read still cannot write.
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = AutosaveSession::new(target.clone(), Arc::clone(&editor), gateway)
        .with_events(tx)
        .open_with_snapshot(None);
    editor.lock().unwrap().draw("#000", 1.0, &[(9.0, 9.0)]);
    handle.notify_blur().unwrap();
    handle.close().await.unwrap();

    let events = drain(rx).await;
    assert!(
        events
            .iter()
            .any(|e| matches!(e, AutosaveEvent::WriteFailed { .. }))
    );
    assert_eq!(
        fx.stored(&target),
        Some("{\"version\":1,\"strokes\":[]}".to_owned())
    );
}

#[tokio::test(start_paused = true)]
async fn signed_out_session_cannot_open() {
    let fx = Fixture::new();
    let target = fx.task();
    fx.identity.sign_out();

    let result = AutosaveSession::new(target, shared(Sketch::new()), fx.gateway())
        .open()
        .await;
    assert!(matches!(
        result,
        Err(PlaninkError::Gateway(GatewayError::Unauthenticated))
    ));
}

#[tokio::test(start_paused = true)]
async fn document_writes_touch_updated_at() {
    let fx = Fixture::new();
    let doc = fx
        .store
        .create_document(
            &fx.alice,
            &NewDocument {
                title: "journal".to_owned(),
                content: String::new(),
            },
        )
        .expect("create");
    let target = DrawingTarget::document(doc.id.clone());

    std::thread::sleep(Duration::from_millis(5));
    let editor = shared(Sketch::new());
    editor.lock().unwrap().draw("#000", 1.0, &[(1.0, 1.0)]);
    let handle = AutosaveSession::new(target, editor, fx.gateway())
        .open()
        .await
        .expect("open");
    handle.close().await.unwrap();
    sleep(Duration::from_millis(1)).await;

    let reloaded = fx.store.get_document(&fx.alice, &doc.id).expect("get");
    assert!(reloaded.drawing.is_some());
    assert!(reloaded.updated_at > doc.updated_at);
}
