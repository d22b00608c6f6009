//! Per-session autosave state and the shared save path.
//!
//! A [`SessionContext`] is owned by exactly one session actor (see
//! [`super::session`]) and holds everything the scheduler remembers between
//! triggers: the pending debounce sleep, the one-shot hydration gate, the
//! last persisted snapshot and the attempt counter. It is dropped with the
//! actor, which releases both timers.

use std::pin::Pin;
use std::sync::{Arc, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::{Sleep, sleep};
use tracing::{debug, error, info, warn};

use super::change::ChangeDetector;
use super::gateway::SnapshotGateway;
use super::hydrate::{Hydration, HydrationGate};
use crate::drawing::{CodecError, DrawingEditor, SharedEditor};
use crate::store::DrawingTarget;

/// Scheduler state of one editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// No debounce armed.
    Idle,
    /// An edit arrived and the debounce sleep is armed.
    DebouncePending,
    /// The save path is running.
    Flushing,
}

/// What caused a save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveTrigger {
    Debounce,
    Periodic,
    Blur,
    Teardown,
}

impl SaveTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debounce => "debounce",
            Self::Periodic => "periodic",
            Self::Blur => "blur",
            Self::Teardown => "teardown",
        }
    }
}

/// Session outcomes, reported on the optional event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutosaveEvent {
    /// The editor was hydrated (or hydration was skipped).
    Hydrated {
        target: DrawingTarget,
        outcome: Hydration,
    },
    /// A background write finished successfully.
    Persisted {
        target: DrawingTarget,
        attempt: u64,
        trigger: SaveTrigger,
        bytes: usize,
    },
    /// The save path ran but the snapshot matched the last persisted one.
    Unchanged {
        target: DrawingTarget,
        trigger: SaveTrigger,
    },
    /// The editor could not be serialized; nothing was written.
    SerializeFailed {
        target: DrawingTarget,
        trigger: SaveTrigger,
        error: String,
    },
    /// A background write was rejected or failed.
    WriteFailed {
        target: DrawingTarget,
        attempt: u64,
        trigger: SaveTrigger,
        error: String,
    },
    /// The session tore down; no further triggers will fire.
    Closed { target: DrawingTarget },
}

/// Result of one pass through the save path, as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A write was spawned with this attempt number. Its result arrives later.
    Dispatched { attempt: u64 },
    Unchanged,
    SerializeFailed,
}

/// Session-scoped scheduler state.
pub struct SessionContext {
    target: DrawingTarget,
    state: SchedulerState,
    state_tx: watch::Sender<SchedulerState>,
    debounce_window: Duration,
    debounce: Option<Pin<Box<Sleep>>>,
    hydration: HydrationGate,
    detector: ChangeDetector,
    next_attempt: u64,
    gateway: Arc<dyn SnapshotGateway>,
    events: Option<mpsc::UnboundedSender<AutosaveEvent>>,
}

impl SessionContext {
    pub fn new(
        target: DrawingTarget,
        debounce_window: Duration,
        gateway: Arc<dyn SnapshotGateway>,
        events: Option<mpsc::UnboundedSender<AutosaveEvent>>,
    ) -> (Self, watch::Receiver<SchedulerState>) {
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let ctx = Self {
            target,
            state: SchedulerState::Idle,
            state_tx,
            debounce_window,
            debounce: None,
            hydration: HydrationGate::new(),
            detector: ChangeDetector::new(),
            next_attempt: 1,
            gateway,
            events,
        };
        (ctx, state_rx)
    }

    pub fn target(&self) -> &DrawingTarget {
        &self.target
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn has_pending_debounce(&self) -> bool {
        self.debounce.is_some()
    }

    /// Arm or re-arm the debounce sleep. The previous sleep, if any, is
    /// dropped so only the last edit of a burst fires.
    pub fn arm_debounce(&mut self) {
        let rearmed = self.debounce.is_some();
        self.debounce = Some(Box::pin(sleep(self.debounce_window)));
        debug!(entity = %self.target, rearmed, "debounce armed");
        self.set_state(SchedulerState::DebouncePending);
    }

    /// Drop the pending debounce sleep. Returns whether one was pending.
    pub fn cancel_debounce(&mut self) -> bool {
        let pending = self.debounce.take().is_some();
        if pending {
            debug!(entity = %self.target, "debounce cancelled");
        }
        pending
    }

    /// The debounce slot, for the actor's `select!`.
    pub(super) fn debounce_slot(&mut self) -> &mut Option<Pin<Box<Sleep>>> {
        &mut self.debounce
    }

    /// Load `stored` into the editor unless this session already hydrated.
    pub fn hydrate<E: DrawingEditor>(
        &mut self,
        editor: &SharedEditor<E>,
        stored: Option<&str>,
    ) -> Hydration {
        let outcome = match lock_editor(editor) {
            Ok(mut guard) => self.hydration.hydrate(&mut *guard, stored),
            Err(e) => {
                warn!(entity = %self.target, error = %e, "cannot hydrate editor");
                Hydration::Corrupt
            }
        };
        info!(entity = %self.target, ?outcome, "drawing hydration");
        self.emit(AutosaveEvent::Hydrated {
            target: self.target.clone(),
            outcome,
        });
        outcome
    }

    /// Run the save path for `trigger`.
    ///
    /// The snapshot is captured while the editor lock is held; the write is
    /// spawned on the runtime and never awaited here.
    pub fn save<E: DrawingEditor>(
        &mut self,
        trigger: SaveTrigger,
        editor: &SharedEditor<E>,
    ) -> SaveOutcome {
        self.set_state(SchedulerState::Flushing);
        let outcome = self.run_save(trigger, editor);
        let next = if self.debounce.is_some() {
            SchedulerState::DebouncePending
        } else {
            SchedulerState::Idle
        };
        self.set_state(next);
        outcome
    }

    fn run_save<E: DrawingEditor>(
        &mut self,
        trigger: SaveTrigger,
        editor: &SharedEditor<E>,
    ) -> SaveOutcome {
        let serialized = lock_editor(editor).and_then(|guard| guard.serialize());
        let snapshot = match serialized {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(
                    entity = %self.target,
                    trigger = trigger.as_str(),
                    error = %e,
                    "drawing serialization failed; save attempt skipped"
                );
                self.emit(AutosaveEvent::SerializeFailed {
                    target: self.target.clone(),
                    trigger,
                    error: e.to_string(),
                });
                return SaveOutcome::SerializeFailed;
            }
        };

        if !self.detector.should_persist(&snapshot) {
            debug!(entity = %self.target, trigger = trigger.as_str(), "snapshot unchanged");
            self.emit(AutosaveEvent::Unchanged {
                target: self.target.clone(),
                trigger,
            });
            return SaveOutcome::Unchanged;
        }

        let attempt = self.next_attempt;
        self.next_attempt += 1;
        debug!(
            entity = %self.target,
            trigger = trigger.as_str(),
            attempt,
            bytes = snapshot.len(),
            "dispatching drawing write"
        );
        self.dispatch_write(attempt, trigger, snapshot);
        SaveOutcome::Dispatched { attempt }
    }

    fn dispatch_write(&self, attempt: u64, trigger: SaveTrigger, snapshot: String) {
        let gateway = Arc::clone(&self.gateway);
        let target = self.target.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let event = match gateway.store(&target, &snapshot).await {
                Ok(()) => {
                    debug!(entity = %target, attempt, "drawing write persisted");
                    AutosaveEvent::Persisted {
                        target,
                        attempt,
                        trigger,
                        bytes: snapshot.len(),
                    }
                }
                Err(e) => {
                    warn!(entity = %target, attempt, error = %e, "drawing write failed");
                    AutosaveEvent::WriteFailed {
                        target,
                        attempt,
                        trigger,
                        error: e.to_string(),
                    }
                }
            };
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        });
    }

    /// Final save, then release the debounce sleep.
    pub fn teardown<E: DrawingEditor>(&mut self, editor: &SharedEditor<E>) -> SaveOutcome {
        self.cancel_debounce();
        let outcome = self.save(SaveTrigger::Teardown, editor);
        info!(entity = %self.target, ?outcome, "autosave session closed");
        self.emit(AutosaveEvent::Closed {
            target: self.target.clone(),
        });
        outcome
    }

    fn set_state(&mut self, state: SchedulerState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: AutosaveEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// Resolve when the armed debounce sleep elapses; never resolve when none
/// is armed.
pub(super) async fn debounce_elapsed(slot: &mut Option<Pin<Box<Sleep>>>) {
    match slot {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending::<()>().await,
    }
}

fn lock_editor<E>(editor: &SharedEditor<E>) -> Result<MutexGuard<'_, E>, CodecError> {
    editor
        .lock()
        .map_err(|_| CodecError::Serialize("drawing editor lock poisoned".to_owned()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::autosave::gateway::GatewayError;
    use crate::drawing::{Sketch, shared};
    use crate::store::EntityId;

    #[derive(Default)]
    struct MemoryGateway {
        writes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SnapshotGateway for MemoryGateway {
        async fn load(&self, _target: &DrawingTarget) -> Result<Option<String>, GatewayError> {
            Ok(None)
        }

        async fn store(&self, _target: &DrawingTarget, snapshot: &str) -> Result<(), GatewayError> {
            self.writes.lock().unwrap().push(snapshot.to_owned());
            Ok(())
        }
    }

    fn context(gateway: Arc<MemoryGateway>) -> (SessionContext, watch::Receiver<SchedulerState>) {
        SessionContext::new(
            DrawingTarget::task(EntityId::from("t-1")),
            Duration::from_millis(300),
            gateway,
            None,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn arming_moves_to_debounce_pending() {
        let (mut ctx, state) = context(Arc::new(MemoryGateway::default()));
        assert_eq!(*state.borrow(), SchedulerState::Idle);

        ctx.arm_debounce();
        ctx.arm_debounce();
        assert!(ctx.has_pending_debounce());
        assert_eq!(*state.borrow(), SchedulerState::DebouncePending);

        assert!(ctx.cancel_debounce());
        assert!(!ctx.cancel_debounce());
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_monotonic_and_unchanged_is_skipped() {
        let gateway = Arc::new(MemoryGateway::default());
        let (mut ctx, _state) = context(Arc::clone(&gateway));
        let editor = shared(Sketch::new());

        assert_eq!(
            ctx.save(SaveTrigger::Blur, &editor),
            SaveOutcome::Dispatched { attempt: 1 }
        );
        assert_eq!(ctx.save(SaveTrigger::Blur, &editor), SaveOutcome::Unchanged);

        editor.lock().unwrap().draw("#000", 1.0, &[(1.0, 1.0)]);
        assert_eq!(
            ctx.save(SaveTrigger::Periodic, &editor),
            SaveOutcome::Dispatched { attempt: 2 }
        );
        assert_eq!(ctx.state(), SchedulerState::Idle);

        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(gateway.writes.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn save_keeps_pending_debounce() {
        let (mut ctx, _state) = context(Arc::new(MemoryGateway::default()));
        let editor = shared(Sketch::new());

        ctx.arm_debounce();
        ctx.save(SaveTrigger::Periodic, &editor);
        assert_eq!(ctx.state(), SchedulerState::DebouncePending);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_slot_never_resolves() {
        let mut slot = None;
        let elapsed =
            tokio::time::timeout(Duration::from_secs(60), debounce_elapsed(&mut slot)).await;
        assert!(elapsed.is_err());
    }
}
