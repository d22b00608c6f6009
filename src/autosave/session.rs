//! Autosave session actor and its handle.
//!
//! One session is opened per drawing editor bound to one entity. The actor
//! owns the [`SessionContext`] and drives a `select!` loop over the command
//! channel, the debounce sleep and the periodic interval. The session tears
//! down on [`AutosaveHandle::close`], when the handle is dropped, or when
//! its cancellation token fires; every path runs the save path once more.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::gateway::SnapshotGateway;
use super::hydrate::Hydration;
use super::scheduler::{
    AutosaveEvent, SaveTrigger, SchedulerState, SessionContext, debounce_elapsed,
};
use crate::config::AutosaveConfig;
use crate::drawing::{DrawingEditor, SharedEditor};
use crate::error::{PlaninkError, Result};
use crate::store::DrawingTarget;

enum SessionCommand {
    Edit,
    Blur,
    Hydrate {
        stored: Option<String>,
        reply: oneshot::Sender<Hydration>,
    },
    Close,
}

/// Builder for one autosave session.
pub struct AutosaveSession<E: DrawingEditor> {
    target: DrawingTarget,
    editor: SharedEditor<E>,
    gateway: Arc<dyn SnapshotGateway>,
    debounce: Duration,
    periodic: Duration,
    events: Option<mpsc::UnboundedSender<AutosaveEvent>>,
    cancel: CancellationToken,
}

impl<E: DrawingEditor> AutosaveSession<E> {
    pub fn new(
        target: DrawingTarget,
        editor: SharedEditor<E>,
        gateway: Arc<dyn SnapshotGateway>,
    ) -> Self {
        let defaults = AutosaveConfig::default();
        Self {
            target,
            editor,
            gateway,
            debounce: defaults.debounce(),
            periodic: defaults.periodic(),
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: &AutosaveConfig) -> Self {
        self.debounce = config.debounce();
        self.periodic = config.periodic();
        self
    }

    /// Report session outcomes on `events`.
    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<AutosaveEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Tear the session down when `cancel` fires.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Load the stored snapshot through the gateway, hydrate and start.
    ///
    /// Fails with [`PlaninkError::Gateway`] without starting when the
    /// gateway refuses the read (no owner, missing or foreign entity).
    pub async fn open(self) -> Result<AutosaveHandle> {
        let stored = self.gateway.load(&self.target).await?;
        Ok(self.open_with_snapshot(stored.as_deref()))
    }

    /// Hydrate from an already fetched snapshot and start.
    pub fn open_with_snapshot(self, stored: Option<&str>) -> AutosaveHandle {
        self.start(|ctx, editor| Some(ctx.hydrate(editor, stored)))
    }

    /// Start without hydrating; the snapshot is supplied later through
    /// [`AutosaveHandle::hydrate`].
    pub fn spawn(self) -> AutosaveHandle {
        self.start(|_, _| None)
    }

    fn start<F>(self, prepare: F) -> AutosaveHandle
    where
        F: FnOnce(&mut SessionContext, &SharedEditor<E>) -> Option<Hydration>,
    {
        let (mut ctx, state) =
            SessionContext::new(self.target.clone(), self.debounce, self.gateway, self.events);
        let initial_hydration = prepare(&mut ctx, &self.editor);
        let (commands, rx) = mpsc::unbounded_channel();

        info!(
            entity = %self.target,
            debounce = ?self.debounce,
            periodic = ?self.periodic,
            "autosave session opened"
        );
        let task = tokio::spawn(run_session(ctx, self.editor, rx, self.periodic, self.cancel));

        AutosaveHandle {
            target: self.target,
            commands,
            state,
            initial_hydration,
            task,
        }
    }
}

async fn run_session<E: DrawingEditor>(
    mut ctx: SessionContext,
    editor: SharedEditor<E>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    period: Duration,
    cancel: CancellationToken,
) {
    // `interval_at` panics on a zero period.
    let period = period.max(Duration::from_millis(1));
    let mut periodic = interval_at(Instant::now() + period, period);
    periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(entity = %ctx.target(), "session cancelled");
                break;
            }
            command = commands.recv() => match command {
                Some(SessionCommand::Edit) => ctx.arm_debounce(),
                Some(SessionCommand::Blur) => {
                    ctx.cancel_debounce();
                    ctx.save(SaveTrigger::Blur, &editor);
                }
                Some(SessionCommand::Hydrate { stored, reply }) => {
                    let outcome = ctx.hydrate(&editor, stored.as_deref());
                    let _ = reply.send(outcome);
                }
                Some(SessionCommand::Close) => break,
                None => {
                    debug!(entity = %ctx.target(), "session handle dropped");
                    break;
                }
            },
            () = debounce_elapsed(ctx.debounce_slot()) => {
                ctx.cancel_debounce();
                ctx.save(SaveTrigger::Debounce, &editor);
            }
            _ = periodic.tick() => {
                ctx.save(SaveTrigger::Periodic, &editor);
            }
        }
    }

    ctx.teardown(&editor);
}

/// Control surface of a running autosave session.
///
/// The drawing surface reports edits and focus loss here. Dropping the
/// handle tears the session down like [`close`](Self::close).
pub struct AutosaveHandle {
    target: DrawingTarget,
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: watch::Receiver<SchedulerState>,
    initial_hydration: Option<Hydration>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    pub fn target(&self) -> &DrawingTarget {
        &self.target
    }

    /// The editor state changed.
    pub fn notify_change(&self) -> Result<()> {
        self.send(SessionCommand::Edit)
    }

    /// The editor lost focus.
    pub fn notify_blur(&self) -> Result<()> {
        self.send(SessionCommand::Blur)
    }

    /// Hydrate from a snapshot that became available after the session
    /// started. Only the first hydration of a session loads anything.
    pub async fn hydrate(&self, stored: Option<String>) -> Result<Hydration> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Hydrate { stored, reply })?;
        rx.await
            .map_err(|e| PlaninkError::Channel(format!("hydration reply dropped: {e}")))
    }

    /// Hydration performed when the session opened, if any.
    pub fn initial_hydration(&self) -> Option<Hydration> {
        self.initial_hydration
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Tear down and wait for the actor to exit.
    ///
    /// The final write is dispatched before this returns but is not awaited;
    /// its outcome arrives on the event channel.
    pub async fn close(self) -> Result<()> {
        let Self { commands, task, .. } = self;
        // The actor may already be gone after cancellation.
        let _ = commands.send(SessionCommand::Close);
        drop(commands);
        task.await
            .map_err(|e| PlaninkError::Channel(format!("autosave session task failed: {e}")))
    }

    fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| {
            PlaninkError::Channel(format!("autosave session for {} is closed", self.target))
        })
    }
}
