//! Host command channel and server loop.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::autosave::AutosaveEvent;
use crate::error::{PlaninkError, Result};
use crate::host::contract::{CommandEnvelope, EventEnvelope, ResponseEnvelope};
use crate::host::handler::CommandRouter;
use crate::workspace::Workspace;

/// Event name of forwarded autosave outcomes.
pub const AUTOSAVE_EVENT: &str = "drawing.autosave";

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<ResponseEnvelope>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl HostCommandClient {
    /// Dispatch one command and wait for its response.
    ///
    /// Command failures come back as error envelopes; `Err` means the
    /// envelope was malformed or the server is gone.
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            PlaninkError::Protocol(format!(
                "invalid host command envelope {}: {}",
                envelope.request_id, e
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| {
                PlaninkError::Channel(format!("failed to send host command request: {e}"))
            })?;

        response_rx
            .await
            .map_err(|e| PlaninkError::Channel(format!("host command response dropped: {e}")))
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }
}

pub struct HostCommandServer {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
    autosave_rx: mpsc::UnboundedReceiver<AutosaveEvent>,
    router: CommandRouter,
}

#[must_use]
pub fn command_channel(
    request_capacity: usize,
    event_capacity: usize,
    workspace: Workspace,
) -> (HostCommandClient, HostCommandServer) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    let (autosave_tx, autosave_rx) = mpsc::unbounded_channel();

    (
        HostCommandClient {
            request_tx,
            event_tx: event_tx.clone(),
        },
        HostCommandServer {
            request_rx,
            event_tx,
            autosave_rx,
            router: CommandRouter::new(workspace, autosave_tx),
        },
    )
}

impl HostCommandServer {
    /// Serve requests until every client is dropped, then close all open
    /// drawings and forward their final autosave outcomes.
    pub async fn run(self) {
        let Self {
            mut request_rx,
            event_tx,
            mut autosave_rx,
            mut router,
        } = self;

        loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else { break };
                    let response = dispatch(&mut router, &request.envelope).await;
                    let _ = request.response_tx.send(response);
                }
                Some(event) = autosave_rx.recv() => forward_autosave(&event_tx, &event),
            }
        }

        debug!("host command clients gone; closing open drawings");
        router.close_all().await;
        // Dropping the router drops the last autosave sender once the
        // in-flight writes finish.
        drop(router);
        while let Some(event) = autosave_rx.recv().await {
            forward_autosave(&event_tx, &event);
        }
    }
}

async fn dispatch(router: &mut CommandRouter, envelope: &CommandEnvelope) -> ResponseEnvelope {
    match router.route(envelope).await {
        Ok(response) => response,
        Err(e) => {
            warn!(
                command = envelope.command.as_str(),
                request_id = %envelope.request_id,
                error = %e,
                "host command failed"
            );
            ResponseEnvelope::error(envelope.request_id.clone(), e.to_string())
        }
    }
}

fn forward_autosave(event_tx: &broadcast::Sender<EventEnvelope>, event: &AutosaveEvent) {
    let payload = match serde_json::to_value(event) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "failed to encode autosave event; skipping");
            return;
        }
    };
    let envelope = EventEnvelope::new(uuid::Uuid::new_v4().to_string(), AUTOSAVE_EVENT, payload);
    // No subscribers is fine.
    let _ = event_tx.send(envelope);
}
