//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages, dispatches them
//! through the `HostCommandServer`, and writes `ResponseEnvelope` and
//! `EventEnvelope` messages as newline-delimited JSON.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

use crate::error::{PlaninkError, Result};
use crate::host::channel::{HostCommandClient, command_channel};
use crate::host::contract::{CommandEnvelope, ResponseEnvelope};
use crate::workspace::Workspace;

/// Default request channel capacity for the stdio bridge.
const REQUEST_CAPACITY: usize = 64;

/// Default event broadcast channel capacity for the stdio bridge.
const EVENT_CAPACITY: usize = 128;

type SharedWriter<W> = Arc<Mutex<BufWriter<W>>>;

/// Run the bridge over the process's stdin/stdout until stdin closes.
pub async fn run_stdio_bridge(workspace: Workspace) -> Result<()> {
    run_bridge(workspace, tokio::io::stdin(), tokio::io::stdout()).await?;
    Ok(())
}

/// Run the bridge over arbitrary streams until `input` reaches EOF.
///
/// Three tasks operate concurrently:
///
/// 1. **Reader** -- reads newline-delimited JSON from `input`, dispatches
///    each `CommandEnvelope` and writes the resulting `ResponseEnvelope`.
/// 2. **Event forwarder** -- writes broadcast `EventEnvelope` messages
///    (autosave outcomes) as JSON lines.
/// 3. **Server** -- runs the `HostCommandServer` router loop.
///
/// On EOF the reader drops its client, the server closes every open drawing
/// and forwards the final autosave events, and the forwarder drains. The
/// writer is returned so callers can inspect what was written.
pub async fn run_bridge<R, W>(workspace: Workspace, input: R, output: W) -> Result<W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (client, server) = command_channel(REQUEST_CAPACITY, EVENT_CAPACITY, workspace);
    let writer: SharedWriter<W> = Arc::new(Mutex::new(BufWriter::new(output)));

    let server_handle = tokio::spawn(server.run());

    let event_writer = Arc::clone(&writer);
    let mut event_rx = client.subscribe_events();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event_envelope) => match serde_json::to_string(&event_envelope) {
                    Ok(json) => {
                        let mut w = event_writer.lock().await;
                        if let Err(e) = write_line(&mut w, &json).await {
                            tracing::warn!(
                                error = %e,
                                "failed to write event envelope; stopping event forwarder"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "failed to serialize event envelope; skipping"
                        );
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        lagged = n,
                        "event forwarder lagged; some events were dropped"
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    tracing::info!("event broadcast channel closed; stopping event forwarder");
                    break;
                }
            }
        }
    });

    let reader_result = run_reader(client, input, Arc::clone(&writer)).await;

    // The client is gone, so the server shuts down and drops the last
    // broadcast sender, which ends the forwarder.
    server_handle
        .await
        .map_err(|e| PlaninkError::Channel(format!("host server task failed: {e}")))?;
    event_handle
        .await
        .map_err(|e| PlaninkError::Channel(format!("event forwarder task failed: {e}")))?;
    reader_result?;

    let writer = Arc::try_unwrap(writer)
        .map_err(|_| PlaninkError::Channel("bridge writer still shared".to_owned()))?;
    Ok(writer.into_inner().into_inner())
}

/// Read line-by-line, dispatch each command, and write responses.
async fn run_reader<R, W>(client: HostCommandClient, input: R, writer: SharedWriter<W>) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(input);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| PlaninkError::Channel(format!("failed to read from input: {e}")))?;

        // EOF
        if bytes_read == 0 {
            tracing::info!("input closed (EOF); shutting down bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<CommandEnvelope>(trimmed) {
            Ok(envelope) => match client.send(envelope).await {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::error!(error = %e, "host command dispatch failed");
                    ResponseEnvelope::error("dispatch-error", format!("dispatch failed: {e}"))
                }
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    raw_line = %trimmed,
                    "failed to parse command envelope"
                );
                ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                )
            }
        };

        let json = serde_json::to_string(&response).map_err(|e| {
            PlaninkError::Protocol(format!("failed to serialize response envelope: {e}"))
        })?;
        let mut w = writer.lock().await;
        write_line(&mut w, &json).await?;
    }

    Ok(())
}

/// Write a single JSON line to the buffered writer and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut BufWriter<W>, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| PlaninkError::Channel(format!("failed to write output: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| PlaninkError::Channel(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| PlaninkError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}
