//! Stdio runtime.
//!
//! Executes [`CanvasDriver`] actions against a line-delimited JSON stream
//! (see [`protocol`](crate::protocol)). Production wires it to stdin and
//! stdout; tests hand it in-memory buffers.

use std::future::Future;

use easel_core::Environment;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    Canvas, CanvasFlushReport, ServerError,
    driver::{CanvasAction, CanvasDriver, CanvasEvent, LogLevel},
    protocol::{ClientEnvelope, ClientMessage, ServerEnvelope},
    storage::Storage,
};

/// Serve `input` until EOF or `shutdown` resolves, then stop the stores.
///
/// The background flushers run for the whole session. Whatever happens to
/// the streams, both stores are stopped and flushed before returning.
///
/// # Errors
///
/// - `ServerError::Store` if the flushers cannot start
/// - `ServerError::Io` if reading input or writing output fails. The final
///   flush has already run when this is returned.
pub async fn run<S, E, I, O, F>(
    canvas: Canvas<S, E>,
    input: I,
    mut output: O,
    shutdown: F,
) -> Result<CanvasFlushReport, ServerError>
where
    S: Storage,
    E: Environment,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    if let Err(e) = canvas.start() {
        // One flusher may already be running.
        canvas.stop().await;
        return Err(e.into());
    }
    tracing::info!("canvas runtime started");

    let mut driver = CanvasDriver::new(canvas.clone());
    let served = serve(&mut driver, input, &mut output, shutdown).await;

    let report = canvas.stop().await;
    tracing::info!(
        strokes_persisted = report.strokes.persisted,
        chat_persisted = report.chat.persisted,
        failed = report.strokes.failed.len() + report.chat.failed.len(),
        "canvas runtime stopped"
    );

    served.map(|()| report)
}

async fn serve<S, E, I, O, F>(
    driver: &mut CanvasDriver<S, E>,
    mut input: I,
    output: &mut O,
    shutdown: F,
) -> Result<(), ServerError>
where
    S: Storage,
    E: Environment,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = tokio::select! {
            () = &mut shutdown => {
                tracing::info!("shutdown requested");
                return Ok(());
            }
            read = input.read_until(b'\n', &mut line) => read?,
        };
        if read == 0 {
            tracing::info!("input closed");
            return Ok(());
        }

        let bytes = line.trim_ascii();
        if bytes.is_empty() {
            continue;
        }

        // Bytes, not str: a line that is not UTF-8 is one bad event, not a
        // broken stream.
        let envelope: ClientEnvelope = match serde_json::from_slice(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed input line");
                continue;
            },
        };

        for event in events_for(driver, envelope) {
            let actions = driver.process_event(event);
            execute(driver, actions, output).await?;
        }
    }
}

/// Translate one inbound envelope into driver events.
///
/// A session is opened implicitly by its first message unless that message
/// is an explicit connect or a disconnect.
fn events_for<S: Storage, E: Environment>(
    driver: &CanvasDriver<S, E>,
    envelope: ClientEnvelope,
) -> Vec<CanvasEvent> {
    let session_id = envelope.session;
    let mut events = Vec::with_capacity(2);

    let implicit_open = !driver.registry().has_session(session_id)
        && !matches!(envelope.event, ClientMessage::Connect | ClientMessage::Disconnect);
    if implicit_open {
        events.push(CanvasEvent::SessionOpened { session_id });
    }

    events.push(match envelope.event {
        ClientMessage::Connect => CanvasEvent::SessionOpened { session_id },
        ClientMessage::Join { room } => CanvasEvent::Join { session_id, room },
        ClientMessage::Draw { stroke } => CanvasEvent::Draw { session_id, stroke },
        ClientMessage::Clear => CanvasEvent::Clear { session_id },
        ClientMessage::Chat { message } => CanvasEvent::Chat { session_id, message },
        ClientMessage::Disconnect => CanvasEvent::SessionClosed { session_id },
    });
    events
}

async fn execute<S, E, O>(
    driver: &CanvasDriver<S, E>,
    actions: Vec<CanvasAction>,
    output: &mut O,
) -> Result<(), ServerError>
where
    S: Storage,
    E: Environment,
    O: AsyncWrite + Unpin,
{
    for action in actions {
        match action {
            CanvasAction::SendToSession { session_id, message } => {
                write_envelope(output, &ServerEnvelope { to: vec![session_id], message }).await?;
            },
            CanvasAction::BroadcastToRoom { room_id, message, exclude_session } => {
                let to = driver.recipients(&room_id, exclude_session);
                if !to.is_empty() {
                    write_envelope(output, &ServerEnvelope { to, message }).await?;
                }
            },
            CanvasAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{message}"),
                LogLevel::Info => tracing::info!("{message}"),
                LogLevel::Warn => tracing::warn!("{message}"),
            },
        }
    }
    Ok(())
}

async fn write_envelope<O: AsyncWrite + Unpin>(
    output: &mut O,
    envelope: &ServerEnvelope,
) -> Result<(), ServerError> {
    let mut line = serde_json::to_vec(envelope).map_err(std::io::Error::other)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}
