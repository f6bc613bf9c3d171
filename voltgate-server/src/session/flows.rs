//! The per-connection flow pair.
//!
//! Each session runs one inbound and one outbound task over the two halves
//! of its socket. The inbound flow reads raw frames, records them in the
//! correlation store, dispatches them, and forwards any produced output to
//! the outbound flow as a uniqueId token. The outbound flow writes stored
//! text in strict token order. Shutdown is cooperative: whichever flow hits
//! a failure drops the shared active flag and fires the session's
//! cancellation signal, and the other flow exits on its next suspension
//! point.
//!
//! Both flows are generic over the socket halves so tests can drive them
//! with in-memory streams.

use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use voltgate_protocol::peek_identity;
use voltgate_utils::VoltgateError;

use super::Session;
use crate::correlation::{Direction, EntryStatus};
use crate::dispatch::Dispatcher;

/// Read frames off the socket until it fails or a handler asks to close
pub async fn inbound_flow<S>(mut frames: S, session: Arc<Session>, dispatcher: Arc<Dispatcher>)
where
    S: Stream<Item = Result<String, VoltgateError>> + Unpin,
{
    let device_id = session.device_id().to_string();
    loop {
        let next = tokio::select! {
            _ = session.cancelled() => break,
            next = frames.next() => next,
        };
        let Some(next) = next else {
            info!(device_id = %device_id, "socket stream ended");
            break;
        };
        let raw = match next {
            Ok(raw) => raw,
            Err(e) => {
                warn!(device_id = %device_id, error = %e, "socket read failed");
                break;
            }
        };
        debug!(device_id = %device_id, frame = %raw, "received frame");

        // Record the frame before dispatching; a full store refuses the
        // frame outright rather than queueing unbounded work.
        let identity = peek_identity(&raw).ok();
        if let Some((_, unique_id)) = &identity {
            if let Err(e) = session.store().record_received(unique_id, &raw) {
                warn!(
                    device_id = %device_id,
                    unique_id = %unique_id,
                    error = %e,
                    "dropping frame: correlation store refused it"
                );
                continue;
            }
        }

        let outcome = dispatcher.handle(&raw);
        if let Some(error) = &outcome.error {
            warn!(device_id = %device_id, error = %error, "dispatch error");
        }
        if let Some(text) = outcome.response {
            // The outbound flow fetches text by token, so store it first.
            if let Some((_, unique_id)) = &identity {
                if let Err(e) = session.store().set_sent_text(unique_id, &text) {
                    warn!(
                        device_id = %device_id,
                        unique_id = %unique_id,
                        error = %e,
                        "response produced but its exchange is gone"
                    );
                } else if let Err(e) = session.enqueue(unique_id) {
                    warn!(
                        device_id = %device_id,
                        unique_id = %unique_id,
                        error = %e,
                        "dropping response: outbound queue refused the token"
                    );
                }
            }
        }
        if !outcome.keep_open {
            info!(device_id = %device_id, "handler requested close");
            break;
        }
    }
    session.deactivate();
    info!(device_id = %device_id, "inbound flow finished");
}

/// Write stored frames in token order until the session shuts down
pub async fn outbound_flow<W>(mut sink: W, mut tokens: mpsc::Receiver<String>, session: Arc<Session>)
where
    W: Sink<String> + Unpin,
    W::Error: std::fmt::Display,
{
    let device_id = session.device_id().to_string();
    loop {
        let token = tokio::select! {
            _ = session.cancelled() => break,
            token = tokens.recv() => match token {
                Some(token) => token,
                None => break,
            },
        };
        if !session.is_active() {
            break;
        }
        let Some(entry) = session.store().get(&token) else {
            warn!(device_id = %device_id, unique_id = %token, "no exchange for outbound token");
            continue;
        };
        if entry.sent_text.is_empty() {
            warn!(device_id = %device_id, unique_id = %token, "outbound token has no text");
            continue;
        }
        if let Err(e) = sink.send(entry.sent_text.clone()).await {
            warn!(device_id = %device_id, error = %e, "socket write failed");
            break;
        }
        debug!(device_id = %device_id, unique_id = %token, "sent frame");

        // A response we generated is done once written; a locally initiated
        // call now waits for its correlated response.
        let written = match entry.direction {
            Direction::Received => EntryStatus::Completed,
            Direction::Sent => EntryStatus::Sent,
        };
        if let Err(e) = session.store().set_status(&token, written) {
            warn!(device_id = %device_id, unique_id = %token, error = %e, "exchange vanished after write");
        }
    }
    session.deactivate();
    info!(device_id = %device_id, "outbound flow finished");
}
