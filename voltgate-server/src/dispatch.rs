//! Action dispatch for raw frames.
//!
//! Handlers live in an explicit registry keyed by action name and direction,
//! populated once at startup: one inbound-call handler per action, one
//! response handler per action for locally initiated exchanges, and exactly
//! one catch-all error-frame handler. A missing registration surfaces as
//! `HandlerNotFound` when the frame arrives, never as a reflective
//! lookup-by-name failure.
//!
//! CallResult and CallError frames carry no action field, so the dispatcher
//! resolves the action they answer from the correlation entry recorded when
//! the exchange started.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use voltgate_protocol::{
    peek_identity, Call, CallError, CallResult, CodecError, Frame, MessageType,
};
use voltgate_utils::VoltgateError;

use crate::correlation::{CorrelationStore, EntryStatus};
use crate::session::SessionContext;

/// Why a frame could not be fully dispatched
///
/// None of these close the session by themselves; they are surfaced to the
/// inbound flow, logged, and the connection moves on.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Invalid or mismatched wire syntax
    #[error(transparent)]
    Frame(#[from] CodecError),

    /// No handler registered for the resolved action and direction
    #[error("no {direction} handler registered for action {action}")]
    HandlerNotFound {
        direction: &'static str,
        action: String,
    },

    /// A response frame whose uniqueId has no correlation entry; there is
    /// nothing to resolve its action from
    #[error("no correlation entry for response {0}; its action cannot be resolved")]
    CorrelationMiss(String),

    /// A handler reported a failure of its own
    #[error("handler failed: {0}")]
    Handler(#[source] VoltgateError),
}

/// What a handler wants done with its frame
pub struct HandlerOutcome {
    /// Frame to send back over the same socket, if any
    pub response: Option<Frame>,
    /// False when the handler wants the connection closed
    pub keep_open: bool,
}

impl HandlerOutcome {
    /// Answer with a frame and keep the socket open
    pub fn respond(frame: Frame) -> Self {
        Self {
            response: Some(frame),
            keep_open: true,
        }
    }

    /// Answer with a frame, then close the connection
    pub fn respond_and_close(frame: Frame) -> Self {
        Self {
            response: Some(frame),
            keep_open: false,
        }
    }

    /// No answer, keep the socket open
    pub fn silent() -> Self {
        Self {
            response: None,
            keep_open: true,
        }
    }
}

pub type HandlerResult = Result<HandlerOutcome, VoltgateError>;

/// Handler for inbound Call frames, one per action
pub trait CallHandler: Send + Sync {
    fn handle(&self, ctx: &SessionContext, call: &Call) -> HandlerResult;
}

impl<F> CallHandler for F
where
    F: Fn(&SessionContext, &Call) -> HandlerResult + Send + Sync,
{
    fn handle(&self, ctx: &SessionContext, call: &Call) -> HandlerResult {
        self(ctx, call)
    }
}

/// Handler for CallResult frames answering locally initiated Calls
pub trait ResultHandler: Send + Sync {
    fn handle(&self, ctx: &SessionContext, result: &CallResult) -> HandlerResult;
}

impl<F> ResultHandler for F
where
    F: Fn(&SessionContext, &CallResult) -> HandlerResult + Send + Sync,
{
    fn handle(&self, ctx: &SessionContext, result: &CallResult) -> HandlerResult {
        self(ctx, result)
    }
}

/// The single catch-all handler for CallError frames
pub trait ErrorFrameHandler: Send + Sync {
    fn handle(&self, ctx: &SessionContext, error: &CallError) -> HandlerResult;
}

impl<F> ErrorFrameHandler for F
where
    F: Fn(&SessionContext, &CallError) -> HandlerResult + Send + Sync,
{
    fn handle(&self, ctx: &SessionContext, error: &CallError) -> HandlerResult {
        self(ctx, error)
    }
}

fn log_error_frame(_ctx: &SessionContext, error: &CallError) -> HandlerResult {
    warn!(
        unique_id = %error.unique_id,
        code = %error.error_code,
        description = %error.error_description,
        "peer reported an error frame"
    );
    Ok(HandlerOutcome::silent())
}

/// Registry mapping (direction, action) to typed handler values
pub struct HandlerRegistry {
    call_handlers: HashMap<String, Box<dyn CallHandler>>,
    result_handlers: HashMap<String, Box<dyn ResultHandler>>,
    error_handler: Box<dyn ErrorFrameHandler>,
}

impl HandlerRegistry {
    /// Empty registry; error frames get a logging catch-all until replaced
    pub fn new() -> Self {
        Self {
            call_handlers: HashMap::new(),
            result_handlers: HashMap::new(),
            error_handler: Box::new(log_error_frame),
        }
    }

    pub fn register_call(
        &mut self,
        action: impl Into<String>,
        handler: impl CallHandler + 'static,
    ) {
        self.call_handlers.insert(action.into(), Box::new(handler));
    }

    pub fn register_result(
        &mut self,
        action: impl Into<String>,
        handler: impl ResultHandler + 'static,
    ) {
        self.result_handlers.insert(action.into(), Box::new(handler));
    }

    pub fn set_error_handler(&mut self, handler: impl ErrorFrameHandler + 'static) {
        self.error_handler = Box::new(handler);
    }

    pub fn call_handler(&self, action: &str) -> Option<&dyn CallHandler> {
        self.call_handlers.get(action).map(|h| h.as_ref())
    }

    pub fn result_handler(&self, action: &str) -> Option<&dyn ResultHandler> {
        self.result_handlers.get(action).map(|h| h.as_ref())
    }

    pub fn error_handler(&self) -> &dyn ErrorFrameHandler {
        self.error_handler.as_ref()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of dispatching one raw frame
///
/// The error rides along as a value; protocol-level failures never unwind.
pub struct DispatchOutcome {
    /// Serialized frame to hand to the outbound flow, if any
    pub response: Option<String>,
    pub error: Option<DispatchError>,
    /// False when the session should move to Closing
    pub keep_open: bool,
}

impl DispatchOutcome {
    fn fail(error: DispatchError) -> Self {
        Self {
            response: None,
            error: Some(error),
            keep_open: true,
        }
    }
}

/// Routes raw frames to the registered handlers of one session
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    store: Arc<CorrelationStore>,
    context: Arc<SessionContext>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        store: Arc<CorrelationStore>,
        context: Arc<SessionContext>,
    ) -> Self {
        Self {
            registry,
            store,
            context,
        }
    }

    /// Dispatch one raw frame
    pub fn handle(&self, raw: &str) -> DispatchOutcome {
        let (message_type, unique_id) = match peek_identity(raw) {
            Ok(identity) => identity,
            Err(e) => return DispatchOutcome::fail(e.into()),
        };
        match message_type {
            MessageType::Call => self.handle_call(raw),
            MessageType::CallResult => self.handle_call_result(raw, &unique_id),
            MessageType::CallError => self.handle_call_error(raw, &unique_id),
        }
    }

    fn handle_call(&self, raw: &str) -> DispatchOutcome {
        let call = match Call::decode(raw) {
            Ok(call) => call,
            Err(e) => return DispatchOutcome::fail(e.into()),
        };
        // Attach the action to the entry the inbound flow recorded; absent
        // only when the store refused the frame.
        let _ = self.store.set_action(&call.unique_id, &call.action);

        let Some(handler) = self.registry.call_handler(&call.action) else {
            return DispatchOutcome::fail(DispatchError::HandlerNotFound {
                direction: "call",
                action: call.action,
            });
        };
        match handler.handle(&self.context, &call) {
            Ok(outcome) => self.finish(outcome),
            Err(e) => DispatchOutcome::fail(DispatchError::Handler(e)),
        }
    }

    fn handle_call_result(&self, raw: &str, unique_id: &str) -> DispatchOutcome {
        let result = match CallResult::decode(raw) {
            Ok(result) => result,
            Err(e) => return DispatchOutcome::fail(e.into()),
        };
        let Some(entry) = self.store.get(unique_id) else {
            return DispatchOutcome::fail(DispatchError::CorrelationMiss(unique_id.to_string()));
        };
        let Some(handler) = self.registry.result_handler(&entry.action) else {
            return DispatchOutcome::fail(DispatchError::HandlerNotFound {
                direction: "result",
                action: entry.action,
            });
        };
        let handled = handler.handle(&self.context, &result);
        // The response has been processed; the exchange is terminal either way.
        let _ = self.store.set_status(unique_id, EntryStatus::Completed);
        match handled {
            Ok(outcome) => self.finish(outcome),
            Err(e) => DispatchOutcome::fail(DispatchError::Handler(e)),
        }
    }

    fn handle_call_error(&self, raw: &str, unique_id: &str) -> DispatchOutcome {
        let error = match CallError::decode(raw) {
            Ok(error) => error,
            Err(e) => return DispatchOutcome::fail(e.into()),
        };
        let handled = self.registry.error_handler().handle(&self.context, &error);
        let _ = self.store.set_status(unique_id, EntryStatus::Error);
        match handled {
            Ok(outcome) => self.finish(outcome),
            Err(e) => DispatchOutcome::fail(DispatchError::Handler(e)),
        }
    }

    fn finish(&self, outcome: HandlerOutcome) -> DispatchOutcome {
        let mut dispatched = DispatchOutcome {
            response: None,
            error: None,
            keep_open: outcome.keep_open,
        };
        if let Some(frame) = outcome.response {
            match frame.encode() {
                Ok(text) => dispatched.response = Some(text),
                Err(e) => dispatched.error = Some(e.into()),
            }
        }
        dispatched
    }
}
