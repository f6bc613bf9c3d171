//! Connection sessions
//!
//! One session per connected device: an immutable context shared with the
//! action handlers, a correlation store shared by the two socket flows, and
//! the registry that guarantees at most one live session per device
//! identifier at any time.

mod flows;

pub use flows::{inbound_flow, outbound_flow};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::correlation::CorrelationStore;
use voltgate_utils::{Result, VoltgateError};

/// Lifecycle of one connection
///
/// `Authenticating` to `Open` happens unconditionally once the authorization
/// hook has answered; a rejected device reaches `Open` too, because the
/// protocol answers its opening request with an explicit rejection status
/// instead of refusing the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Connecting,
    Authenticating,
    Open,
    Closing,
    Closed,
}

/// Immutable per-session facts shared with the dispatcher and handlers
#[derive(Debug)]
pub struct SessionContext {
    pub device_id: String,
    /// Verdict of the authorization hook
    pub authorized: bool,
    /// Interval handed to the device in BootNotification answers, seconds
    pub heartbeat_interval: u64,
}

impl SessionContext {
    pub fn new(device_id: impl Into<String>, authorized: bool, heartbeat_interval: u64) -> Self {
        Self {
            device_id: device_id.into(),
            authorized,
            heartbeat_interval,
        }
    }
}

/// Shared state of one live connection
///
/// The `active` flag and the correlation store are the only state touched by
/// both flows of a session; the flag is atomic and the store carries its own
/// lock. The cancellation token is the shutdown broadcast both flows watch.
#[derive(Debug)]
pub struct Session {
    context: Arc<SessionContext>,
    store: Arc<CorrelationStore>,
    state: Mutex<SessionState>,
    active: AtomicBool,
    cancel: CancellationToken,
    outbound_tx: mpsc::Sender<String>,
}

impl Session {
    pub fn new(
        context: Arc<SessionContext>,
        store: Arc<CorrelationStore>,
        outbound_tx: mpsc::Sender<String>,
    ) -> Self {
        Self {
            context,
            store,
            state: Mutex::new(SessionState::Connecting),
            active: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            outbound_tx,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Shared handle to the context, for wiring a dispatcher
    pub fn context_handle(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Shared handle to the correlation store, for wiring a dispatcher
    pub fn store_handle(&self) -> &Arc<CorrelationStore> {
        &self.store
    }

    pub fn device_id(&self) -> &str {
        &self.context.device_id
    }

    pub fn store(&self) -> &CorrelationStore {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Shut the session down
    ///
    /// Drops the active flag, moves a non-terminal session to `Closing`, and
    /// wakes everything waiting on the cancellation signal. Safe to call
    /// from either flow, any number of times.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        {
            let mut state = self.state.lock();
            if *state != SessionState::Closed {
                *state = SessionState::Closing;
            }
        }
        self.cancel.cancel();
    }

    /// Completes once the session is shutting down
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Queue a uniqueId token for the outbound flow
    ///
    /// Never blocks: a full channel surfaces as an explicit capacity error
    /// so a slow peer cannot pile up unbounded work.
    pub fn enqueue(&self, unique_id: &str) -> Result<()> {
        use tokio::sync::mpsc::error::TrySendError;
        self.outbound_tx
            .try_send(unique_id.to_string())
            .map_err(|e| match e {
                TrySendError::Full(_) => {
                    VoltgateError::OutboundFull(self.context.device_id.clone())
                }
                TrySendError::Closed(_) => {
                    VoltgateError::SessionClosed(self.context.device_id.clone())
                }
            })
    }
}

/// All live sessions keyed by device identifier
///
/// The map's entry API makes the already-connected check and the insert one
/// atomic step, so two racing upgrades for the same device cannot both
/// register.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the device identifier for this session
    pub fn register(&self, session: Arc<Session>) -> Result<()> {
        match self.sessions.entry(session.device_id().to_string()) {
            Entry::Occupied(_) => Err(VoltgateError::DeviceAlreadyConnected(
                session.device_id().to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(())
            }
        }
    }

    /// Release a device identifier, but only for the exact session given
    ///
    /// A session that lost its slot must not evict a replacement that
    /// registered after it.
    pub fn remove(&self, device_id: &str, session: &Arc<Session>) {
        self.sessions
            .remove_if(device_id, |_, live| Arc::ptr_eq(live, session));
    }

    pub fn get(&self, device_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .get(device_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
