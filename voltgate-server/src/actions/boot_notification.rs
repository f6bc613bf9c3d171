//! BootNotification: the opening request every charge point sends.

use chrono::Utc;

use voltgate_protocol::{Call, CallResult, Frame, Payload};

use super::protocol_timestamp;
use crate::dispatch::{HandlerOutcome, HandlerResult};
use crate::session::SessionContext;

/// Registration verdict returned to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Accepted,
    Pending,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Pending => "Pending",
            Self::Rejected => "Rejected",
        }
    }
}

/// Response payload for a BootNotification request
#[derive(Debug, Clone)]
pub struct BootNotificationResponse {
    pub status: RegistrationStatus,
    pub current_time: String,
    pub heartbeat_interval: u64,
}

impl BootNotificationResponse {
    pub fn new(status: RegistrationStatus, heartbeat_interval: u64) -> Self {
        Self {
            status,
            current_time: protocol_timestamp(Utc::now()),
            heartbeat_interval,
        }
    }

    pub fn into_payload(self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("status".into(), self.status.as_str().into());
        payload.insert("currentTime".into(), self.current_time.into());
        payload.insert("heartbeatInterval".into(), self.heartbeat_interval.into());
        payload
    }
}

/// Answer a BootNotification request
///
/// An unauthorized device is not cut off; it gets `Pending` through the
/// protocol and the socket stays open.
pub fn handle(ctx: &SessionContext, call: &Call) -> HandlerResult {
    let status = if ctx.authorized {
        RegistrationStatus::Accepted
    } else {
        RegistrationStatus::Pending
    };
    let response = BootNotificationResponse::new(status, ctx.heartbeat_interval);
    Ok(HandlerOutcome::respond(Frame::CallResult(CallResult::new(
        call.unique_id.clone(),
        response.into_payload(),
    ))))
}
