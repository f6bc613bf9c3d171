//! TriggerMessage: the server-initiated request asking a device to send a
//! specific message on its own.

use serde_json::Value;
use tracing::info;

use voltgate_protocol::{Call, CallResult, Payload};

use crate::dispatch::{HandlerOutcome, HandlerResult};
use crate::session::SessionContext;

/// The messages a device can be asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMessageKind {
    BootNotification,
    DiagnosticsStatusNotification,
    FirmwareStatusNotification,
    Heartbeat,
    MeterValues,
    StatusNotification,
}

impl TriggerMessageKind {
    /// Sanitize a requested message name against the whitelist
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "BootNotification" => Some(Self::BootNotification),
            "DiagnosticsStatusNotification" => Some(Self::DiagnosticsStatusNotification),
            "FirmwareStatusNotification" => Some(Self::FirmwareStatusNotification),
            "Heartbeat" => Some(Self::Heartbeat),
            "MeterValues" => Some(Self::MeterValues),
            "StatusNotification" => Some(Self::StatusNotification),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BootNotification => "BootNotification",
            Self::DiagnosticsStatusNotification => "DiagnosticsStatusNotification",
            Self::FirmwareStatusNotification => "FirmwareStatusNotification",
            Self::Heartbeat => "Heartbeat",
            Self::MeterValues => "MeterValues",
            Self::StatusNotification => "StatusNotification",
        }
    }
}

/// Verdict a device returns for a TriggerMessage request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMessageStatus {
    Accepted,
    Rejected,
    NotImplemented,
}

impl TriggerMessageStatus {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Accepted" => Some(Self::Accepted),
            "Rejected" => Some(Self::Rejected),
            "NotImplemented" => Some(Self::NotImplemented),
            _ => None,
        }
    }
}

/// Request payload for a TriggerMessage call
#[derive(Debug, Clone, Copy)]
pub struct TriggerMessageRequest {
    pub requested: TriggerMessageKind,
    /// Connector addressed by the request; omitted from the wire when zero
    pub connector_id: u32,
}

impl TriggerMessageRequest {
    pub fn new(requested: TriggerMessageKind, connector_id: u32) -> Self {
        Self {
            requested,
            connector_id,
        }
    }

    pub fn into_payload(self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("requestedMessage".into(), self.requested.as_str().into());
        if self.connector_id > 0 {
            payload.insert("connectorId".into(), self.connector_id.into());
        }
        payload
    }
}

/// Build the Call frame for a server-initiated trigger
pub fn build_call(unique_id: impl Into<String>, request: TriggerMessageRequest) -> Call {
    Call::with_payload(unique_id, super::TRIGGER_MESSAGE, request.into_payload())
}

/// Finalize a TriggerMessage exchange once the device answers
pub fn handle_result(_ctx: &SessionContext, result: &CallResult) -> HandlerResult {
    let status = result
        .payload
        .get("status")
        .and_then(Value::as_str)
        .and_then(TriggerMessageStatus::from_name);
    info!(unique_id = %result.unique_id, status = ?status, "trigger message answered");
    Ok(HandlerOutcome::silent())
}
