//! Built-in OCPP actions: payload builders and the default handler set.

pub mod authorize;
pub mod boot_notification;
pub mod heartbeat;
pub mod trigger_message;

use chrono::{DateTime, Utc};

use crate::dispatch::HandlerRegistry;

/// Action names understood by the default registry
pub const BOOT_NOTIFICATION: &str = "BootNotification";
pub const HEARTBEAT: &str = "Heartbeat";
pub const AUTHORIZE: &str = "Authorize";
pub const TRIGGER_MESSAGE: &str = "TriggerMessage";

/// Timestamp format used in protocol payloads
pub(crate) fn protocol_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Build the registry wired with the built-in handlers
///
/// Inbound calls: BootNotification, Heartbeat, Authorize. Responses to
/// locally initiated calls: TriggerMessage. Error frames fall through to
/// the registry's logging catch-all.
pub fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register_call(BOOT_NOTIFICATION, boot_notification::handle);
    registry.register_call(HEARTBEAT, heartbeat::handle);
    registry.register_call(AUTHORIZE, authorize::handle);
    registry.register_result(TRIGGER_MESSAGE, trigger_message::handle_result);
    registry
}
