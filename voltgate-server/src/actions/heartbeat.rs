//! Heartbeat: periodic liveness ping from the charge point.

use chrono::Utc;

use voltgate_protocol::{Call, CallResult, Frame, Payload};

use super::protocol_timestamp;
use crate::dispatch::{HandlerOutcome, HandlerResult};
use crate::session::SessionContext;

/// Response payload carrying the central system's clock
#[derive(Debug, Clone)]
pub struct HeartbeatResponse {
    pub current_time: String,
}

impl HeartbeatResponse {
    pub fn now() -> Self {
        Self {
            current_time: protocol_timestamp(Utc::now()),
        }
    }

    pub fn into_payload(self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("currentTime".into(), self.current_time.into());
        payload
    }
}

/// Answer a Heartbeat request with the current time
pub fn handle(_ctx: &SessionContext, call: &Call) -> HandlerResult {
    Ok(HandlerOutcome::respond(Frame::CallResult(CallResult::new(
        call.unique_id.clone(),
        HeartbeatResponse::now().into_payload(),
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_has_only_current_time() {
        let payload = HeartbeatResponse::now().into_payload();
        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        assert_eq!(keys, ["currentTime"]);
    }

    #[test]
    fn test_handle_echoes_unique_id() {
        let ctx = SessionContext::new("CP-1", true, 300);
        let call = Call::new("hb-1", super::super::HEARTBEAT);

        let outcome = handle(&ctx, &call).unwrap();
        assert!(outcome.keep_open);
        let Some(Frame::CallResult(result)) = outcome.response else {
            panic!("expected a CallResult response");
        };
        assert_eq!(result.unique_id, "hb-1");
        assert!(result.payload.contains_key("currentTime"));
    }
}
