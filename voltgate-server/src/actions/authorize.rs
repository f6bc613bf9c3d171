//! Authorize: the charge point asks whether an idTag may be serviced.

use serde_json::Value;

use voltgate_protocol::{Call, CallResult, Frame, Payload};

use crate::dispatch::{HandlerOutcome, HandlerResult};
use crate::session::SessionContext;

/// idTagInfo verdict returned to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Accepted,
    Invalid,
}

impl AuthorizationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Invalid => "Invalid",
        }
    }
}

fn id_tag_info_payload(status: AuthorizationStatus) -> Payload {
    let mut info = Payload::new();
    info.insert("status".into(), status.as_str().into());
    let mut payload = Payload::new();
    payload.insert("idTagInfo".into(), Value::Object(info));
    payload
}

/// Answer an Authorize request
///
/// A session whose device failed the connection-time authorization hook is
/// answered `Invalid` and then closed; this is the explicit
/// handler-requested close path.
pub fn handle(ctx: &SessionContext, call: &Call) -> HandlerResult {
    let (status, keep_open) = if ctx.authorized {
        (AuthorizationStatus::Accepted, true)
    } else {
        (AuthorizationStatus::Invalid, false)
    };
    let response = Frame::CallResult(CallResult::new(
        call.unique_id.clone(),
        id_tag_info_payload(status),
    ));
    Ok(if keep_open {
        HandlerOutcome::respond(response)
    } else {
        HandlerOutcome::respond_and_close(response)
    })
}
