//! voltgate-server: the OCPP-J central-system endpoint.
//!
//! Charge points upgrade `GET /ocpp/{device_id}` to a persistent WebSocket
//! and exchange JSON-array frames with the dispatcher; operators reach the
//! admin API for message and device status and to issue server-initiated
//! calls. See the module docs for the moving parts:
//!
//! - [`config`]: TOML device table, loaded once at startup
//! - [`correlation`]: per-session table resolving response frames to actions
//! - [`dispatch`]: the (direction, action) handler registry
//! - [`actions`]: built-in handlers and payload builders
//! - [`session`]: per-connection state, flow pair, live-session registry
//! - [`auth`]: pluggable authorization hook
//! - [`http`]: axum router, upgrade endpoint plus admin surface

pub mod actions;
pub mod auth;
pub mod config;
pub mod correlation;
pub mod dispatch;
pub mod http;
pub mod session;
