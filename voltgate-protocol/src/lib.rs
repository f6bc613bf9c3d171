//! voltgate-protocol: OCPP-J wire frame definitions
//!
//! This crate defines the three frame kinds carried over a charge point
//! socket (`Call`, `CallResult`, `CallError`), their variable-arity JSON
//! array encoding, and the cheap identity peek used to route a raw frame
//! before committing to a specific variant. It performs no I/O.

pub mod codec;
pub mod error_code;
pub mod frame;

// Re-export main types at crate root
pub use codec::{peek_identity, CodecError};
pub use frame::{Call, CallError, CallResult, Frame, MessageType, Payload};
