//! Common utilities shared across the voltgate crates.
//!
//! Provides the unified error type, tracing-based logging setup, and
//! XDG-compliant path helpers.

pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Result, VoltgateError};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogOutput};
