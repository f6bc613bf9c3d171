//! Authorization hook consulted at the upgrade boundary.
//!
//! The decision logic is pluggable; the core only consumes an accept/reject
//! verdict and carries it in the session context. A rejected device still
//! gets a session: the protocol answers its requests with rejection
//! statuses instead of refusing the socket.

use std::sync::Arc;

use crate::config::ServerConfig;

/// Decides whether a connecting device counts as authorized
pub trait Authorizer: Send + Sync {
    fn authorize(&self, device_id: &str, presented_token: Option<&str>) -> bool;
}

/// Compare the presented token against the device's configured token
pub struct TokenAuthorizer {
    config: Arc<ServerConfig>,
}

impl TokenAuthorizer {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self { config }
    }
}

impl Authorizer for TokenAuthorizer {
    fn authorize(&self, device_id: &str, presented_token: Option<&str>) -> bool {
        match (self.config.device(device_id), presented_token) {
            (Some(device), Some(token)) => device.auth_token == token,
            _ => false,
        }
    }
}

/// Accept everything; for tests and closed networks
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _device_id: &str, _presented_token: Option<&str>) -> bool {
        true
    }
}
