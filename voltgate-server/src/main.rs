//! Daemon entry point: logging, config, then the accept loop.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use voltgate_server::actions;
use voltgate_server::auth::TokenAuthorizer;
use voltgate_server::config::ServerConfig;
use voltgate_server::http::{self, AppState};
use voltgate_server::session::SessionRegistry;
use voltgate_utils::{init_logging, paths, Result};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(paths::config_file);
    let config = Arc::new(ServerConfig::load_or_default(&config_path)?);
    info!(
        path = %config_path.display(),
        devices = config.devices.len(),
        "configuration loaded"
    );

    let listen_addr = config.listen_addr.clone();
    let state = AppState {
        registry: Arc::new(actions::default_registry()),
        sessions: Arc::new(SessionRegistry::new()),
        authorizer: Arc::new(TokenAuthorizer::new(Arc::clone(&config))),
        config,
    };

    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(addr = %listen_addr, "voltgate listening");
    axum::serve(listener, router).await?;
    Ok(())
}
