/// clipstream - account and session service
///
/// Registers accounts, authenticates credentials, issues and rotates paired
/// access/refresh tokens, and serves channel/watch-history views for the
/// clipstream media-sharing platform.

mod account;
mod api;
mod auth;
mod blob_store;
mod config;
mod context;
mod db;
mod error;
mod password;
mod query;
mod server;
mod token;
mod validation;

use config::ServerConfig;
use context::AppContext;
use error::AppResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipstream=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("clipstream account service v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env()?;

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}
