//! # sirbro-server
//!
//! Web front door of the SirBro app.
//!
//! This binary provides:
//! - **Invite links** (`/invite/*`, `/channels/*`) that try to open the app
//!   and fall back to the store pages
//! - **Magic login** (`/magic-auth`) handing an exchanged session to the app,
//!   and the admin variant (`/magic-verify`) setting dashboard cookies
//! - **App-link verification** files for iOS and Android
//! - **Admin API proxy** to the SirBro REST API
//! - **Per-IP rate limiting** on the auth endpoints

mod api;
mod config;
mod error;
mod links;
mod locale;
mod pages;
mod rate_limit;
mod upstream;
mod well_known;

use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sirbro_server=debug")),
        )
        .init();

    info!("Starting SirBro web server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    if let Err(e) = config.validate() {
        warn!(error = %e, "Deep links will use built-in defaults");
    }
    let deep_link = config.deep_link_config();
    info!(
        scheme = %deep_link.app_custom_scheme,
        host = %config.public_host(),
        api = %config.api_base_url,
        fallback_ms = config.fallback_delay.as_millis() as u64,
        auto_store_redirect = config.auto_store_redirect,
        download_platforms = ?deep_link.download_platforms(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let rate_limiter = RateLimiter::per_minute(config.auth_rate_per_minute, config.auth_rate_burst);
    let http_addr = config.http_addr;
    let app_state = AppState::new(config, rate_limiter.clone())?;

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Evict rate-limit buckets idle for 10 minutes, checked every 5.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.purge_stale(Duration::from_secs(600)).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP server until it fails or Ctrl+C
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
