//! Visa Gateway
//!
//! Serves visa requirements, country facts and map colors for the current
//! passport. The three feeds load in the background after the listener is
//! up; until they land, lookups answer with unknown verdicts.

use anyhow::{Context, Result};
use country_data::{PassportResolver, Session};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod feeds;
mod geocode;
mod routes;
#[cfg(test)]
mod testing;

use config::GatewayConfig;
use feeds::{FeedClient, FeedSources};
use geocode::Geocoder;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "visa_gateway=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env();
    tracing::info!(
        "   Default passport: {} ({})",
        config.default_passport,
        config.default_city.as_deref().unwrap_or("no city")
    );

    let session = Arc::new(RwLock::new(Session::with_default(
        config.default_passport.clone(),
        config.default_city.clone(),
    )));

    let client = Arc::new(
        FeedClient::new(config.feed_timeout_secs).context("creating feed client")?,
    );
    let sources = FeedSources {
        borders: config.borders.clone(),
        matrix: config.matrix.clone(),
        facts: config.facts.clone(),
    };
    // Handles are dropped; each task reports through the session slots
    feeds::spawn_feed_loads(client, sources, session.clone());

    let geocoder = Geocoder::new(config.geocoder).context("creating geocoder")?;
    tracing::info!("   Geocoder: {:?}", geocoder.provider());

    let state = AppState {
        session,
        geocoder: Arc::new(geocoder),
        resolver: Arc::new(PassportResolver::default()),
    };

    let api_routes = routes::app(state);

    // Static file serving for the web UI (if built)
    let app = if config.static_dir.exists() {
        tracing::info!("   Serving UI from {}", config.static_dir.display());
        api_routes.fallback_service(ServeDir::new(&config.static_dir))
    } else {
        tracing::warn!("   UI not found at {}", config.static_dir.display());
        api_routes
    };

    let addr = config.bind_addr();
    tracing::info!("Visa Gateway starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
