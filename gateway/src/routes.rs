use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use country_data::resolve::{feature_styles, FeatureStyle};
use country_data::session::SessionStatus;
use country_data::{resolve, CountryKey, Destination, PassportResolver, PassportSource, Resolution, Session};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::ApiError;
use crate::geocode::Geocoder;

/// The one session every task and handler shares
pub type SharedSession = Arc<RwLock<Session>>;

#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
    pub geocoder: Arc<Geocoder>,
    pub resolver: Arc<PassportResolver>,
}

#[derive(Deserialize)]
pub struct PassportRequest {
    pub passport: String,
}

#[derive(Deserialize)]
pub struct LocateRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize)]
pub struct LocateResponse {
    /// Whether the located country became the passport
    pub applied: bool,
    pub passport: CountryKey,
    pub city: Option<String>,
    pub passport_source: PassportSource,
}

/// Health, API and middleware, without static files
pub fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/status", get(status))
        .route("/resolve", get(resolve_none))
        .route("/resolve/:key", get(resolve_key))
        .route("/destinations", get(destinations))
        .route("/colors", get(colors))
        .route("/borders", get(borders))
        .route("/passport", put(select_passport))
        .route("/locate", post(locate))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "visa-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.session.read().await.status())
}

async fn resolve_none(State(state): State<AppState>) -> Json<Resolution> {
    Json(resolve(&*state.session.read().await, None))
}

async fn resolve_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Resolution>, ApiError> {
    let key = parse_key(&key)?;
    Ok(Json(resolve(&*state.session.read().await, Some(&key))))
}

async fn destinations(State(state): State<AppState>) -> Json<Vec<Destination>> {
    Json(state.session.read().await.available_destinations())
}

async fn colors(State(state): State<AppState>) -> Json<BTreeMap<CountryKey, FeatureStyle>> {
    Json(feature_styles(&*state.session.read().await))
}

async fn borders(
    State(state): State<AppState>,
) -> Result<Json<geojson::FeatureCollection>, ApiError> {
    let session = state.session.read().await;
    session
        .borders()
        .map(|b| Json(b.collection().clone()))
        .ok_or_else(|| ApiError::not_found("Border polygons are not loaded"))
}

async fn select_passport(
    State(state): State<AppState>,
    Json(request): Json<PassportRequest>,
) -> Result<Json<SessionStatus>, ApiError> {
    let key = parse_key(&request.passport)?;
    let mut session = state.session.write().await;
    session.select_passport(key);
    Ok(Json(session.status()))
}

async fn locate(
    State(state): State<AppState>,
    Json(request): Json<LocateRequest>,
) -> Result<Json<LocateResponse>, ApiError> {
    let LocateRequest {
        latitude,
        longitude,
    } = request;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ApiError::bad_request(format!(
            "Coordinates out of range: ({}, {})",
            latitude, longitude
        )));
    }

    // Skip the geocoder once a located or chosen passport is in place
    let accepts = state.session.read().await.accepts_location();
    let guess = if accepts {
        let hint = state.geocoder.locate(latitude, longitude).await;
        hint.and_then(|hint| state.resolver.resolve(&hint))
    } else {
        None
    };

    // Re-checked under the write lock: a selection may have landed meanwhile
    let mut session = state.session.write().await;
    let applied = match guess {
        Some(guess) => session.apply_location(guess),
        None => false,
    };
    if applied {
        info!("Default passport set to {} from location", session.passport());
    }

    Ok(Json(LocateResponse {
        applied,
        passport: session.passport().clone(),
        city: session.city().map(str::to_string),
        passport_source: session.passport_source(),
    }))
}

fn parse_key(raw: &str) -> Result<CountryKey, ApiError> {
    CountryKey::parse(raw).ok_or_else(|| {
        ApiError::bad_request(format!("Invalid country key {:?}: expected three letters", raw))
    })
}
