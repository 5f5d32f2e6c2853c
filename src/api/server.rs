//! Axum server setup and configuration

use crate::api::routes;
use crate::db::Database;
use crate::services::Discovery;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    /// Same instance the scheduled loop runs, so manual and scheduled passes share one guard
    pub discovery: Arc<Discovery>,
}

impl AppState {
    pub fn new(db: Arc<Database>, discovery: Arc<Discovery>) -> Self {
        Self { db, discovery }
    }
}

/// Create the Axum application with all routes
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::control::health))
        .route("/run-once", post(routes::control::run_once))
        .route("/positions", get(routes::positions::list_positions))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
