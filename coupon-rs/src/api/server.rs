//! API Server - HTTP server for the coupon REST API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::{self, AppState};
use crate::coupon::QuotaEngine;
use crate::error::Result;

/// API Server configuration
pub struct ApiServer {
    state: Arc<AppState>,
    addr: String,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(engine: QuotaEngine, addr: String) -> Self {
        let state = Arc::new(AppState { engine });
        Self { state, addr }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Start the API server
    pub async fn run(&self) -> Result<()> {
        let router = self.router();

        info!("Starting API server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

/// Build the API router over shared state
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/coupons",
            get(handlers::list_coupons).post(handlers::create_coupon),
        )
        .route("/coupons/:code", get(handlers::get_coupon))
        .route("/coupons/:code/verify", get(handlers::verify_coupon))
        .route("/coupons/:code/apply", post(handlers::apply_coupon))
        .route(
            "/limits",
            get(handlers::get_limits).put(handlers::update_limits),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
