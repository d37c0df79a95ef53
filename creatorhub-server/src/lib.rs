//! creatorhub-server library
//!
//! HTTP service for the creator management platform: sessions and
//! role-gated routing, per-domain CRUD endpoints, privileged functions
//! under `/functions/v1/*`, outbound email with retry, and file buckets.

pub mod api;
pub mod db;
pub mod email;
pub mod error;
pub mod routing;
pub mod scheduler;
pub mod services;
pub mod storage;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use creatorhub_common::config::ServerConfig;

use crate::email::Mailer;
use crate::storage::Storage;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved configuration
    pub config: Arc<ServerConfig>,
    /// Outbound email transport
    pub mailer: Arc<dyn Mailer>,
    /// Contract and content buckets
    pub storage: Storage,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: ServerConfig,
        mailer: Arc<dyn Mailer>,
        storage: Storage,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mailer,
            storage,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Health, sign-in, invitation redemption and application intake are
/// public; every other route runs behind the session middleware.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let protected = Router::new()
        .merge(api::auth_routes())
        .merge(api::profile_routes())
        .merge(api::application_routes())
        .merge(api::access_routes())
        .merge(api::onboarding_routes())
        .merge(api::availability_routes())
        .merge(api::meeting_routes())
        .merge(api::contract_routes())
        .merge(api::invoice_routes())
        .merge(api::content_routes())
        .merge(api::support_routes())
        .merge(api::notification_routes())
        .merge(api::team_routes())
        .merge(api::admin_routes())
        .merge(api::function_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_middleware,
        ));

    let public = Router::new()
        .merge(api::health_routes())
        .merge(api::public_auth_routes())
        .merge(api::public_application_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
