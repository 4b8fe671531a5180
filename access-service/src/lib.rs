pub mod acl;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    extract::{OriginalUri, State},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use tower_http::trace::TraceLayer;

use crate::acl::Acl;
use crate::config::AccessConfig;
use crate::middleware::{metrics_middleware, session_middleware};
use crate::services::{AuthService, MemberRepository, SessionStore, SessionTokenService};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AccessConfig,
    /// Rule book shared by all requests; each request extends a clone.
    pub acl: Arc<Acl>,
    pub repository: Arc<dyn MemberRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub tokens: Arc<SessionTokenService>,
    pub auth_service: AuthService,
}

impl AppState {
    pub fn new(
        config: AccessConfig,
        acl: Acl,
        repository: Arc<dyn MemberRepository>,
        sessions: Arc<dyn SessionStore>,
        tokens: SessionTokenService,
    ) -> Self {
        Self {
            config,
            acl: Arc::new(acl),
            auth_service: AuthService::new(repository.clone()),
            repository,
            sessions,
            tokens: Arc::new(tokens),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/login", post(handlers::session::login))
        .route("/logout", post(handlers::session::logout))
        .route("/me", get(handlers::session::me))
        .route("/acl/check", get(handlers::access::check))
        .route("/photo/album/:id", get(handlers::access::album))
        .route("/page/:slug", get(handlers::access::page))
        .layer(from_fn_with_state(state.clone(), session_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .merge(session_routes)
        .fallback(route_not_found)
        .with_state(state)
        // Add metrics middleware
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        // Add security headers middleware
        .layer(from_fn(security_headers_middleware))
}

/// Service health check
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "session_signing": if state.tokens.can_sign() { "up" } else { "down" },
            "session_verification": if state.tokens.can_verify() { "up" } else { "down" },
        }
    }))
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::RouteNotFound(uri.path().to_string())
}
