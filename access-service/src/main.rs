use access_service::{
    acl::default_acl,
    build_router,
    config::AccessConfig,
    services::{MemoryRepository, MemorySessionStore, SessionTokenService},
    AppState,
};
use service_core::error::AppError;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = AccessConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.common.otlp_endpoint.as_deref(),
    );

    access_service::services::metrics::init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting access service"
    );

    let acl = default_acl().map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
    tracing::info!(roles = acl.roles().count(), "Access control list built");

    let repository = match MemoryRepository::load(&config.member_seed_path) {
        Ok(repository) => repository,
        Err(e) if !config.is_prod() => {
            tracing::warn!(error = %e, "No member seed loaded, starting with an empty repository");
            MemoryRepository::new()
        }
        Err(e) => return Err(AppError::ConfigError(e)),
    };

    let tokens = SessionTokenService::new(&config.session, config.is_prod());
    if !tokens.can_sign() || !tokens.can_verify() {
        tracing::error!("Session keys unavailable, long-lived sessions are disabled");
    }

    let state = AppState::new(
        config.clone(),
        acl,
        Arc::new(repository),
        Arc::new(MemorySessionStore::new()),
        tokens,
    );
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
