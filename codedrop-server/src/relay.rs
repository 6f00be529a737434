use crate::config::RelayConfig;
use crate::diagnostics::{connections, health};
use crate::signaling::{SignalingService, ws_handler};
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// HTTP surface of the relay: `/ws`, `/health`, `/connections`.
pub fn router(service: SignalingService) -> Router {
    // browser clients are served from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/connections", get(connections))
        .layer(cors)
        .with_state(service)
}

/// Bind, start the expiry sweeper and serve until Ctrl-C.
pub async fn run_relay(config: RelayConfig) -> Result<()> {
    let service = SignalingService::new(config.session_max_age, config.ice_servers.clone());
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    serve(listener, service, config, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    service: SignalingService,
    config: RelayConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    let sweeper = service.spawn_sweeper(config.sweep_interval);

    info!(
        "Signaling relay listening on http://{} (session max age {:?})",
        addr, config.session_max_age
    );

    let result = axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("relay server failed");

    sweeper.abort();
    info!("Signaling relay stopped");
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        // never resolve: keep serving
        std::future::pending::<()>().await;
    }
}
