//! Gateway server setup
//!
//! Routes, state construction and the serve loop with graceful shutdown.

mod admin;
mod backends;
mod error;
mod handler;
mod state;

pub use admin::{
    close_connection, health_check, online_users, send_message, CloseRequest, OnlineUsers,
    SendRequest, StatusResponse,
};
pub use backends::{build_backends, GatewayStorage, LocalBroker};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use handler::{gateway_handler, ConnectParams};
pub use state::GatewayState;

use crate::router::MessageRouter;
use axum::{
    routing::{get, post},
    Router,
};
use relay_common::{
    AppConfig, AppError, AppResult, AuthConfig, AuthMode, Authenticator, JwtAuthenticator,
    RelayConfig, TrustedAuthenticator,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/health", get(health_check))
        .route("/online", get(online_users))
        .route("/send", post(send_message))
        .route("/close", post(close_connection))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the authenticator selected by `AUTH_MODE`
pub fn build_authenticator(auth: &AuthConfig) -> AppResult<Arc<dyn Authenticator>> {
    match auth.mode {
        AuthMode::Jwt => {
            let secret = auth
                .jwt_secret
                .as_deref()
                .ok_or_else(|| AppError::Config("JWT_SECRET is required in jwt mode".to_string()))?;
            Ok(Arc::new(JwtAuthenticator::new(secret)))
        }
        AuthMode::Trusted => {
            tracing::warn!("AUTH_MODE=trusted: clients choose their own identity");
            Ok(Arc::new(TrustedAuthenticator))
        }
    }
}

/// State backed entirely by process memory
pub fn create_memory_state(authenticator: Arc<dyn Authenticator>, relay: RelayConfig) -> GatewayState {
    let router = MessageRouter::new_shared(
        Arc::new(GatewayStorage::in_memory()),
        Arc::new(LocalBroker),
        &relay,
    );
    GatewayState::new(router, authenticator, relay)
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: &AppConfig) -> AppResult<GatewayState> {
    let authenticator = build_authenticator(&config.auth)?;
    let (storage, broker) = build_backends(config).await?;
    let router = MessageRouter::new_shared(storage, broker, &config.relay);

    Ok(GatewayState::new(router, authenticator, config.relay.clone()))
}

/// Run the gateway server until ctrl-c, then close every connection
pub async fn run_server(app: Router, addr: &str, router: Arc<MessageRouter>) -> AppResult<()> {
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(router))
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

async fn shutdown_signal(router: Arc<MessageRouter>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
    router.shutdown();
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> AppResult<()> {
    let addr = config.gateway.address();

    let state = create_gateway_state(&config).await?;
    let router = state.router().clone();

    let app = create_app(state);

    run_server(app, &addr, router).await
}
