//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use ledger_types::{ApiKeyRepository, LedgerRepository};

use super::auth::auth_middleware;
use super::handlers::{self, AppState};
use crate::PaymentService;

/// HTTP Server for the Ledger API.
pub struct HttpServer<R: LedgerRepository + ApiKeyRepository> {
    state: Arc<AppState<R>>,
}

impl<R: LedgerRepository + ApiKeyRepository> HttpServer<R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: PaymentService<R>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api-docs/openapi.json", get(handlers::openapi_json))
            .route("/v1/keys", post(handlers::create_api_key::<R>))
            .route(
                "/v1/accounts",
                get(handlers::list_accounts::<R>).post(handlers::create_account::<R>),
            )
            .route(
                "/v1/payments",
                get(handlers::list_payments::<R>).post(handlers::create_payment::<R>),
            )
            .route("/v1/payments/{id}", get(handlers::get_payment::<R>))
            .route(
                "/v1/payments/{id}/approve",
                put(handlers::approve_payment::<R>),
            )
            .route(
                "/v1/payments/{id}/cancel",
                put(handlers::cancel_payment::<R>),
            )
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R>,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
