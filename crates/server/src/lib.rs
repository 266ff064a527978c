//! Server crate provides the HTTP API of the marketplace.
//!
//! This module wires the usecases behind an axum [`Router`]: account and
//! catalog endpoints, the order lifecycle, bank accounts, feedback and the
//! payment-gateway webhook, plus health and Prometheus metrics endpoints.

mod auth;
mod handlers;
mod metrics;
mod response;
mod views;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;
use service::{
    AccountService, BankAccountService, CatalogService, FeedbackService, OrderService,
    TokenManager,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use handlers::{account, bank_accounts, catalog, feedbacks, orders};
use metrics::Metrics;

/// The usecases served over HTTP.
#[derive(Clone)]
pub struct Services {
    pub accounts: Arc<dyn AccountService>,
    pub catalog: Arc<dyn CatalogService>,
    pub orders: Arc<dyn OrderService>,
    pub bank_accounts: Arc<dyn BankAccountService>,
    pub feedbacks: Arc<dyn FeedbackService>,
}

/// Application state shared between request handlers
#[derive(Clone)]
pub(crate) struct AppState {
    services: Services,
    tokens: TokenManager,
    metrics: Arc<Metrics>,
}

/// Server represents the HTTP server of the marketplace.
pub struct Server {
    port: u16,
    webhook_path: String,
    shutdown_timeout: Duration,
    state: AppState,
}

impl Server {
    /// Creates a new Server instance.
    ///
    /// # Arguments
    ///
    /// * `port` - The port on which the server will listen
    /// * `services` - The usecases behind the endpoints
    /// * `tokens` - Verifies bearer tokens of authenticated endpoints
    /// * `webhook_path` - Path segment under `/v1/` of the payment callback
    /// * `shutdown_timeout` - How long in-flight requests may take after a shutdown signal
    pub fn new(
        port: u16,
        services: Services,
        tokens: TokenManager,
        webhook_path: impl Into<String>,
        shutdown_timeout: Duration,
    ) -> Result<Self> {
        info!("Initializing HTTP server on port {}", port);
        let metrics = Metrics::new().context("Failed to register metrics")?;

        Ok(Self {
            port,
            webhook_path: webhook_path.into().trim_matches('/').to_string(),
            shutdown_timeout,
            state: AppState {
                services,
                tokens,
                metrics: Arc::new(metrics),
            },
        })
    }

    /// Starts the server and blocks until it's shut down.
    pub async fn start(&self) -> Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .await
            .context("Failed to bind to port")?;

        info!("HTTP server listening on port {}", self.port);

        let (stopping_tx, mut stopping_rx) = watch::channel(false);
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = stopping_tx.send(true);
            })
            .into_future();
        let deadline = async {
            let _ = stopping_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(self.shutdown_timeout).await;
        };

        tokio::select! {
            result = serve => result.context("Server error")?,
            _ = deadline => {
                warn!("In-flight requests did not finish within {:?}", self.shutdown_timeout);
                return Ok(());
            }
        }

        info!("HTTP server shut down gracefully");
        Ok(())
    }

    /// Builds the router with every endpoint and middleware.
    pub fn router(&self) -> Router {
        let metrics = self.state.metrics.clone();
        let webhook = format!("/v1/{}", self.webhook_path);

        Router::new()
            .route("/", get(Self::handle_greeting))
            .route("/health", get(Self::handle_health))
            .route("/metrics", get(Self::handle_metrics))
            .route("/v1/register", post(account::handle_register))
            .route("/v1/login", post(account::handle_login))
            .route(
                "/v1/account",
                get(account::handle_get_account).put(account::handle_update_account),
            )
            .route("/v1/account/password", put(account::handle_reset_password))
            .route(
                "/v1/services",
                get(catalog::handle_list_services).post(catalog::handle_create_service),
            )
            .route(
                "/v1/services/{id}",
                get(catalog::handle_find_service)
                    .put(catalog::handle_update_service)
                    .delete(catalog::handle_delete_service),
            )
            .route(
                "/v1/orders",
                get(orders::handle_list_orders).post(orders::handle_create_order),
            )
            .route("/v1/orders/{id}/accept", post(orders::handle_accept_order))
            .route("/v1/orders/{id}/complete", post(orders::handle_complete_order))
            .route("/v1/orders/{id}/cancel", post(orders::handle_cancel_order))
            .route(
                "/v1/bank-accounts",
                get(bank_accounts::handle_get_bank_accounts)
                    .post(bank_accounts::handle_create_bank_account)
                    .put(bank_accounts::handle_update_bank_account),
            )
            .route(
                "/v1/feedbacks",
                get(feedbacks::handle_list_feedbacks).post(feedbacks::handle_create_feedback),
            )
            .route(&webhook, post(orders::handle_payment_notification))
            .layer(axum::middleware::from_fn_with_state(metrics, metrics::track))
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(Self::handle_panic))
            .with_state(self.state.clone())
    }

    async fn handle_greeting() -> Json<serde_json::Value> {
        Json(json!({ "message": "Welcome!" }))
    }

    async fn handle_health() -> &'static str {
        "OK"
    }

    async fn handle_metrics(State(state): State<AppState>) -> Response {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();

        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&state.metrics.registry.gather(), &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
        }

        match String::from_utf8(buffer) {
            Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
            Err(e) => {
                error!("Failed to convert metrics to UTF-8: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Invalid metrics data").into_response()
            }
        }
    }

    fn handle_panic(_: Box<dyn std::any::Any + Send + 'static>) -> Response {
        error!("Handler panicked");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "internal server error", "error": "internal server error" })),
        )
            .into_response()
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
