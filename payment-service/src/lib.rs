pub mod config;
pub mod handlers;
pub mod models;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{Database, HeuristicMatcher, TronClient, VerificationService};

/// Shared application state. All collaborators are constructed once in
/// [`Application::build`] and passed by handle; nothing lives at module load.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub verification: VerificationService,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;
        db.run_migrations().await?;

        let tron = TronClient::new(config.tron.clone());
        let verification = VerificationService::new(
            Arc::new(tron),
            Arc::new(HeuristicMatcher),
            db.clone(),
            config.tron.platform_address.clone(),
        );

        let state = AppState { db, verification };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            // Combined submission/decision endpoint used by the dashboard
            .route("/api/process-payment", post(handlers::payments::process_payment))
            // Verification endpoint
            .route("/api/verifyPayment", post(handlers::verify::verify_payment))
            // Direct ledger writers
            .route("/api/payments/submit-tx", post(handlers::payments::submit_tx))
            .route(
                "/api/payments/manual-receipt",
                post(handlers::payments::manual_receipt),
            )
            // Subscription status
            .route(
                "/api/subscriptions/status",
                get(handlers::subscriptions::status),
            )
            // Admin review surface
            .route("/api/admin/payments", get(handlers::admin::list_review_queue))
            .route(
                "/api/admin/payments/:id/review",
                post(handlers::admin::review_payment),
            )
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
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
                }),
            )
            .with_state(state.clone());

        // Bind here so tests can request a random port (port 0).
        let listener =
            TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
        let port = listener.local_addr()?.port();

        tracing::info!("Payment service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a handle to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
