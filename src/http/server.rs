//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router for the service surface
//! - Wire up telemetry interceptors, timeouts and request tracing
//! - Serve on a bound listener until shutdown

use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::middleware;
use crate::telemetry::Telemetry;

/// HTTP server for the pizza service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServiceConfig, telemetry: &Telemetry) -> Self {
        Self {
            router: Self::build_router(config, telemetry),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, telemetry: &Telemetry) -> Router {
        let routes = Router::new()
            .route("/", get(welcome))
            .fallback(unknown_endpoint);

        middleware::instrument(routes, telemetry)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// The assembled router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn welcome() -> impl IntoResponse {
    Json(json!({
        "message": "welcome to JWT Pizza",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn unknown_endpoint() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "unknown endpoint" })),
    )
}
