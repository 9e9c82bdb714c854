//! HTTP server wiring.
//!
//! # Responsibilities
//! - Wrap application routes in the error middleware
//! - Apply request timeout and tracing layers
//! - Serve until Ctrl+C (or a caller-supplied signal), draining in-flight requests
//!
//! # Design Decisions
//! - The timeout layer sits inside the error middleware, so a timed out
//!   request reaches `on_error` like any other 408
//! - Tracing is outermost and sees the final response

use std::future::Future;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::Error;
use crate::http::{ErrorLayer, ResponseWriter};

/// The HTTP server, with the error middleware installed.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Build the server for `routes`, funnelling failures through `on_error`.
    pub fn new<F>(config: &ServerConfig, routes: Router, on_error: F) -> Self
    where
        F: Fn(&mut ResponseWriter, &Request<()>, Error) -> Result<(), Error>
            + Send
            + Sync
            + 'static,
    {
        let router = routes
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.request_timeout_secs),
            ))
            .layer(ErrorLayer::new(on_error).max_body_bytes(config.max_error_body_bytes))
            .layer(TraceLayer::new_for_http());

        Self { router }
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Serve until `signal` resolves.
    pub async fn run_until<G>(self, listener: TcpListener, signal: G) -> std::io::Result<()>
    where
        G: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
