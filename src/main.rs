//! httperr demo server.
//!
//! Serves a handful of routes that fail in different ways and renders every
//! failure as a JSON problem body through the error middleware:
//!
//! ```text
//! GET /               → 200 "ok"
//! GET /teapot         → handler returns TEAPOT, rendered as a 418 problem
//! GET /grob/{name}    → handler reports NOT_FOUND, its own body is discarded
//! GET /frob           → public Value, message shown to the caller
//! GET /secret         → opaque error, caller sees a generic 500
//! anything else       → router 404
//! ```

use std::path::PathBuf;

use axum::extract::Path;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use serde::Serialize;
use tokio::net::TcpListener;

use httperr::config::{load_config, HttpErrConfig};
use httperr::error::status::{status_text, NOT_FOUND, TEAPOT};
use httperr::http::server::HttpServer;
use httperr::observability::logging;
use httperr::{public, Error, ErrorReporter, ResponseError, ResponseWriter, StatusError, Value};

#[derive(Parser)]
#[command(name = "httperr-demo")]
#[command(about = "Demo server for the httperr error middleware", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// JSON body written for every failed request.
#[derive(Serialize)]
struct Problem {
    code: u16,
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HttpErrConfig::default(),
    };

    logging::init(&config.logging);
    tracing::info!("httperr-demo v{} starting", env!("CARGO_PKG_VERSION"));

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        request_timeout_secs = config.server.request_timeout_secs,
        "Listening for connections"
    );

    HttpServer::new(&config.server, routes(), render_problem)
        .run(listener)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn routes() -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/teapot", get(teapot))
        .route("/grob/{name}", get(find_grob))
        .route("/frob", get(frob))
        .route("/secret", get(secret))
}

async fn teapot() -> Result<&'static str, Error> {
    Err(TEAPOT.into())
}

async fn find_grob(Path(name): Path<String>, reporter: ErrorReporter) -> &'static str {
    reporter.report(NOT_FOUND.with_status(format!("no grob named {name}")));
    "this body is discarded"
}

async fn frob() -> Result<&'static str, Error> {
    Err(public(422, Error::msg("grob is not frobbable")).into())
}

async fn secret() -> Result<&'static str, Error> {
    let cause = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "vault is sealed");
    Err(Error::new(cause))
}

/// `on_error` hook: log the failure and answer with a JSON [`Problem`].
fn render_problem(w: &mut ResponseWriter, request: &Request<()>, err: Error) -> Result<(), Error> {
    logging::log_error(&err);
    let problem = describe(&err);
    tracing::debug!(uri = %request.uri(), code = problem.code, "Rendering problem");

    let body = serde_json::to_vec(&problem).map_err(Error::new)?;
    w.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    w.write_header(StatusCode::from_u16(problem.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    w.write_body(&body);
    Ok(())
}

fn describe(err: &Error) -> Problem {
    if let Some(status) = err.downcast_ref::<StatusError>() {
        Problem {
            code: status.effective_status_code(),
            message: status.effective_status_text().into_owned(),
        }
    } else if let Some(value) = err.downcast_ref::<Value>() {
        Problem {
            code: value.effective_status_code(),
            message: value.display_text().into_owned(),
        }
    } else if let Some(failed) = err.downcast_ref::<ResponseError>() {
        Problem {
            code: failed.status_code.as_u16(),
            message: failed.status.clone(),
        }
    } else {
        Problem {
            code: 500,
            message: status_text(500).to_string(),
        }
    }
}
