//! Issue a GET through the error transport and print what came back.
//!
//! Error bodies shaped like `{"code": 404, "message": "..."}` are decoded
//! into a structured error; anything else is reported as a plain status.

use std::path::PathBuf;
use std::process::ExitCode;

use axum::body::Body;
use clap::Parser;

use httperr::client::{Client, ClientError};
use httperr::config::{load_config, HttpErrConfig};
use httperr::observability::logging;

#[derive(Parser)]
#[command(name = "httperr-probe")]
#[command(about = "Probe an HTTP endpoint and classify its errors", long_about = None)]
struct Cli {
    /// URL to request
    url: String,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the raw error body for unstructured failures
    #[arg(long)]
    show_body: bool,
}

/// Problem body as written by httperr-demo.
#[derive(Debug, serde::Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
struct Problem {
    code: u16,
    message: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("invalid config: {e}");
                return ExitCode::from(2);
            }
        },
        None => HttpErrConfig::default(),
    };
    logging::init(&config.logging);

    let client = Client::new(&config.client).json::<Problem>();
    match client.get(&cli.url).await {
        Ok(response) => {
            let status = response.status();
            match axum::body::to_bytes(Body::new(response.into_body()), usize::MAX).await {
                Ok(body) => {
                    println!("{status}");
                    println!("{}", String::from_utf8_lossy(&body));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{status}, body unreadable: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(err) => {
            report(&err, cli.show_body);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &ClientError, show_body: bool) {
    if let Some(problem) = err.structured::<Problem>() {
        println!("structured error: code={} message={:?}", problem.code, problem.message);
    } else if let Some(failed) = err.response() {
        println!("{} {}", failed.status_code.as_u16(), failed.status);
        if show_body {
            println!("{}", String::from_utf8_lossy(failed.body()));
        }
    } else {
        eprintln!("transport error: {err}");
    }
}
