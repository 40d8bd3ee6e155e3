//! missive-relay - Entry Point
//!
//! Reads boot settings, installs logging and serves the relay API.

use std::process::ExitCode;
use std::sync::Arc;

use missive_relay::settings::{init_tracing, Settings};
use missive_relay::{server, Dispatcher, MailError};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "missive-relay failed");
            eprintln!("missive-relay: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), MailError> {
    let settings = Settings::from_env()?;
    init_tracing(settings.log_format);

    let dispatcher = Dispatcher::from_arc(Arc::new(settings.config_source()))
        .with_timeout(settings.request_timeout)?;

    let address = settings.address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| MailError::Server(format!("cannot listen on {}: {}", address, e)))?;

    server::serve(listener, dispatcher)
        .await
        .map_err(|e| MailError::Server(e.to_string()))
}
