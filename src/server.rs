//! HTTP surface.
//!
//! ## Routes
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/v1/sendmail` | Validate and dispatch one mail request |
//! | GET | `/` | Liveness probe (200, empty body) |
//!
//! Errors are returned as `{"message": "..."}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::attributes::MailAttributes;
use crate::dispatch::Dispatcher;
use crate::error::{MailError, SendError, TransportKind};

/// Create the relay router.
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/v1/sendmail", post(send_mail))
        .route("/", get(probe))
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// Serve the router until ctrl-c / SIGTERM.
pub async fn serve(listener: TcpListener, dispatcher: Dispatcher) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Listening");
    }
    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    tracing::info!("Shutting down");
}

/// GET / - Liveness probe.
async fn probe() -> StatusCode {
    StatusCode::OK
}

/// POST /v1/sendmail - Validate, dispatch, echo the request.
async fn send_mail(
    State(dispatcher): State<Dispatcher>,
    payload: Result<Json<MailAttributes>, JsonRejection>,
) -> Result<Json<MailAttributes>, ApiError> {
    let Json(attributes) = payload.map_err(|rejection| {
        tracing::error!(error = %rejection.body_text(), "failed to bind mail attributes");
        ApiError::BadRequest(rejection.body_text())
    })?;

    let missing = attributes.missing_fields();
    if !missing.is_empty() {
        let message = format!(
            "received invalid request body: missing required field(s): {}",
            missing.join(", ")
        );
        tracing::error!(%message, "failed to validate mail attributes");
        return Err(ApiError::BadRequest(message));
    }

    tracing::info!("received mail request");

    // The dispatch runs on its own task, so dropping this handler (client
    // went away) does not drop it; the guard cancels its outbound call.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let task = tokio::spawn(
        async move { dispatcher.dispatch(attributes, &cancel).await }.in_current_span(),
    );
    let outcome = task
        .await
        .map_err(|e| MailError::Server(format!("dispatch task failed: {}", e)))??;
    Ok(Json(outcome.into_attributes()))
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// Error response of the HTTP surface.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Dispatch(MailError),
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self::Dispatch(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Dispatch(
                MailError::ConfigMissing(_) | MailError::Configuration(_) | MailError::Server(_),
            ) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Dispatch(MailError::Send(SendError::Transport {
                kind: TransportKind::Timeout,
                ..
            })) => StatusCode::GATEWAY_TIMEOUT,
            Self::Dispatch(MailError::Send(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(message) => message,
            Self::Dispatch(err) => err.to_string(),
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}
