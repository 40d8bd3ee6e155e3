//! Test double for a running relay.
//!
//! [`MockRelayServer`] serves the relay's routes on an ephemeral local port so
//! code built on [`RelayClient`](crate::client::RelayClient) can be tested
//! without providers or a real relay.
//!
//! # Example
//!
//! ```rust,ignore
//! use missive_relay::client::RelayClient;
//! use missive_relay::testing::MockRelayServer;
//! use missive_relay::MailAttributes;
//!
//! #[tokio::test]
//! async fn test_signup_sends_welcome_mail() {
//!     let relay = MockRelayServer::start().await?;
//!     let client = RelayClient::new(relay.url())?;
//!
//!     // ... code under test sends through `client` ...
//!
//!     assert_eq!(relay.sent_mail_count(), 1);
//!     assert_eq!(relay.last_sent_mail().unwrap().subject, "Welcome!");
//!
//!     relay.set_send_mail_status(500, "provider down");
//!     // ... exercise the error path ...
//! }
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::attributes::MailAttributes;

#[derive(Debug)]
struct MockState {
    sent: Vec<MailAttributes>,
    health_status: StatusCode,
    send_status: StatusCode,
    error_message: String,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            sent: Vec::new(),
            health_status: StatusCode::OK,
            send_status: StatusCode::OK,
            error_message: String::new(),
        }
    }
}

type SharedState = Arc<RwLock<MockState>>;

/// In-process relay that records every mail it receives.
///
/// Every well-formed `POST /v1/sendmail` body is recorded, whatever status
/// is configured. The server stops when this value is dropped.
pub struct MockRelayServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown: CancellationToken,
}

impl MockRelayServer {
    /// Bind `127.0.0.1:0` and start serving.
    pub async fn start() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = SharedState::default();
        let shutdown = CancellationToken::new();

        let app = Router::new()
            .route("/", get(health))
            .route("/v1/sendmail", post(send_mail))
            .with_state(Arc::clone(&state));

        let stop = shutdown.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "mock relay server failed");
            }
        });

        tracing::debug!(%addr, "Mock relay listening");
        Ok(Self {
            addr,
            state,
            shutdown,
        })
    }

    /// Base URL to hand to a client, e.g. `http://127.0.0.1:49152`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop serving. Also happens on drop.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    // =========================================================================
    // Response Configuration
    // =========================================================================

    /// Status returned by `GET /`.
    pub fn set_health_status(&self, status: u16) {
        self.state.write().health_status = to_status(status);
    }

    /// Status and `{"message"}` returned by `POST /v1/sendmail`.
    ///
    /// The message is only sent for non-200 statuses.
    pub fn set_send_mail_status(&self, status: u16, error_message: impl Into<String>) {
        let mut state = self.state.write();
        state.send_status = to_status(status);
        state.error_message = error_message.into();
    }

    /// Forget recorded mails and restore 200 responses.
    pub fn reset(&self) {
        *self.state.write() = MockState::default();
    }

    // =========================================================================
    // Recorded Mails
    // =========================================================================

    /// All recorded mails, oldest first.
    pub fn sent_mails(&self) -> Vec<MailAttributes> {
        self.state.read().sent.clone()
    }

    /// The most recent recorded mail.
    pub fn last_sent_mail(&self) -> Option<MailAttributes> {
        self.state.read().sent.last().cloned()
    }

    pub fn sent_mail_count(&self) -> usize {
        self.state.read().sent.len()
    }
}

impl Drop for MockRelayServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn to_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn health(State(state): State<SharedState>) -> Response {
    let status = state.read().health_status;
    if status == StatusCode::OK {
        (status, "OK").into_response()
    } else {
        status.into_response()
    }
}

async fn send_mail(
    State(state): State<SharedState>,
    payload: Result<Json<MailAttributes>, JsonRejection>,
) -> Response {
    let Ok(Json(attributes)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Invalid request body"})),
        )
            .into_response();
    };

    let (status, message) = {
        let mut state = state.write();
        state.sent.push(attributes.clone());
        (state.send_status, state.error_message.clone())
    };

    if status == StatusCode::OK {
        Json(attributes).into_response()
    } else {
        (status, Json(json!({ "message": message }))).into_response()
    }
}
