use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{future::Future, sync::Arc};
use tokio::{
    net::TcpListener,
    sync::watch::{self, error::RecvError, Receiver, Sender},
};

const RELAY_PORT: u16 = 5286;
const RESEND_FUNCTION_PATH: &str = "/functions/v1/resend";

/// What the fake relay saw: the bearer header and the submission body.
#[derive(Deserialize, Debug, Clone)]
pub struct RecordedSubmission {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct RelayState {
    sender: Arc<Sender<String>>,
    return_error_status: bool,
}

pub struct FakeRelay {
    state: RelayState,
    receiver: tokio::sync::Mutex<Receiver<String>>,
}

impl FakeRelay {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel("".into());
        Self {
            state: RelayState {
                sender: Arc::new(sender),
                return_error_status: false,
            },
            receiver: tokio::sync::Mutex::new(receiver),
        }
    }

    pub fn return_error_status(mut self) -> Self {
        self.state.return_error_status = true;
        self
    }

    /// Base URL standing in for the hosting platform; the function path is
    /// appended by the caller.
    pub fn base_url() -> String {
        format!("http://localhost:{RELAY_PORT}")
    }

    pub fn serve(&self) -> impl Future<Output = ()> + Send + 'static {
        let state = self.state.clone();
        // Bind before returning the future so the port is open as soon as the
        // caller spawns it, avoiding a race with the first request.
        let listener = std::net::TcpListener::bind(("0.0.0.0", RELAY_PORT)).unwrap();
        listener.set_nonblocking(true).unwrap();
        async move {
            let app = Router::new()
                .route(RESEND_FUNCTION_PATH, post(relay))
                .with_state(state);
            let listener = TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        }
    }

    pub async fn last_submission(&self) -> Result<RecordedSubmission, RecvError> {
        let mut receiver = self.receiver.lock().await;
        receiver.changed().await?;
        let content = receiver.borrow_and_update().clone();
        drop(receiver);
        Ok(serde_json::from_str(&content).unwrap())
    }
}

impl Default for FakeRelay {
    fn default() -> Self {
        Self::new()
    }
}

async fn relay(State(state): State<RelayState>, headers: HeaderMap, body: String) -> Response {
    debug!("FakeRelay received:\n{body}");
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    state
        .sender
        .send(json!({ "authorization": authorization, "body": body }).to_string())
        .unwrap();
    if state.return_error_status {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Sending email failed" })),
        )
            .into_response()
    } else {
        Json(json!({ "id": "fake-email-id" })).into_response()
    }
}
