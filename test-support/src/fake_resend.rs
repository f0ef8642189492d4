use axum::{extract::State, routing::post, Json, Router};
use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{
    net::TcpListener,
    sync::watch::{self, error::RecvError, Receiver, Sender},
    time::timeout,
};

const RESEND_PORT: u16 = 5284;
const EMAILS_PATH: &str = "/emails";

/// The send envelope as the relay posts it to the email API.
#[derive(Deserialize, Debug, Clone)]
pub struct SendEmailRequest {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub reply_to: String,
}

pub struct FakeResend {
    sender: Arc<Sender<String>>,
    receiver: tokio::sync::Mutex<Receiver<String>>,
}

impl FakeResend {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel("".into());
        Self {
            sender: Arc::new(sender),
            receiver: tokio::sync::Mutex::new(receiver),
        }
    }

    pub fn api_url() -> String {
        format!("http://localhost:{RESEND_PORT}{EMAILS_PATH}")
    }

    /// Canned provider response returned for every send.
    pub fn provider_response() -> Value {
        json!({ "id": "fake-email-id" })
    }

    pub fn serve(&self) -> impl Future<Output = ()> + Send + 'static {
        let sender = self.sender.clone();
        // Bind before returning the future so the port is open as soon as the
        // caller spawns it, avoiding a race with the first request.
        let listener = std::net::TcpListener::bind(("0.0.0.0", RESEND_PORT)).unwrap();
        listener.set_nonblocking(true).unwrap();
        async move {
            let app = Router::new()
                .route(EMAILS_PATH, post(send_email))
                .with_state(sender);
            let listener = TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        }
    }

    pub async fn last_request(&self) -> Result<SendEmailRequest, RecvError> {
        let mut receiver = self.receiver.lock().await;
        receiver.changed().await?;
        let content = receiver.borrow_and_update().clone();
        drop(receiver);
        Ok(serde_json::from_str(&content).unwrap())
    }

    pub async fn flush(&self) {
        let mut receiver = self.receiver.lock().await;
        let _ = timeout(Duration::from_millis(100), receiver.changed()).await;
    }
}

impl Default for FakeResend {
    fn default() -> Self {
        Self::new()
    }
}

async fn send_email(State(sender): State<Arc<Sender<String>>>, body: String) -> Json<Value> {
    debug!("FakeResend received:\n{body}");
    sender.send(body).unwrap();
    Json(FakeResend::provider_response())
}
