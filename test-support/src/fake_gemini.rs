use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::borrow::Cow;
use tokio::net::TcpListener;

const GEMINI_PORT: u16 = 5285;
const GENERATE_PATH: &str = "/generateContent";

#[derive(Clone)]
pub struct FakeGemini {
    message: Cow<'static, str>,
    return_empty_candidates: bool,
    return_error_status: bool,
}

impl FakeGemini {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            return_empty_candidates: false,
            return_error_status: false,
        }
    }

    pub fn return_empty_candidates(self) -> Self {
        Self {
            return_empty_candidates: true,
            ..self
        }
    }

    pub fn return_error_status(self) -> Self {
        Self {
            return_error_status: true,
            ..self
        }
    }

    pub fn generate_url() -> String {
        format!("http://localhost:{GEMINI_PORT}{GENERATE_PATH}")
    }

    pub fn serve(self) -> impl std::future::Future<Output = ()> + Send + 'static {
        // Bind before returning the future so the port is open as soon as the
        // caller spawns it, avoiding a race with the first request.
        let listener = std::net::TcpListener::bind(("0.0.0.0", GEMINI_PORT)).unwrap();
        listener.set_nonblocking(true).unwrap();
        async move {
            let app = Router::new()
                .route(GENERATE_PATH, post(generate_content))
                .with_state(self);
            let listener = TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        }
    }
}

async fn generate_content(State(state): State<FakeGemini>, Json(_payload): Json<Value>) -> Response {
    if state.return_error_status {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
    } else if state.return_empty_candidates {
        Json(json!({ "candidates": [] })).into_response()
    } else {
        Json(json!({
            "candidates": [
                { "content": { "parts": [{ "text": state.message }] } }
            ]
        }))
        .into_response()
    }
}
