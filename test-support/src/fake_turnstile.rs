use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tokio::net::TcpListener;

pub const FAKE_TURNSTILE_SECRET: &str = "arbitrary turnstile secret";

const TURNSTILE_PORT: u16 = 5283;
const VERIFY_PATH: &str = "/turnstile/v0/siteverify";

#[derive(Clone)]
pub struct FakeTurnstile {
    required_secret: Cow<'static, str>,
    required_response: Option<String>,
}

#[derive(Deserialize)]
struct SiteverifyRequestPayload {
    secret: String,
    response: String,
}

#[derive(Serialize)]
struct SiteverifyResponsePayload {
    success: bool,
    #[serde(rename = "error-codes")]
    error_codes: Vec<String>,
}

impl FakeTurnstile {
    pub fn new(required_secret: impl Into<Cow<'static, str>>) -> Self {
        Self {
            required_secret: required_secret.into(),
            required_response: None,
        }
    }

    pub fn require_response(self, required_response: impl AsRef<str>) -> Self {
        Self {
            required_response: Some(required_response.as_ref().into()),
            ..self
        }
    }

    pub fn verify_url() -> String {
        format!("http://localhost:{TURNSTILE_PORT}{VERIFY_PATH}")
    }

    pub fn serve(self) -> impl std::future::Future<Output = ()> + Send + 'static {
        // Bind before returning the future so the port is open as soon as the
        // caller spawns it, avoiding a race with the first request.
        let listener = std::net::TcpListener::bind(("0.0.0.0", TURNSTILE_PORT)).unwrap();
        listener.set_nonblocking(true).unwrap();
        async move {
            let app = Router::new()
                .route(VERIFY_PATH, post(siteverify))
                .with_state(self);
            let listener = TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        }
    }
}

async fn siteverify(
    State(state): State<FakeTurnstile>,
    Json(payload): Json<SiteverifyRequestPayload>,
) -> Json<SiteverifyResponsePayload> {
    if payload.secret != state.required_secret {
        Json(SiteverifyResponsePayload {
            success: false,
            error_codes: vec!["invalid-input-secret".into()],
        })
    } else if state
        .required_response
        .as_deref()
        .is_some_and(|required| required != payload.response)
    {
        Json(SiteverifyResponsePayload {
            success: false,
            error_codes: vec!["invalid-input-response".into()],
        })
    } else {
        Json(SiteverifyResponsePayload {
            success: true,
            error_codes: vec![],
        })
    }
}
