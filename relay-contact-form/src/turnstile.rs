use crate::config::Config;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Client for Cloudflare Turnstile's siteverify endpoint.
pub struct TurnstileVerifier {
    client: Client,
    verify_url: String,
    secret: String,
}

impl TurnstileVerifier {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            verify_url: config.turnstile_verify_url.clone(),
            secret: config.turnstile_secret_key.clone(),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<(), TurnstileError> {
        let payload = SiteverifyPayload {
            secret: &self.secret,
            response: token,
        };
        let response = self
            .client
            .post(&self.verify_url)
            .json(&payload)
            .send()
            .await
            .map_err(TurnstileError::Unreachable)?;
        let outcome: SiteverifyResponse =
            response.json().await.map_err(TurnstileError::Unreachable)?;
        if outcome.success {
            Ok(())
        } else {
            warn!(
                "Turnstile rejected token: {:?}",
                outcome.error_codes
            );
            Err(TurnstileError::Rejected(outcome.error_codes))
        }
    }
}

#[derive(Serialize)]
struct SiteverifyPayload<'a> {
    secret: &'a str,
    response: &'a str,
}

#[derive(Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

#[derive(Debug)]
pub enum TurnstileError {
    Rejected(Vec<String>),
    Unreachable(reqwest::Error),
}

impl std::fmt::Display for TurnstileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnstileError::Rejected(codes) => write!(f, "Token rejected: {codes:?}"),
            TurnstileError::Unreachable(error) => {
                write!(f, "Verification service unreachable: {error}")
            }
        }
    }
}

impl std::error::Error for TurnstileError {}
