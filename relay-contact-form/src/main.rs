mod config;
mod cors;
mod email;
mod turnstile;

use config::Config;
use cors::AllowedOrigin;
use email::ResendMailer;
use lambda_http::{
    http::{Method, StatusCode},
    run, service_fn, Body, Error, Request, RequestPayloadExt, Response,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Display;
use tracing::error;
use turnstile::{TurnstileError, TurnstileVerifier};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env()?;
    let handler = ContactRelayHandler::new(&config);
    run(service_fn(|event| handler.handle(event))).await
}

struct ContactRelayHandler {
    verify_test_key: Option<String>,
    turnstile_verifier: TurnstileVerifier,
    mailer: ResendMailer,
}

impl ContactRelayHandler {
    fn new(config: &Config) -> Self {
        let client = reqwest::Client::new();
        Self {
            verify_test_key: config.verify_test_key.clone(),
            turnstile_verifier: TurnstileVerifier::new(client.clone(), config),
            mailer: ResendMailer::new(client, config),
        }
    }

    async fn handle(&self, event: Request) -> Result<Response<Body>, Error> {
        let origin = AllowedOrigin::decide(
            event
                .headers()
                .get("origin")
                .and_then(|value| value.to_str().ok())
                .unwrap_or(""),
        );
        if event.method() == Method::OPTIONS {
            return Ok(origin
                .apply(Response::builder().status(StatusCode::OK))
                .body("ok".into())
                .unwrap());
        }
        match self.process(event).await {
            Ok(provider_response) => Ok(origin
                .apply(Response::builder().status(StatusCode::OK))
                .header("Content-Type", "application/json")
                .body(provider_response.to_string().into())
                .unwrap()),
            Err(error) => {
                error.log();
                Ok(error.into_response(&origin))
            }
        }
    }

    async fn process(&self, event: Request) -> Result<Value, RelayError> {
        if event.method() != Method::POST {
            return Err(RelayError::MethodNotAllowed);
        }
        let submission: Submission = event
            .payload()
            .map_err(|_| RelayError::MalformedBody)?
            .ok_or(RelayError::MalformedBody)?;
        self.check_verification(&submission).await?;
        let validated = submission.validate_fields()?;
        self.mailer
            .send(validated.name, validated.email, validated.message)
            .await
            .map_err(RelayError::SendFailed)
    }

    async fn check_verification(&self, submission: &Submission) -> Result<(), RelayError> {
        if let (Some(expected), Some(token)) =
            (self.verify_test_key.as_deref(), submission.verify.as_deref())
        {
            if token == expected {
                return Ok(());
            }
        }
        match submission
            .verify
            .as_deref()
            .filter(|token| !token.trim().is_empty())
        {
            Some(token) => {
                self.turnstile_verifier
                    .verify(token)
                    .await
                    .map_err(|error| match error {
                        TurnstileError::Rejected(_) => RelayError::CaptchaRejected,
                        TurnstileError::Unreachable(error) => {
                            RelayError::VerificationUnavailable(error)
                        }
                    })
            }
            None => Err(RelayError::CaptchaMissing),
        }
    }
}

#[derive(Deserialize, Debug)]
struct Submission {
    name: Option<String>,
    email: Option<String>,
    message: Option<String>,
    verify: Option<String>,
}

impl Submission {
    fn validate_fields(&self) -> Result<ValidatedSubmission, RelayError> {
        match (
            present(&self.name),
            present(&self.email),
            present(&self.message),
        ) {
            (Some(name), Some(email), Some(message)) => Ok(ValidatedSubmission {
                name,
                email,
                message,
            }),
            _ => Err(RelayError::MissingFields),
        }
    }
}

// Whitespace-only values count as missing.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}

struct ValidatedSubmission<'a> {
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

#[derive(Debug)]
enum RelayError {
    MethodNotAllowed,
    MalformedBody,
    CaptchaMissing,
    CaptchaRejected,
    MissingFields,
    VerificationUnavailable(reqwest::Error),
    SendFailed(reqwest::Error),
}

impl RelayError {
    fn log(&self) {
        match self {
            RelayError::VerificationUnavailable(error) => {
                error!("Error verifying captcha token: {error}");
            }
            RelayError::SendFailed(error) => {
                error!("Error relaying message to email provider: {error}");
            }
            other => error!("Rejecting contact form submission: {other}"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::MalformedBody
            | RelayError::CaptchaMissing
            | RelayError::CaptchaRejected
            | RelayError::MissingFields => StatusCode::BAD_REQUEST,
            RelayError::VerificationUnavailable(_) | RelayError::SendFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            RelayError::MethodNotAllowed => "Method not allowed",
            RelayError::MalformedBody => "Invalid JSON",
            RelayError::CaptchaMissing => "Missing captcha",
            RelayError::CaptchaRejected => "Invalid captcha",
            RelayError::MissingFields => "Missing fields.",
            RelayError::VerificationUnavailable(_) => "Captcha verification failed",
            RelayError::SendFailed(_) => "Sending email failed",
        }
    }

    fn into_response(self, origin: &AllowedOrigin) -> Response<Body> {
        origin
            .apply(Response::builder().status(self.status_code()))
            .header("Content-Type", "application/json")
            .body(json!({ "error": self.public_message() }).to_string().into())
            .unwrap()
    }
}

impl Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::MethodNotAllowed => write!(f, "Method not allowed"),
            RelayError::MalformedBody => write!(f, "Request body is not valid JSON"),
            RelayError::CaptchaMissing => write!(f, "No captcha token in request"),
            RelayError::CaptchaRejected => write!(f, "Captcha token rejected"),
            RelayError::MissingFields => write!(f, "Missing fields in request"),
            RelayError::VerificationUnavailable(error) => {
                write!(f, "Captcha verification failed: {error}")
            }
            RelayError::SendFailed(error) => write!(f, "Sending email failed: {error}"),
        }
    }
}

impl std::error::Error for RelayError {}
