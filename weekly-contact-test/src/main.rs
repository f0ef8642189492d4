mod config;
mod gemini;

use config::{Config, MissingConfiguration, ValidatedConfig};
use gemini::{GeminiClient, GeminiError};
use lambda_http::{http::StatusCode, run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Display;
use tracing::error;

const EMAIL_NAME: &str = "Weekly Contact Test";
const EMAIL_ADDRESS: &str = "weekly@iq42.de";
const SOURCE: &str = "weekly-contact-test";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env();
    let handler = WeeklyContactTestHandler::new(config);
    run(service_fn(|event| handler.handle(event))).await
}

struct WeeklyContactTestHandler {
    config: Config,
    client: reqwest::Client,
}

impl WeeklyContactTestHandler {
    fn new(config: Config) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn handle(&self, _event: Request) -> Result<Response<Body>, Error> {
        match self.run_self_test().await {
            Ok(report) => Ok(json_response(
                StatusCode::OK,
                &json!({
                    "success": true,
                    "source": SOURCE,
                    "geminiMessage": report.gemini_message,
                    "resendResponse": report.resend_response,
                }),
            )),
            Err(error) => {
                error.log();
                Ok(json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &json!({ "error": error.to_string(), "source": SOURCE }),
                ))
            }
        }
    }

    async fn run_self_test(&self) -> Result<SelfTestReport, SelfTestError> {
        let settings = self.config.validated()?;
        let gemini = GeminiClient::new(
            &self.client,
            settings.gemini_api_url,
            settings.gemini_api_key,
        );
        let message = gemini.generate_message().await?;
        let resend_response = self.submit_to_relay(&settings, &message).await?;
        Ok(SelfTestReport {
            gemini_message: message,
            resend_response,
        })
    }

    async fn submit_to_relay(
        &self,
        settings: &ValidatedConfig<'_>,
        message: &str,
    ) -> Result<Value, SelfTestError> {
        let payload = RelayPayload {
            verify: settings.verify_test_key,
            name: EMAIL_NAME,
            email: EMAIL_ADDRESS,
            message,
        };
        let response = self
            .client
            .post(&settings.relay_url)
            .bearer_auth(settings.service_role_key)
            .json(&payload)
            .send()
            .await
            .map_err(SelfTestError::RelayTransport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SelfTestError::RelayCallFailed {
                status: status.as_u16(),
                body,
            });
        }
        response.json().await.map_err(SelfTestError::RelayTransport)
    }
}

struct SelfTestReport {
    gemini_message: String,
    resend_response: Value,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    verify: &'a str,
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

fn json_response(status: StatusCode, body: &Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body.to_string().into())
        .unwrap()
}

#[derive(Debug)]
enum SelfTestError {
    MissingConfiguration(MissingConfiguration),
    Gemini(GeminiError),
    RelayTransport(reqwest::Error),
    RelayCallFailed { status: u16, body: String },
}

impl SelfTestError {
    fn log(&self) {
        error!("Error in weekly contact test: {self}");
    }
}

impl From<MissingConfiguration> for SelfTestError {
    fn from(error: MissingConfiguration) -> Self {
        SelfTestError::MissingConfiguration(error)
    }
}

impl From<GeminiError> for SelfTestError {
    fn from(error: GeminiError) -> Self {
        SelfTestError::Gemini(error)
    }
}

impl Display for SelfTestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelfTestError::MissingConfiguration(error) => write!(f, "{error}"),
            SelfTestError::Gemini(error) => write!(f, "{error}"),
            SelfTestError::RelayTransport(error) => {
                write!(f, "Calling resend function failed: {error}")
            }
            SelfTestError::RelayCallFailed { status, body } => {
                write!(f, "Calling resend function failed: {status}. Body: {body}")
            }
        }
    }
}

impl std::error::Error for SelfTestError {}

#[cfg(test)]
mod tests {
    use super::{Config, WeeklyContactTestHandler};
    use googletest::prelude::*;
    use lambda_http::{Body, Request, Response};
    use serde_json::Value;
    use serial_test::serial;
    use std::time::Duration;
    use test_support::{fake_gemini::FakeGemini, fake_relay::FakeRelay, setup_logging};
    use tokio::time::timeout;

    const TEST_KEY: &str = "test bypass key";
    const SERVICE_ROLE_KEY: &str = "fake service role key";
    const GENERATED_MESSAGE: &str = "Warum können Geister so schlecht lügen? Weil man durch sie hindurchsieht! 👻✨";

    fn test_config() -> Config {
        Config {
            gemini_api_key: Some("fake gemini api key".into()),
            supabase_url: Some(FakeRelay::base_url()),
            verify_test_key: Some(TEST_KEY.into()),
            service_role_key: Some(SERVICE_ROLE_KEY.into()),
            gemini_api_url: FakeGemini::generate_url(),
        }
    }

    #[googletest::test]
    #[tokio::test]
    #[serial]
    async fn reports_missing_gemini_api_key() {
        let subject = WeeklyContactTestHandler::new(Config {
            gemini_api_key: None,
            ..test_config()
        });

        let response = subject.handle(Request::default()).await.unwrap();

        expect_that!(response.status().as_u16(), eq(500));
        expect_that!(
            body_json(&response)["error"],
            eq(Value::from("Missing GEMINI_API_KEY environment variable."))
        );
    }

    #[googletest::test]
    #[tokio::test]
    #[serial]
    async fn reports_missing_service_role_key() {
        let subject = WeeklyContactTestHandler::new(Config {
            service_role_key: None,
            ..test_config()
        });

        let response = subject.handle(Request::default()).await.unwrap();

        expect_that!(response.status().as_u16(), eq(500));
        expect_that!(
            body_json(&response)["error"],
            eq(Value::from(
                "Missing SUPABASE_SERVICE_ROLE_KEY environment variable."
            ))
        );
    }

    #[googletest::test]
    #[tokio::test]
    #[serial]
    async fn submits_generated_message_through_relay() {
        setup_logging();
        let fake_gemini = FakeGemini::new(GENERATED_MESSAGE);
        tokio::spawn(fake_gemini.serve());
        let fake_relay = FakeRelay::new();
        tokio::spawn(fake_relay.serve());
        let subject = WeeklyContactTestHandler::new(test_config());

        let response = subject.handle(Request::default()).await.unwrap();

        expect_that!(response.status().as_u16(), eq(200));
        let report = body_json(&response);
        expect_that!(report["success"], eq(Value::Bool(true)));
        expect_that!(report["source"], eq(Value::from("weekly-contact-test")));
        expect_that!(report["geminiMessage"], eq(Value::from(GENERATED_MESSAGE)));
        let submission = timeout(Duration::from_secs(1), fake_relay.last_submission())
            .await
            .unwrap()
            .unwrap();
        expect_that!(
            submission.authorization,
            some(eq(format!("Bearer {SERVICE_ROLE_KEY}")))
        );
        expect_that!(submission.body["verify"], eq(Value::from(TEST_KEY)));
        expect_that!(
            submission.body["name"],
            eq(Value::from("Weekly Contact Test"))
        );
        expect_that!(submission.body["email"], eq(Value::from("weekly@iq42.de")));
        expect_that!(
            submission.body["message"],
            eq(Value::from(GENERATED_MESSAGE))
        );
    }

    #[googletest::test]
    #[tokio::test]
    #[serial]
    async fn does_not_submit_when_generated_message_is_blank() {
        let fake_gemini = FakeGemini::new("  \n  ");
        tokio::spawn(fake_gemini.serve());
        let fake_relay = FakeRelay::new();
        tokio::spawn(fake_relay.serve());
        let subject = WeeklyContactTestHandler::new(test_config());

        let response = subject.handle(Request::default()).await.unwrap();

        expect_that!(response.status().as_u16(), eq(500));
        expect_that!(
            body_json(&response)["error"],
            eq(Value::from("Gemini API returned an empty message."))
        );
        expect_that!(
            timeout(Duration::from_millis(500), fake_relay.last_submission()).await,
            err(anything())
        );
    }

    #[googletest::test]
    #[tokio::test]
    #[serial]
    async fn reports_gemini_error_status() {
        let fake_gemini = FakeGemini::new(GENERATED_MESSAGE).return_error_status();
        tokio::spawn(fake_gemini.serve());
        let subject = WeeklyContactTestHandler::new(test_config());

        let response = subject.handle(Request::default()).await.unwrap();

        expect_that!(response.status().as_u16(), eq(500));
        let report = body_json(&response);
        let Value::String(error) = &report["error"] else {
            panic!("Expected a string error field");
        };
        expect_that!(error, contains_substring("Gemini API request failed"));
        expect_that!(report["source"], eq(Value::from("weekly-contact-test")));
    }

    #[googletest::test]
    #[tokio::test]
    #[serial]
    async fn reports_unexpected_gemini_response_structure() {
        let fake_gemini = FakeGemini::new(GENERATED_MESSAGE).return_empty_candidates();
        tokio::spawn(fake_gemini.serve());
        let subject = WeeklyContactTestHandler::new(test_config());

        let response = subject.handle(Request::default()).await.unwrap();

        expect_that!(response.status().as_u16(), eq(500));
        expect_that!(
            body_json(&response)["error"],
            eq(Value::from(
                "Failed to parse generated message from Gemini API response."
            ))
        );
    }

    #[googletest::test]
    #[tokio::test]
    #[serial]
    async fn reports_relay_call_failure() {
        let fake_gemini = FakeGemini::new(GENERATED_MESSAGE);
        tokio::spawn(fake_gemini.serve());
        let fake_relay = FakeRelay::new().return_error_status();
        tokio::spawn(fake_relay.serve());
        let subject = WeeklyContactTestHandler::new(test_config());

        let response = subject.handle(Request::default()).await.unwrap();

        expect_that!(response.status().as_u16(), eq(500));
        let report = body_json(&response);
        let Value::String(error) = &report["error"] else {
            panic!("Expected a string error field");
        };
        expect_that!(error, contains_substring("Calling resend function failed"));
    }

    fn body_json(response: &Response<Body>) -> Value {
        let Body::Text(text) = response.body() else {
            panic!("Expected a text response body");
        };
        serde_json::from_str(text).unwrap()
    }
}
