use std::fmt::Display;

const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";
const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Runtime configuration, read from the environment once at startup. Handlers
/// never consult the environment themselves.
pub struct Config {
    /// Shared secret letting trusted callers skip captcha verification.
    pub verify_test_key: Option<String>,
    pub turnstile_secret_key: String,
    pub resend_api_key: String,
    pub turnstile_verify_url: String,
    pub resend_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            verify_test_key: optional_var("VERIFY_TEST_KEY"),
            turnstile_secret_key: required_var("TURNSTILE_SECRET_KEY")?,
            resend_api_key: required_var("RESEND_API_KEY")?,
            turnstile_verify_url: optional_var("TURNSTILE_VERIFY_URL")
                .unwrap_or_else(|| TURNSTILE_VERIFY_URL.into()),
            resend_api_url: optional_var("RESEND_API_URL")
                .unwrap_or_else(|| RESEND_API_URL.into()),
        })
    }
}

fn optional_var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    optional_var(name).ok_or(ConfigError::MissingVariable(name))
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(name) => {
                write!(f, "Missing environment variable {name}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
