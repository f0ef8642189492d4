use std::fmt::Display;

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Environment snapshot taken once at startup. The required variables are
/// checked per invocation so each missing one is reported by name, the way the
/// self-test's callers expect.
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub supabase_url: Option<String>,
    pub verify_test_key: Option<String>,
    pub service_role_key: Option<String>,
    pub gemini_api_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: optional_var("GEMINI_API_KEY"),
            supabase_url: optional_var("SUPABASE_URL"),
            verify_test_key: optional_var("VERIFY_TEST_KEY"),
            service_role_key: optional_var("SUPABASE_SERVICE_ROLE_KEY"),
            gemini_api_url: optional_var("GEMINI_API_URL")
                .unwrap_or_else(|| GEMINI_API_URL.into()),
        }
    }

    pub fn validated(&self) -> Result<ValidatedConfig, MissingConfiguration> {
        let gemini_api_key = self
            .gemini_api_key
            .as_deref()
            .ok_or(MissingConfiguration("GEMINI_API_KEY"))?;
        let supabase_url = self
            .supabase_url
            .as_deref()
            .ok_or(MissingConfiguration("SUPABASE_URL"))?;
        let verify_test_key = self
            .verify_test_key
            .as_deref()
            .ok_or(MissingConfiguration("VERIFY_TEST_KEY"))?;
        let service_role_key = self
            .service_role_key
            .as_deref()
            .ok_or(MissingConfiguration("SUPABASE_SERVICE_ROLE_KEY"))?;
        Ok(ValidatedConfig {
            gemini_api_key,
            gemini_api_url: &self.gemini_api_url,
            relay_url: format!("{supabase_url}/functions/v1/resend"),
            verify_test_key,
            service_role_key,
        })
    }
}

pub struct ValidatedConfig<'a> {
    pub gemini_api_key: &'a str,
    pub gemini_api_url: &'a str,
    pub relay_url: String,
    pub verify_test_key: &'a str,
    pub service_role_key: &'a str,
}

#[derive(Debug)]
pub struct MissingConfiguration(pub &'static str);

impl Display for MissingConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Missing {} environment variable.", self.0)
    }
}

impl std::error::Error for MissingConfiguration {}

fn optional_var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
