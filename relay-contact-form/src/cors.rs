use lambda_http::http::response::Builder;

const DEFAULT_ORIGIN: &str = "https://uweschwarz.eu";
const EXACT_ORIGINS: [&str; 2] = ["https://uweschwarz.eu", "https://uweschwarz-eu.pages.dev"];

// Preview deployments get their own subdomain, so any HTTPS subdomain of the
// pages domain is allowed as well.
const WILDCARD_SCHEME: &str = "https://";
const WILDCARD_SUFFIX: &str = ".uweschwarz-eu.pages.dev";

/// The origin a response will permit. Allowed origins are echoed back exactly;
/// anything else falls back to the canonical site origin instead of being
/// rejected.
pub struct AllowedOrigin(String);

impl AllowedOrigin {
    pub fn decide(origin: &str) -> Self {
        if is_allowed(origin) {
            Self(origin.into())
        } else {
            Self(DEFAULT_ORIGIN.into())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn apply(&self, builder: Builder) -> Builder {
        builder
            .header("Access-Control-Allow-Origin", self.0.as_str())
            .header("Access-Control-Allow-Methods", "POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "*")
    }
}

fn is_allowed(origin: &str) -> bool {
    EXACT_ORIGINS.contains(&origin)
        || origin
            .strip_prefix(WILDCARD_SCHEME)
            .is_some_and(|host| host.ends_with(WILDCARD_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::AllowedOrigin;
    use googletest::prelude::*;
    use lambda_http::http::Response;

    #[test]
    fn echoes_exact_match() -> Result<()> {
        let origin = AllowedOrigin::decide("https://uweschwarz-eu.pages.dev");

        verify_that!(origin.as_str(), eq("https://uweschwarz-eu.pages.dev"))
    }

    #[test]
    fn echoes_wildcard_subdomain_match() -> Result<()> {
        let origin = AllowedOrigin::decide("https://preview-17.uweschwarz-eu.pages.dev");

        verify_that!(
            origin.as_str(),
            eq("https://preview-17.uweschwarz-eu.pages.dev")
        )
    }

    #[test]
    fn falls_back_to_default_for_unknown_origin() -> Result<()> {
        let origin = AllowedOrigin::decide("https://evil.example.com");

        verify_that!(origin.as_str(), eq("https://uweschwarz.eu"))
    }

    #[test]
    fn falls_back_to_default_for_missing_origin() -> Result<()> {
        let origin = AllowedOrigin::decide("");

        verify_that!(origin.as_str(), eq("https://uweschwarz.eu"))
    }

    #[test]
    fn does_not_match_wildcard_over_plain_http() -> Result<()> {
        let origin = AllowedOrigin::decide("http://preview.uweschwarz-eu.pages.dev");

        verify_that!(origin.as_str(), eq("https://uweschwarz.eu"))
    }

    #[test]
    fn does_not_match_suffix_without_subdomain_separator() -> Result<()> {
        let origin = AllowedOrigin::decide("https://evil-uweschwarz-eu.pages.dev");

        verify_that!(origin.as_str(), eq("https://uweschwarz.eu"))
    }

    #[googletest::test]
    fn applies_all_three_headers() {
        let origin = AllowedOrigin::decide("https://uweschwarz.eu");

        let response = origin.apply(Response::builder()).body(()).unwrap();

        expect_that!(
            response.headers().get("Access-Control-Allow-Origin"),
            some(eq("https://uweschwarz.eu"))
        );
        expect_that!(
            response.headers().get("Access-Control-Allow-Methods"),
            some(eq("POST, OPTIONS"))
        );
        expect_that!(
            response.headers().get("Access-Control-Allow-Headers"),
            some(eq("*"))
        );
    }
}
