use crate::config::Config;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tinytemplate::{error::Error, format, TinyTemplate};

const FROM_ADDRESS: &str = "uweschwarz-eu <uweschwarz-eu@oldman.cloud>";
const TO_ADDRESS: &str = "mail@uweschwarz.eu";
const SUBJECT: &str = "Contact Form: uweschwarz.eu";

const CONTACT_EMAIL_TEMPLATE_NAME: &str = "contact-email-template";
const CONTACT_EMAIL_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/contact-email.html"
));

#[derive(Serialize)]
struct Context<'a> {
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

pub fn render_contact_email(name: &str, email: &str, message: &str) -> String {
    let mut tt = TinyTemplate::new();
    tt.add_formatter("render_line_breaks", render_line_breaks);
    tt.add_template(CONTACT_EMAIL_TEMPLATE_NAME, CONTACT_EMAIL_TEMPLATE)
        .unwrap();
    let context = Context {
        name,
        email,
        message,
    };
    tt.render(CONTACT_EMAIL_TEMPLATE_NAME, &context).unwrap()
}

fn render_line_breaks(value: &Value, output: &mut String) -> Result<(), Error> {
    let mut formatted = String::new();
    format(value, &mut formatted)?;
    output.push_str(&formatted.replace('\n', "<br>"));
    Ok(())
}

/// Forwards a validated submission to the Resend email API. The provider's
/// JSON response is handed back to the caller unchanged.
pub struct ResendMailer {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ResendMailer {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.resend_api_url.clone(),
            api_key: config.resend_api_key.clone(),
        }
    }

    pub async fn send(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<Value, reqwest::Error> {
        let html = render_contact_email(name, email, message);
        let payload = SendEmailPayload {
            from: FROM_ADDRESS,
            to: [TO_ADDRESS],
            subject: SUBJECT,
            html: &html,
            reply_to: format!("{name} <{email}>"),
        };
        self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?
            .json()
            .await
    }
}

#[derive(Serialize)]
struct SendEmailPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    reply_to: String,
}

#[cfg(test)]
mod tests {
    use super::render_contact_email;
    use googletest::prelude::*;

    const MALICIOUS_CONTENT: &str = "<script>doEvil();</script>";

    #[test]
    fn escapes_user_input_in_name() -> Result<()> {
        let output = render_contact_email(MALICIOUS_CONTENT, "a@example.com", "A message");

        verify_that!(output, not(contains_substring(MALICIOUS_CONTENT)))
    }

    #[test]
    fn escapes_user_input_in_message() -> Result<()> {
        let output = render_contact_email("A name", "a@example.com", MALICIOUS_CONTENT);

        verify_that!(output, not(contains_substring(MALICIOUS_CONTENT)))
    }

    #[test]
    fn renders_line_breaks_in_message() -> Result<()> {
        let output = render_contact_email("A name", "a@example.com", "One line\nAnother line");

        verify_that!(output, contains_substring("One line<br>Another line"))
    }

    #[googletest::test]
    fn renders_name_and_email() {
        let output = render_contact_email("A name", "a@example.com", "A message");

        expect_that!(output, contains_substring("A name"));
        expect_that!(output, contains_substring("a@example.com"));
    }
}
