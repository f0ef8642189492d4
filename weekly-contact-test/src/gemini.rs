use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const PROMPT_TEXT: &str = "Generiere eine lustige Nachricht zum wöchentlichen Test meines Kontaktformulars. Die Nachricht soll entweder einen Witz oder einen Fakt aus dem Bereich Physik, Chemie, Astronomie oder Computer enthalten. Bringe auf jeden Fall einige Emoji mit rein.
Gebe nur die Nachricht aus, keine sonstige Formatierung oder zusätzliche Anmerkungen. Verwende keine Markdown-Formatierung. Verwende keine HTML-Tags. Verwende Zeilenumbrüche in der Nachricht.";

/// Client for the Gemini generateContent endpoint, fixed to the self-test
/// prompt.
pub struct GeminiClient<'a> {
    client: &'a Client,
    api_url: &'a str,
    api_key: &'a str,
}

impl<'a> GeminiClient<'a> {
    pub fn new(client: &'a Client, api_url: &'a str, api_key: &'a str) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }

    pub async fn generate_message(&self) -> Result<String, GeminiError> {
        let payload = GenerateContentPayload {
            contents: [Content {
                role: "user",
                parts: [Part { text: PROMPT_TEXT }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "text/plain",
            },
        };
        let response = self
            .client
            .post(self.api_url)
            .query(&[("key", self.api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(GeminiError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::RequestFailed { status, body });
        }
        let response: GenerateContentResponse =
            response.json().await.map_err(GeminiError::Transport)?;
        let message = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or(GeminiError::UnexpectedStructure)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(GeminiError::EmptyMessage);
        }
        Ok(message.into())
    }
}

#[derive(Serialize)]
struct GenerateContentPayload<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug)]
pub enum GeminiError {
    Transport(reqwest::Error),
    RequestFailed { status: StatusCode, body: String },
    UnexpectedStructure,
    EmptyMessage,
}

impl std::fmt::Display for GeminiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeminiError::Transport(error) => write!(f, "Gemini API request failed: {error}"),
            GeminiError::RequestFailed { status, body } => {
                write!(f, "Gemini API request failed: {status}. Body: {body}")
            }
            GeminiError::UnexpectedStructure => {
                write!(f, "Failed to parse generated message from Gemini API response.")
            }
            GeminiError::EmptyMessage => write!(f, "Gemini API returned an empty message."),
        }
    }
}

impl std::error::Error for GeminiError {}
