//! OpenAI-compatible chat completion client for mood and prompt suggestions.

use harmony_core::WeatherReading;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::{build_http_client, parse_base_url, ProviderError};

const SYSTEM_PROMPT: &str = "Kamu adalah asisten rekomendasi makanan. \
     Pilih dari daftar menu yang diberikan dan jawab singkat dalam bahasa Indonesia.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Inputs for one suggestion.
#[derive(Debug, Clone, Default)]
pub struct SuggestionRequest<'a> {
    pub mood: Option<&'a str>,
    pub prompt: Option<&'a str>,
    pub weather: Option<&'a WeatherReading>,
    /// Product names the suggestion should pick from.
    pub candidates: Vec<&'a str>,
}

impl SuggestionRequest<'_> {
    /// Renders the user message sent to the model.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if let Some(w) = self.weather {
            lines.push(format!(
                "Cuaca saat ini: {} dengan suhu {:.0}°C dan kelembapan {}%.",
                w.condition, w.temperature, w.humidity
            ));
        }
        if let Some(mood) = self.mood {
            lines.push(format!("Mood saya: {mood}."));
        }
        if let Some(prompt) = self.prompt {
            lines.push(format!("Permintaan: {prompt}"));
        }
        if self.candidates.is_empty() {
            lines.push("Tidak ada menu yang tersedia.".to_string());
        } else {
            lines.push(format!("Menu yang tersedia: {}.", self.candidates.join(", ")));
        }
        lines.join("\n")
    }
}

/// Client for an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
    url: Url,
    model: String,
}

impl ChatClient {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ProviderError::InvalidBaseUrl`] if `url` does not parse.
    pub fn new(
        api_key: &str,
        url: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            api_key: api_key.to_owned(),
            url: parse_base_url(url)?,
            model: model.to_owned(),
        })
    }

    /// Asks the model for a short recommendation.
    ///
    /// # Errors
    ///
    /// - [`ProviderError::Http`] on network failure.
    /// - [`ProviderError::UnexpectedStatus`] on a non-2xx response.
    /// - [`ProviderError::Deserialize`] if the body does not match the expected shape.
    /// - [`ProviderError::EmptyCompletion`] if the model returned no text.
    pub async fn suggest(&self, request: &SuggestionRequest<'_>) -> Result<String, ProviderError> {
        let user_message = request.render();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_message,
                },
            ],
        };

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                context: "chat completion".to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Deserialize {
                context: "chat completion".to_string(),
                source: e,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ProviderError::EmptyCompletion)
    }
}
