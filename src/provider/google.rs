//! Google Gemini provider implementation
//!
//! Uses the Google AI Gemini OpenAI-compatible endpoint for simplicity.
//! Reference: https://ai.google.dev/gemini-api/docs/openai

use super::{
    CompletionRequest, CompletionResponse, FinishReason, GeneratedImage, ImageRequest, Message,
    Provider, Role, Usage,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

const GOOGLE_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

pub struct GoogleProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("api_key", &"<REDACTED>")
            .field("api_key_len", &self.api_key.len())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GoogleProvider {
    pub fn new(api_key: String) -> Result<Self> {
        tracing::debug!(
            provider = "google",
            api_key_len = api_key.len(),
            "Creating Google Gemini provider"
        );
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: GOOGLE_OPENAI_BASE.to_string(),
        })
    }

    /// Point at a different OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn validate_api_key(&self) -> Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!("Google API key is empty");
        }
        Ok(())
    }

    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                json!({
                    "role": role,
                    "content": msg.content
                })
            })
            .collect()
    }

    fn build_body(request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": Self::convert_messages(&request.messages),
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }
        body
    }

    fn parse_completion(text: &str) -> Result<CompletionResponse> {
        let completion: ChatCompletion = serde_json::from_str(text).with_context(|| {
            format!(
                "Failed to parse Google Gemini response: {}",
                text.chars().take(200).collect::<String>()
            )
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .context("No choices in Google Gemini response")?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        let usage = completion.usage.unwrap_or_default();

        Ok(CompletionResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            usage: Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
            finish_reason,
        })
    }

    /// Native Gemini API root; image output is not exposed on the OpenAI-compatible surface
    fn native_base(&self) -> &str {
        self.base_url
            .strip_suffix("/openai")
            .unwrap_or(&self.base_url)
    }

    fn build_image_body(request: &ImageRequest) -> Value {
        json!({
            "contents": [{"parts": [{"text": format!("Generate an image: {}", request.prompt)}]}],
            "generationConfig": {"responseModalities": ["TEXT", "IMAGE"]},
        })
    }

    /// First inline image part of a `generateContent` reply
    fn parse_image_response(text: &str) -> Result<Option<GeneratedImage>> {
        let reply: GenerateContentResponse = serde_json::from_str(text).with_context(|| {
            format!(
                "Failed to parse Google Gemini image response: {}",
                text.chars().take(200).collect::<String>()
            )
        })?;
        Ok(reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
            .map(|inline| GeneratedImage {
                mime_type: inline.mime_type,
                data: inline.data,
            }))
    }
}

/// Native `generateContent` reply, reduced to inline image parts
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// OpenAI-compatible types for parsing Google's response

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        tracing::debug!(
            provider = "google",
            model = %request.model,
            message_count = request.messages.len(),
            "Starting Google Gemini completion request"
        );

        self.validate_api_key()?;

        let body = Self::build_body(&request);

        // Google AI Studio OpenAI-compatible endpoint uses Bearer token auth
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Google Gemini")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Google Gemini response")?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiError>(&text) {
                anyhow::bail!("Google Gemini API error: {}", err.error.message);
            }
            anyhow::bail!("Google Gemini API error: {} {}", status, text);
        }

        let response = Self::parse_completion(&text)?;
        tracing::debug!(
            provider = "google",
            total_tokens = response.usage.total_tokens,
            "Google Gemini completion finished"
        );
        Ok(response)
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<Option<GeneratedImage>> {
        tracing::debug!(
            provider = "google",
            model = %request.model,
            "Starting Google Gemini image request"
        );

        self.validate_api_key()?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.native_base(),
            request.model
        );
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_image_body(&request))
            .send()
            .await
            .context("Failed to send image request to Google Gemini")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Google Gemini image response")?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiError>(&text) {
                anyhow::bail!("Google Gemini API error: {}", err.error.message);
            }
            anyhow::bail!("Google Gemini API error: {} {}", status, text);
        }

        Self::parse_image_response(&text)
    }
}
