//! Gemini text provider with Google Search grounding.
//!
//! Talks to the Gemini REST API directly: the model name is embedded in the
//! path and the API key travels as a query parameter. Transport errors and
//! non-2xx statuses are retried with exponential backoff; a 2xx response
//! that cannot be parsed is terminal.

use super::{GroundedAnswer, ProviderError, Source, TextProvider};
use crate::config::GeminiSettings;
use crate::services::retry::{retry_with_backoff, RetryConfig, RetryFailure};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Static persona for the assistant. Sent as the system instruction on
/// every request; the user prompt is the sole content turn.
const SYSTEM_INSTRUCTION: &str = "You are a friendly, helpful, and highly informative AI assistant named RAU-01. \
    Your core function is to provide answers based on real-time information. \
    Always use the Google Search tool for grounded, up-to-date information, especially for current events or facts. \
    Be concise, clear, and encouraging. Your responses must be structured well and easy to read. \
    You MUST use the provided Google Search results to ground your answer and provide citations in the final output. \
    If no relevant information is found, respond accordingly.";

/// Gemini text provider.
pub struct GeminiTextProvider {
    api_key: Secret<String>,
    model: String,
    api_base: String,
    retry: RetryConfig,
    client: Client,
}

/// Failure of a single upstream attempt. Transport and status failures are
/// retryable; parse failures are not.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("Gemini API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed upstream response: {0}")]
    Parse(String),
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Transport(_) | AttemptError::Status { .. })
    }
}

impl GeminiTextProvider {
    pub fn new(api_key: Secret<String>, settings: &GeminiSettings, retry: RetryConfig) -> Self {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            model: settings.model.clone(),
            api_base: settings.api_base.clone(),
            retry,
            client,
        }
    }

    /// Build the generateContent URL. Contains the API key; never log it.
    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base,
            self.model,
            self.api_key.expose_secret()
        )
    }

    async fn attempt(&self, request: &GenerateContentRequest) -> Result<GroundedAnswer, AttemptError> {
        let response = self
            .client
            .post(self.api_url())
            .json(request)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Parse(e.without_url().to_string()))?;

        extract_answer(api_response).map_err(AttemptError::Parse)
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    async fn generate(&self, prompt: &str) -> Result<GroundedAnswer, ProviderError> {
        let request = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        tracing::debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            "Sending grounded request to Gemini API"
        );

        let result = retry_with_backoff(
            &self.retry,
            "generate_content",
            AttemptError::is_retryable,
            || self.attempt(&request),
        )
        .await;

        match result {
            Ok(answer) => Ok(answer),
            Err(RetryFailure::Fatal(err)) => Err(ProviderError::ApiError(err.to_string())),
            Err(RetryFailure::Exhausted { attempts, last }) => {
                Err(ProviderError::RetriesExhausted {
                    attempts,
                    last: last.to_string(),
                })
            }
        }
    }
}

/// Pull the generated text and complete citations out of an upstream reply.
///
/// Text comes from the first candidate's first content part. Sources come
/// from that candidate's grounding attributions, keeping upstream order and
/// dropping entries missing either a URI or a title.
fn extract_answer(response: GenerateContentResponse) -> Result<GroundedAnswer, String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| "response contained no candidates".to_string())?;

    let text = candidate
        .content
        .parts
        .into_iter()
        .next()
        .map(|part| part.text)
        .ok_or_else(|| "candidate contained no content parts".to_string())?;

    let sources = candidate
        .grounding_metadata
        .map(|metadata| metadata.grounding_attributions)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|attribution| attribution.web)
        .filter(|web| !web.uri.is_empty() && !web.title.is_empty())
        .map(|web| Source {
            uri: web.uri,
            title: web.title,
        })
        .collect();

    Ok(GroundedAnswer { text, sources })
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    tools: Vec<Tool>,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

// The tool declaration keeps its wire name: {"google_search": {}}.
#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_attributions: Vec<GroundingAttribution>,
}

#[derive(Debug, Deserialize)]
struct GroundingAttribution {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}
