//! Text provider abstraction and implementations.
//!
//! A trait-based seam over the upstream generative-language API, allowing
//! the HTTP layer to be tested against a mock backend.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Upstream call failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// A web citation backing part of a generated answer.
///
/// Only complete citations are represented; entries with an empty URI or
/// title are discarded at parse time, not repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

/// A generated answer together with its citation sources, in upstream order.
#[derive(Debug, Clone, Serialize)]
pub struct GroundedAnswer {
    pub text: String,
    pub sources: Vec<Source>,
}

/// Provider of grounded text generation.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate an answer for a single prompt, with web-search grounding.
    async fn generate(&self, prompt: &str) -> Result<GroundedAnswer, ProviderError>;
}
