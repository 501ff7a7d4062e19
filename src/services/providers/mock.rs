//! Mock provider implementation for testing.

use super::{GroundedAnswer, ProviderError, Source, TextProvider};
use async_trait::async_trait;

/// Mock text provider returning a canned answer or a canned failure.
pub struct MockTextProvider {
    answer: Option<GroundedAnswer>,
}

impl MockTextProvider {
    /// A provider that always answers with the given text and sources.
    pub fn with_answer(text: &str, sources: Vec<Source>) -> Self {
        Self {
            answer: Some(GroundedAnswer {
                text: text.to_string(),
                sources,
            }),
        }
    }

    /// A provider whose every generation attempt fails.
    pub fn failing() -> Self {
        Self { answer: None }
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(&self, _prompt: &str) -> Result<GroundedAnswer, ProviderError> {
        match &self.answer {
            Some(answer) => Ok(answer.clone()),
            None => Err(ProviderError::RetriesExhausted {
                attempts: 1,
                last: "mock upstream failure".to_string(),
            }),
        }
    }
}
