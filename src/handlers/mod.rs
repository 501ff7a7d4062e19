//! HTTP handlers for the grounded-query endpoint and health probe.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::error::AppError;
use crate::services::providers::{ProviderError, Source};
use crate::startup::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, message = "Prompt must not be empty"))]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub text: String,
    pub sources: Vec<Source>,
}

/// Forward a prompt to the upstream model and relay the grounded answer.
pub async fn ask_ai(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(req) = payload.map_err(|e| {
        AppError::InvalidRequest(format!("Missing or invalid prompt in request: {}", e.body_text()))
    })?;

    req.validate()
        .map_err(|e| AppError::InvalidRequest(format!("Validation error: {}", e)))?;

    let provider = state.provider.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable(
            "AI service is not configured; GEMINI_API_KEY is missing".to_string(),
        )
    })?;

    tracing::info!(prompt_len = req.prompt.len(), "Handling grounded query");

    let answer = provider.generate(&req.prompt).await.map_err(|e| match e {
        ProviderError::NotConfigured(msg) => AppError::ServiceUnavailable(msg),
        other => {
            tracing::error!(error = %other, "Upstream generation failed");
            AppError::UpstreamFailure(other.to_string())
        }
    })?;

    tracing::info!(
        text_len = answer.text.len(),
        source_count = answer.sources.len(),
        "Grounded query answered"
    );

    Ok(Json(AskResponse {
        text: answer.text,
        sources: answer.sources,
    }))
}

/// Liveness probe. Reports degraded when no upstream credential is present.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.provider.is_some() {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "askai-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "service": "askai-service",
                "error": "GEMINI_API_KEY is not configured"
            })),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{AskaiConfig, CommonConfig, GeminiSettings};
    use crate::services::providers::mock::MockTextProvider;
    use crate::services::providers::{Source, TextProvider};
    use crate::services::retry::RetryConfig;
    use crate::startup::{router, AppState};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_config() -> AskaiConfig {
        AskaiConfig {
            common: CommonConfig { port: 0 },
            gemini: GeminiSettings {
                api_key: None,
                model: "gemini-2.5-flash".to_string(),
                api_base: "http://127.0.0.1:0".to_string(),
                request_timeout: Duration::from_secs(1),
            },
            retry: RetryConfig {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
            },
        }
    }

    fn state_with(provider: Option<Arc<dyn TextProvider>>) -> AppState {
        AppState {
            config: test_config(),
            provider,
        }
    }

    fn post_ask(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ask_ai")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_prompt_field_returns_400() {
        let app = router(state_with(Some(Arc::new(MockTextProvider::with_answer(
            "unused",
            vec![],
        )))));

        let response = app.oneshot(post_ask(r#"{}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("prompt"));
    }

    #[tokio::test]
    async fn empty_prompt_returns_400() {
        let app = router(state_with(Some(Arc::new(MockTextProvider::with_answer(
            "unused",
            vec![],
        )))));

        let response = app.oneshot(post_ask(r#"{"prompt": ""}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unparsable_body_returns_400() {
        let app = router(state_with(Some(Arc::new(MockTextProvider::with_answer(
            "unused",
            vec![],
        )))));

        let response = app.oneshot(post_ask("not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_service_returns_503() {
        let app = router(state_with(None));

        let response = app
            .oneshot(post_ask(r#"{"prompt": "what is the weather"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn successful_generation_returns_text_and_sources() {
        let provider = MockTextProvider::with_answer(
            "Paris is the capital of France.",
            vec![Source {
                uri: "https://example.com/a".to_string(),
                title: "A".to_string(),
            }],
        );
        let app = router(state_with(Some(Arc::new(provider))));

        let response = app
            .oneshot(post_ask(r#"{"prompt": "capital of France?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["text"], "Paris is the capital of France.");
        assert_eq!(body["sources"][0]["uri"], "https://example.com/a");
        assert_eq!(body["sources"][0]["title"], "A");
    }

    #[tokio::test]
    async fn provider_failure_returns_500() {
        let app = router(state_with(Some(Arc::new(MockTextProvider::failing()))));

        let response = app
            .oneshot(post_ask(r#"{"prompt": "anything"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn health_reports_ok_when_configured() {
        let app = router(state_with(Some(Arc::new(MockTextProvider::with_answer(
            "unused",
            vec![],
        )))));

        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn health_reports_degraded_when_unconfigured() {
        let app = router(state_with(None));

        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "degraded");
    }
}
