//! Gemini `generateContent` client.
//! One non-streaming request per roast, no retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{RoastError, TextGenerator};
use crate::metrics::{metric_names, MetricsRegistry};

pub const DEFAULT_GEMINI_API: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    metrics: Arc<MetricsRegistry>,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        model: &str,
        timeout: Option<Duration>,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            metrics,
        })
    }
}

/// Key with everything but the first five characters masked, for startup logs.
pub fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(5).collect();
    let hidden = key.chars().count().saturating_sub(5);
    format!("{visible}{}", "*".repeat(hidden))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, RoastError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RoastError::Config("GEMINI_API_KEY"))?;

        let body = serde_json::json!({
            "contents": [
                {"parts": [{"text": prompt}]}
            ]
        });

        let span = self.metrics.span(metric_names::GEMINI_GENERATE);
        let start = Instant::now();
        debug!(model = %self.model, "sending generateContent request");

        let resp = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RoastError::Model(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            let detail = body_text.chars().take(200).collect::<String>();
            warn!(status = status.as_u16(), body = %detail, "Gemini API error");
            return Err(RoastError::Model(format!(
                "unexpected status {status}: {detail}"
            )));
        }

        let parsed = resp
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| RoastError::Model(format!("invalid response: {e}")))?;
        let text = parsed
            .text()
            .ok_or_else(|| RoastError::Model("response contained no candidates".into()))?;

        span.finish();
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "received generateContent response"
        );
        Ok(text)
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated as returned.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_candidate_parts_are_joined() {
        let resp: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"Bhai, "},{"text":"kya kar rahe ho?"}],"role":"model"}},
                {"content":{"parts":[{"text":"ignored"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("Bhai, kya kar rahe ho?"));
    }

    #[test]
    fn blocked_prompt_has_no_text() {
        let resp: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(resp.text().is_none());
    }

    #[test]
    fn key_is_masked() {
        assert_eq!(mask_key("AIzaSy123"), "AIzaS****");
        assert_eq!(mask_key("abc"), "abc");
    }

    #[tokio::test]
    async fn missing_key_is_config_error() {
        let client = GeminiClient::new(
            None,
            DEFAULT_GEMINI_API,
            DEFAULT_GEMINI_MODEL,
            None,
            Arc::new(MetricsRegistry::new()),
        )
        .unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, RoastError::Config("GEMINI_API_KEY")));
    }
}
