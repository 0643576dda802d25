//! Roast generation: prompt from a profile + language, one generative call.
//! The model's text is returned verbatim; word limits are advisory only.

pub mod gemini;
pub mod prompt;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics::{metric_names, MetricsRegistry};
use crate::profile::ProfileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Hindi,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::English => write!(f, "english"),
            Language::Hindi => write!(f, "hindi"),
        }
    }
}

impl FromStr for Language {
    type Err = RoastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "english" => Ok(Language::English),
            "hindi" => Ok(Language::Hindi),
            _ => Err(RoastError::Validation(
                "Invalid language specified. Use 'english' or 'hindi'.".into(),
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoastError {
    #[error("{0}")]
    Validation(String),
    #[error("missing configuration: {0}")]
    Config(&'static str),
    #[error("Gemini API error: {0}")]
    Model(String),
}

/// Generative text backend (adapter for the hosted model).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, RoastError>;
}

pub struct RoastGenerator {
    model: Arc<dyn TextGenerator>,
    metrics: Arc<MetricsRegistry>,
}

impl RoastGenerator {
    pub fn new(model: Arc<dyn TextGenerator>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { model, metrics }
    }

    /// Generate a roast. An absent profile fails before any model call.
    pub async fn generate(
        &self,
        profile: Option<&ProfileRecord>,
        language: Language,
    ) -> Result<String, RoastError> {
        let profile =
            profile.ok_or_else(|| RoastError::Validation("Profile data is missing".into()))?;

        let prompt = prompt::build_prompt(profile, language);
        let span = self.metrics.span(metric_names::ROAST_GENERATE);

        let roast = self.model.generate(&prompt).await.inspect_err(|e| {
            warn!(username = %profile.username, %language, error = %e, "roast generation failed")
        })?;

        span.finish();
        info!(username = %profile.username, %language, "roast generated");
        Ok(roast)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::profile::cache::tests::record;

    /// Echoes a canned reply per language and remembers prompts.
    pub(crate) struct FakeModel {
        pub(crate) calls: AtomicUsize,
        pub(crate) prompts: Mutex<Vec<String>>,
        pub(crate) fail: bool,
    }

    impl FakeModel {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for FakeModel {
        async fn generate(&self, prompt: &str) -> Result<String, RoastError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().push(prompt.to_string());
            if self.fail {
                return Err(RoastError::Model("quota exceeded".into()));
            }
            if prompt.contains("Hindi") {
                Ok("Bhai, itne followers aur commits kahan hain?".into())
            } else {
                Ok("Bro really said ship it and then shipped nothing.".into())
            }
        }
    }

    #[test]
    fn language_parsing() {
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert_eq!("hindi".parse::<Language>().unwrap(), Language::Hindi);
        assert!("English".parse::<Language>().is_err());
        assert!("french".parse::<Language>().is_err());
    }

    #[tokio::test]
    async fn missing_profile_skips_model() {
        let model = Arc::new(FakeModel::new());
        let generator = RoastGenerator::new(model.clone(), Arc::new(MetricsRegistry::new()));

        let err = generator.generate(None, Language::English).await.unwrap_err();
        assert!(matches!(err, RoastError::Validation(_)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn model_text_is_returned_verbatim() {
        let model = Arc::new(FakeModel::new());
        let generator = RoastGenerator::new(model.clone(), Arc::new(MetricsRegistry::new()));
        let profile = record("octocat");

        let english = generator
            .generate(Some(&profile), Language::English)
            .await
            .unwrap();
        let hindi = generator
            .generate(Some(&profile), Language::Hindi)
            .await
            .unwrap();

        assert_eq!(english, "Bro really said ship it and then shipped nothing.");
        assert_ne!(english, hindi);
        assert_eq!(model.calls(), 2);
        assert!(model.prompts.lock()[0].contains("Name: The Octocat"));
    }

    #[tokio::test]
    async fn model_failure_is_wrapped() {
        let model = Arc::new(FakeModel {
            fail: true,
            ..FakeModel::new()
        });
        let generator = RoastGenerator::new(model, Arc::new(MetricsRegistry::new()));
        let err = generator
            .generate(Some(&record("octocat")), Language::Hindi)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Gemini API error: quota exceeded");
    }
}
