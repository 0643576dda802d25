//! Client-side request orchestration: profile endpoint, then roast endpoint.
//! Either stage failing aborts the sequence; callers only see one generic failure.

use std::time::Duration;

use tracing::{debug, warn};

use crate::profile::ProfileRecord;
use crate::roast::Language;
use crate::routes::{ProfileRequest, RoastResponse};

/// Message shown for any failed roast, whichever stage failed.
pub const GENERIC_FAILURE: &str = "An error occurred. Please check the username and try again.";

/// Stage that failed; kept for logs, collapsed to `GENERIC_FAILURE` for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Profile,
    Roast,
}

#[derive(Debug, thiserror::Error)]
#[error("An error occurred. Please check the username and try again.")]
pub struct ClientError {
    pub stage: Stage,
    #[source]
    pub cause: reqwest::Error,
}

pub struct RoastClient {
    http: reqwest::Client,
    base_url: String,
}

impl RoastClient {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the profile, then request a roast for it. No retries.
    pub async fn roast(&self, username: &str, language: Language) -> Result<String, ClientError> {
        let profile = self
            .fetch_profile(username)
            .await
            .map_err(|cause| fail(Stage::Profile, cause))?;
        debug!(username, repos = profile.public_repos, "profile received");

        let roast = self
            .generate(&profile, language)
            .await
            .map_err(|cause| fail(Stage::Roast, cause))?;
        Ok(roast.roast)
    }

    async fn fetch_profile(&self, username: &str) -> Result<ProfileRecord, reqwest::Error> {
        self.http
            .post(format!("{}/api/github-profile", self.base_url))
            .json(&ProfileRequest {
                username: username.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn generate(
        &self,
        profile: &ProfileRecord,
        language: Language,
    ) -> Result<RoastResponse, reqwest::Error> {
        self.http
            .post(format!("{}/api/generate-roast", self.base_url))
            .json(&serde_json::json!({
                "profileData": profile,
                "language": language,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

fn fail(stage: Stage, cause: reqwest::Error) -> ClientError {
    warn!(?stage, error = %cause, "roast request failed");
    ClientError { stage, cause }
}
