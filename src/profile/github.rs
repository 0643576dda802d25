//! GitHub REST + contributions API client.
//! Attributes: `GET {github}/users/{username}` with a bearer token.
//! Contributions: `GET {contributions}/v4/{username}?y=last`, unauthenticated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::{FetchError, GithubUser, ProfileSource};
use crate::metrics::{metric_names, MetricsRegistry};

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_CONTRIBUTIONS_API: &str = "https://github-contributions-api.jogruber.de";

const USER_AGENT: &str = concat!("github-roaster/", env!("CARGO_PKG_VERSION"));

pub struct GithubClient {
    http: reqwest::Client,
    token: Option<String>,
    github_base: String,
    contributions_base: String,
    metrics: Arc<MetricsRegistry>,
}

impl GithubClient {
    pub fn new(
        token: Option<String>,
        github_base: &str,
        contributions_base: &str,
        timeout: Option<Duration>,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            token: token.filter(|t| !t.is_empty()),
            github_base: github_base.trim_end_matches('/').to_string(),
            contributions_base: contributions_base.trim_end_matches('/').to_string(),
            metrics,
        })
    }
}

/// Body of the contributions summary; `total` is keyed by year or `lastYear`.
#[derive(Deserialize)]
struct ContributionsResponse {
    total: HashMap<String, u64>,
}

impl ContributionsResponse {
    fn last_year(&self) -> u64 {
        self.total
            .get("lastYear")
            .copied()
            .unwrap_or_else(|| self.total.values().sum())
    }
}

/// Turn a non-success response into an `Upstream` error carrying status and body.
async fn upstream_error(source_name: &'static str, resp: reqwest::Response) -> FetchError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let body = serde_json::from_str::<serde_json::Value>(&text).ok();
    warn!(
        upstream = source_name,
        status = status.as_u16(),
        body = %text.chars().take(200).collect::<String>(),
        "upstream returned error status"
    );
    FetchError::Upstream {
        source_name,
        status: Some(status.as_u16()),
        body,
        message: format!("unexpected status {status}"),
    }
}

#[async_trait]
impl ProfileSource for GithubClient {
    fn has_credentials(&self) -> bool {
        self.token.is_some()
    }

    async fn user_attributes(&self, username: &str) -> Result<GithubUser, FetchError> {
        let token = self
            .token
            .as_deref()
            .ok_or(FetchError::Config("GITHUB_TOKEN"))?;
        let span = self.metrics.span(metric_names::GITHUB_USER);

        let resp = self
            .http
            .get(format!("{}/users/{}", self.github_base, username))
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| FetchError::transport("github", e))?;

        if !resp.status().is_success() {
            return Err(upstream_error("github", resp).await);
        }

        let user = resp
            .json::<GithubUser>()
            .await
            .map_err(|e| FetchError::transport("github", e))?;
        span.finish();
        Ok(user)
    }

    async fn contributions_last_year(&self, username: &str) -> Result<u64, FetchError> {
        let span = self.metrics.span(metric_names::GITHUB_CONTRIBUTIONS);

        let resp = self
            .http
            .get(format!("{}/v4/{}", self.contributions_base, username))
            .query(&[("y", "last")])
            .send()
            .await
            .map_err(|e| FetchError::transport("contributions", e))?;

        if !resp.status().is_success() {
            return Err(upstream_error("contributions", resp).await);
        }

        let summary = resp
            .json::<ContributionsResponse>()
            .await
            .map_err(|e| FetchError::transport("contributions", e))?;
        span.finish();
        Ok(summary.last_year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_year_total_is_preferred() {
        let summary: ContributionsResponse =
            serde_json::from_str(r#"{"total":{"lastYear":1234},"contributions":[]}"#).unwrap();
        assert_eq!(summary.last_year(), 1234);
    }

    #[test]
    fn yearly_totals_are_summed_otherwise() {
        let summary: ContributionsResponse =
            serde_json::from_str(r#"{"total":{"2023":10,"2024":5}}"#).unwrap();
        assert_eq!(summary.last_year(), 15);
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let client = GithubClient::new(
            Some(String::new()),
            DEFAULT_GITHUB_API,
            DEFAULT_CONTRIBUTIONS_API,
            None,
            Arc::new(MetricsRegistry::new()),
        )
        .unwrap();
        assert!(!client.has_credentials());
    }
}
