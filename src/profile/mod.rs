//! Profile fetching: GitHub attributes + contribution count, merged and cached.
//! Cold path: two concurrent upstream calls, one cache write.
//! Warm path: zero upstream calls.

pub mod cache;
pub mod github;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{metric_names, MetricsRegistry};
use cache::ProfileCache;

/// Merged profile as cached and served by `POST /api/github-profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub username: String,
    pub name: Option<String>,
    pub public_repos: u64,
    pub followers: u64,
    pub following: u64,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub hireable: Option<bool>,
    pub contributions_last_year: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Profile attributes as returned by `GET /users/{username}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub login: String,
    pub name: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub hireable: Option<bool>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub created_at: Option<String>,
}

impl ProfileRecord {
    /// Merge upstream attributes with the contribution total.
    pub fn merge(user: GithubUser, contributions_last_year: u64) -> Self {
        Self {
            username: user.login,
            name: user.name,
            public_repos: user.public_repos,
            followers: user.followers,
            following: user.following,
            bio: user.bio,
            location: user.location,
            company: user.company,
            hireable: user.hireable,
            contributions_last_year,
            avatar_url: user.avatar_url,
            html_url: user.html_url,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("missing configuration: {0}")]
    Config(&'static str),
    #[error("{source_name} request failed: {message}")]
    Upstream {
        source_name: &'static str,
        status: Option<u16>,
        body: Option<serde_json::Value>,
        message: String,
    },
}

impl FetchError {
    /// Transport or decode failure: no upstream status to report.
    pub fn transport(source_name: &'static str, err: impl std::fmt::Display) -> Self {
        FetchError::Upstream {
            source_name,
            status: None,
            body: None,
            message: err.to_string(),
        }
    }
}

/// Upstream profile data sources (adapter for GitHub + contributions API).
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Whether the credential for the attributes lookup is configured.
    fn has_credentials(&self) -> bool;

    async fn user_attributes(&self, username: &str) -> Result<GithubUser, FetchError>;

    async fn contributions_last_year(&self, username: &str) -> Result<u64, FetchError>;
}

pub struct ProfileFetcher {
    source: Arc<dyn ProfileSource>,
    cache: Arc<ProfileCache>,
    metrics: Arc<MetricsRegistry>,
}

impl ProfileFetcher {
    pub fn new(
        source: Arc<dyn ProfileSource>,
        cache: Arc<ProfileCache>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            source,
            cache,
            metrics,
        }
    }

    pub fn cache(&self) -> &Arc<ProfileCache> {
        &self.cache
    }

    /// Return the merged profile for `username`, from cache when fresh.
    /// Failures are never cached.
    pub async fn fetch(&self, username: &str) -> Result<ProfileRecord, FetchError> {
        if let Some(record) = self.cache.get(username) {
            debug!(username, "profile cache hit");
            return Ok(record);
        }

        if !self.source.has_credentials() {
            warn!(username, "GitHub token not configured");
            return Err(FetchError::Config("GITHUB_TOKEN"));
        }

        let span = self.metrics.span(metric_names::PROFILE_FETCH);
        let start = Instant::now();

        let (user, contributions) = futures_util::future::try_join(
            self.source.user_attributes(username),
            self.source.contributions_last_year(username),
        )
        .await
        .inspect_err(|e| warn!(username, error = %e, "profile fetch failed"))?;

        let record = ProfileRecord::merge(user, contributions);
        self.cache.set(username, record.clone());
        span.finish();

        info!(
            username,
            contributions = record.contributions_last_year,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "profile fetched from upstream"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::cache::tests::ManualClock;
    use super::cache::PROFILE_TTL;
    use super::*;

    /// Counts calls; optionally fails the contributions lookup.
    struct FakeSource {
        calls: AtomicUsize,
        fail_contributions: bool,
        token: bool,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_contributions: false,
                token: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileSource for FakeSource {
        fn has_credentials(&self) -> bool {
            self.token
        }

        async fn user_attributes(&self, username: &str) -> Result<GithubUser, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GithubUser {
                login: username.to_string(),
                name: Some("The Octocat".into()),
                public_repos: 8,
                followers: 3938,
                following: 9,
                bio: None,
                location: Some("San Francisco".into()),
                company: Some("@github".into()),
                hireable: None,
                avatar_url: None,
                html_url: None,
                created_at: None,
            })
        }

        async fn contributions_last_year(&self, _username: &str) -> Result<u64, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_contributions {
                return Err(FetchError::Upstream {
                    source_name: "contributions",
                    status: Some(502),
                    body: None,
                    message: "bad gateway".into(),
                });
            }
            Ok(42)
        }
    }

    fn fetcher(source: Arc<FakeSource>, clock: Arc<ManualClock>) -> ProfileFetcher {
        ProfileFetcher::new(
            source,
            Arc::new(ProfileCache::new(PROFILE_TTL, clock)),
            Arc::new(MetricsRegistry::new()),
        )
    }

    #[tokio::test]
    async fn cold_then_warm_fetch() {
        let source = Arc::new(FakeSource::new());
        let fetcher = fetcher(source.clone(), Arc::new(ManualClock::new()));

        let first = fetcher.fetch("octocat").await.unwrap();
        assert_eq!(source.calls(), 2);
        assert_eq!(first.contributions_last_year, 42);
        assert_eq!(fetcher.cache().len(), 1);

        let second = fetcher.fetch("octocat").await.unwrap();
        assert_eq!(source.calls(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn refetches_after_ttl() {
        let source = Arc::new(FakeSource::new());
        let clock = Arc::new(ManualClock::new());
        let fetcher = fetcher(source.clone(), clock.clone());

        fetcher.fetch("octocat").await.unwrap();
        clock.advance(PROFILE_TTL + Duration::from_secs(1));
        fetcher.fetch("octocat").await.unwrap();

        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = Arc::new(FakeSource {
            fail_contributions: true,
            ..FakeSource::new()
        });
        let fetcher = fetcher(source.clone(), Arc::new(ManualClock::new()));

        let err = fetcher.fetch("octocat").await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream { status: Some(502), .. }));
        assert!(fetcher.cache().is_empty());

        fetcher.fetch("octocat").await.unwrap_err();
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn missing_token_is_config_error() {
        let source = Arc::new(FakeSource {
            token: false,
            ..FakeSource::new()
        });
        let fetcher = fetcher(source.clone(), Arc::new(ManualClock::new()));

        let err = fetcher.fetch("octocat").await.unwrap_err();
        assert!(matches!(err, FetchError::Config("GITHUB_TOKEN")));
        assert_eq!(source.calls(), 0);
    }
}
