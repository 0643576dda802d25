//! Server configuration: CLI flags with environment fallbacks, resolved once at startup.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Args;

use crate::profile::github::{DEFAULT_CONTRIBUTIONS_API, DEFAULT_GITHUB_API};
use crate::roast::gemini::{DEFAULT_GEMINI_API, DEFAULT_GEMINI_MODEL};

/// Deployment environment. Only `production` selects the durable counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployEnv {
    Production,
    Development,
}

impl FromStr for DeployEnv {
    type Err = std::convert::Infallible;

    /// Anything other than `production` (case-insensitive) is a development deployment.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("production") {
            Ok(DeployEnv::Production)
        } else {
            Ok(DeployEnv::Development)
        }
    }
}

impl fmt::Display for DeployEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployEnv::Production => write!(f, "production"),
            DeployEnv::Development => write!(f, "development"),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "PORT")]
    pub port: u16,

    /// GitHub token used for the profile attributes lookup
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Deployment environment; `production` stores the usage counter in SQLite
    #[arg(long, default_value = "development", env = "APP_ENV")]
    pub deploy_env: DeployEnv,

    /// SQLite file for the durable usage counter
    #[arg(long, default_value = "user_count.db", env = "COUNTER_DB_PATH")]
    pub counter_db: PathBuf,

    /// Gemini model name
    #[arg(long, default_value = DEFAULT_GEMINI_MODEL, env = "GEMINI_MODEL")]
    pub gemini_model: String,

    #[arg(long, default_value = DEFAULT_GITHUB_API, env = "GITHUB_API_URL")]
    pub github_api_url: String,

    #[arg(long, default_value = DEFAULT_CONTRIBUTIONS_API, env = "CONTRIBUTIONS_API_URL")]
    pub contributions_api_url: String,

    #[arg(long, default_value = DEFAULT_GEMINI_API, env = "GEMINI_API_URL")]
    pub gemini_api_url: String,

    /// Timeout for each upstream call in seconds (unset: wait indefinitely)
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

/// Resolved configuration shared by the server components.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub github_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub deploy_env: DeployEnv,
    pub counter_db_path: PathBuf,
    pub gemini_model: String,
    pub github_api_url: String,
    pub contributions_api_url: String,
    pub gemini_api_url: String,
    pub upstream_timeout: Option<Duration>,
}

impl From<ServeArgs> for AppConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            bind_addr: format!("{}:{}", args.host, args.port),
            github_token: args.github_token.filter(|t| !t.is_empty()),
            gemini_api_key: args.gemini_api_key.filter(|k| !k.is_empty()),
            deploy_env: args.deploy_env,
            counter_db_path: args.counter_db,
            gemini_model: args.gemini_model,
            github_api_url: args.github_api_url,
            contributions_api_url: args.contributions_api_url,
            gemini_api_url: args.gemini_api_url,
            upstream_timeout: args.upstream_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl AppConfig {
    /// Config pointing every upstream at `base_url`, as used by local fakes.
    pub fn for_upstream(base_url: &str) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            github_token: Some("test-token".into()),
            gemini_api_key: Some("test-key".into()),
            deploy_env: DeployEnv::Development,
            counter_db_path: PathBuf::from("user_count.db"),
            gemini_model: DEFAULT_GEMINI_MODEL.into(),
            github_api_url: base_url.into(),
            contributions_api_url: base_url.into(),
            gemini_api_url: base_url.into(),
            upstream_timeout: Some(Duration::from_secs(10)),
        }
    }
}
