//! Usage counter: a single monotonically increasing integer.
//! Backing is chosen once at startup: SQLite in production, an atomic otherwise.

pub mod sqlite;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{AppConfig, DeployEnv};
use sqlite::SqliteCounter;

/// Storage key of the shared counter.
pub const USER_COUNT_KEY: &str = "github_roaster_user_count";

#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("counter store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("counter task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait UsageCounter: Send + Sync {
    async fn read(&self) -> Result<u64, CounterError>;

    /// Increment by one and return the new value.
    async fn increment(&self) -> Result<u64, CounterError>;
}

/// Process-local counter. Lost on restart; not shared between processes.
#[derive(Default)]
pub struct LocalCounter {
    value: AtomicU64,
}

impl LocalCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageCounter for LocalCounter {
    async fn read(&self) -> Result<u64, CounterError> {
        Ok(self.value.load(Ordering::SeqCst))
    }

    async fn increment(&self) -> Result<u64, CounterError> {
        Ok(self.value.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Resolve the counter backing for this deployment.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn UsageCounter>, CounterError> {
    match config.deploy_env {
        DeployEnv::Production => {
            let counter = SqliteCounter::open(&config.counter_db_path, USER_COUNT_KEY)?;
            Ok(Arc::new(counter))
        }
        DeployEnv::Development => {
            info!("using process-local usage counter");
            Ok(Arc::new(LocalCounter::new()))
        }
    }
}
