//! Settings read from the environment.

use std::env;
use std::str::FromStr;

use crate::IndexingError;
use search_indexer_orchestration::{BulkerConfig, OrchestratorConfig};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Everything the indexer needs to start.
#[derive(Debug, Clone)]
pub struct IndexerSettings {
    /// OpenSearch server URL.
    pub opensearch_url: String,
    /// Bulking and queueing of works.
    pub orchestrator: OrchestratorConfig,
}

impl IndexerSettings {
    /// Read the settings from the environment, after loading `.env` if present.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `SEARCH_MIN_BULK_SIZE`: fewer pending works are executed one by one (default: 2)
    /// - `SEARCH_MAX_BULK_SIZE`: works per bulk request at most (default: 100)
    /// - `SEARCH_QUEUE_CAPACITY`: changesets waiting to be processed (default: 1000)
    /// - `SEARCH_MAX_CHANGESETS_PER_BATCH`: changesets sharing one sequence (default: 50)
    pub fn from_env() -> Result<Self, IndexingError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the settings through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = OrchestratorConfig::default();

        let opensearch_url =
            lookup("OPENSEARCH_URL").unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string());

        let orchestrator = OrchestratorConfig {
            bulker: BulkerConfig::new(
                parse_or(&lookup, "SEARCH_MIN_BULK_SIZE", defaults.bulker.min_bulk_size)?,
                parse_or(&lookup, "SEARCH_MAX_BULK_SIZE", defaults.bulker.max_bulk_size)?,
            ),
            queue_capacity: parse_or(&lookup, "SEARCH_QUEUE_CAPACITY", defaults.queue_capacity)?,
            max_changesets_per_batch: parse_or(
                &lookup,
                "SEARCH_MAX_CHANGESETS_PER_BATCH",
                defaults.max_changesets_per_batch,
            )?,
        };

        orchestrator
            .validate()
            .map_err(|e| IndexingError::config(e.to_string()))?;

        Ok(Self {
            opensearch_url,
            orchestrator,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, IndexingError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| IndexingError::config(format!("Invalid {} '{}': {}", key, value, e))),
        None => Ok(default),
    }
}
