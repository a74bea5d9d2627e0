//! Dependency initialization and wiring for the search indexer.

use std::sync::Arc;
use tracing::info;

use super::IndexerSettings;
use crate::IndexingError;
use search_indexer_orchestration::{ChangesetSubmitter, WorkOrchestrator};
use search_indexer_repository::{BulkWork, OpenSearchClient, SearchClient, WorkExecutionContext};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The settings the dependencies were built from.
    pub settings: IndexerSettings,
    /// The running orchestrator.
    pub orchestrator: WorkOrchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`IndexerSettings::from_env`] for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new() -> Result<Self, IndexingError> {
        Self::with_settings(IndexerSettings::from_env()?).await
    }

    /// Initialize all dependencies from already loaded settings.
    pub async fn with_settings(settings: IndexerSettings) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            min_bulk_size = settings.orchestrator.bulker.min_bulk_size,
            max_bulk_size = settings.orchestrator.bulker.max_bulk_size,
            "Initializing dependencies"
        );

        // Initialize OpenSearch client
        let search_client = OpenSearchClient::new(&settings.opensearch_url)
            .await
            .map_err(|e| IndexingError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        // Verify OpenSearch is reachable
        let healthy = search_client
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        let context = WorkExecutionContext::new(Arc::new(search_client));
        let orchestrator =
            WorkOrchestrator::start(context, settings.orchestrator.clone(), BulkWork::factory())?;

        Ok(Self {
            settings,
            orchestrator,
        })
    }

    /// A submitter for tasks feeding changesets to the orchestrator.
    pub fn submitter(&self) -> ChangesetSubmitter {
        self.orchestrator.submitter()
    }

    /// Finish the queued changesets and stop the orchestrator.
    pub async fn shutdown(self) -> Result<(), IndexingError> {
        self.orchestrator.stop().await?;
        Ok(())
    }
}
