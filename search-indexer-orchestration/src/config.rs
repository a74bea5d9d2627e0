//! Configuration types for the bulker and the orchestrator.

use crate::errors::OrchestrationError;

/// Bounds on the size of a bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkerConfig {
    /// Minimum number of works in a single bulk.
    /// Fewer works are executed individually. `1` means always bulk.
    pub min_bulk_size: usize,
    /// Maximum number of works in a single bulk.
    /// Reaching it sequences and finalizes the bulk immediately.
    pub max_bulk_size: usize,
}

impl Default for BulkerConfig {
    fn default() -> Self {
        Self {
            min_bulk_size: 2,
            max_bulk_size: 100,
        }
    }
}

impl BulkerConfig {
    pub fn new(min_bulk_size: usize, max_bulk_size: usize) -> Self {
        Self {
            min_bulk_size,
            max_bulk_size,
        }
    }

    /// Check that both bounds are positive and ordered.
    pub fn validate(&self) -> Result<(), OrchestrationError> {
        if self.min_bulk_size == 0 {
            return Err(OrchestrationError::invalid_config(
                "min_bulk_size must be at least 1",
            ));
        }
        if self.max_bulk_size < self.min_bulk_size {
            return Err(OrchestrationError::invalid_config(format!(
                "max_bulk_size {} is lower than min_bulk_size {}",
                self.max_bulk_size, self.min_bulk_size
            )));
        }
        Ok(())
    }
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Bulk size bounds.
    pub bulker: BulkerConfig,
    /// Number of changesets that can wait in the queue.
    pub queue_capacity: usize,
    /// Maximum number of queued changesets processed as one batch.
    pub max_changesets_per_batch: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bulker: BulkerConfig::default(),
            queue_capacity: 1000,
            max_changesets_per_batch: 50,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), OrchestrationError> {
        self.bulker.validate()?;
        if self.queue_capacity == 0 {
            return Err(OrchestrationError::invalid_config(
                "queue_capacity must be at least 1",
            ));
        }
        if self.max_changesets_per_batch == 0 {
            return Err(OrchestrationError::invalid_config(
                "max_changesets_per_batch must be at least 1",
            ));
        }
        Ok(())
    }
}
