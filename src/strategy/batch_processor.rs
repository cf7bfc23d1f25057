//! Batch processing with user-based partitioning for concurrent replay
//!
//! This module provides the `BatchProcessor` struct, which applies one batch of
//! operations with as much parallelism as per-user ordering allows.
//!
//! # Design
//!
//! A batch is applied in two phases:
//!
//! 1. Registrations, one after another in file order, so wallet ids follow
//!    the file
//! 2. Everything else, partitioned by initiating user; each partition runs
//!    as its own tokio task and applies its operations in file order
//!
//! Operations of different users may interleave in any order. Whatever the
//! interleaving, the ledger's leases keep every balance consistent.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── WalletService<MemoryBackend>  (shared, cheap to clone)
//! ```

use std::collections::HashMap;

use tracing::error;

use crate::core::{Backend, WalletService};
use crate::types::{LedgerError, Operation, OperationOutcome, OwnerId};

/// Result of applying a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The operation that was applied
    pub operation: Operation,

    /// Its outcome (success or error)
    pub result: Result<OperationOutcome, LedgerError>,
}

/// Batch processor with user-based partitioning
pub struct BatchProcessor<B: Backend> {
    service: WalletService<B>,
}

impl<B: Backend> Clone for BatchProcessor<B> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<B: Backend> BatchProcessor<B> {
    pub fn new(service: WalletService<B>) -> Self {
        Self { service }
    }

    /// Split a batch into registrations and per-user partitions
    ///
    /// # Guarantees
    ///
    /// - Each operation appears exactly once
    /// - Registrations keep their file order
    /// - Each partition holds one user's operations in file order
    pub fn partition_by_user(
        &self,
        batch: Vec<Operation>,
    ) -> (Vec<Operation>, HashMap<OwnerId, Vec<Operation>>) {
        let mut registrations = Vec::new();
        let mut user_batches: HashMap<OwnerId, Vec<Operation>> = HashMap::new();

        for operation in batch {
            match operation.initiator() {
                Some(user) => user_batches.entry(user).or_default().push(operation),
                None => registrations.push(operation),
            }
        }

        (registrations, user_batches)
    }

    /// Apply operations one after another, in order
    ///
    /// Errors are captured in the results and do not stop the sequence.
    pub async fn process_in_order(&self, operations: Vec<Operation>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(operations.len());

        for operation in operations {
            let result = self.service.apply(operation.clone()).await;
            results.push(ProcessingResult { operation, result });
        }

        results
    }

    /// Apply a batch and wait for every operation in it
    ///
    /// Results of registrations come first, in file order; the rest follow in
    /// completion order of their partitions.
    pub async fn process_batch(&self, batch: Vec<Operation>) -> Vec<ProcessingResult> {
        let (registrations, user_batches) = self.partition_by_user(batch);

        let mut results = self.process_in_order(registrations).await;

        let mut tasks = Vec::with_capacity(user_batches.len());
        for (_user, operations) in user_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_in_order(operations).await
            }));
        }

        for task in tasks {
            match task.await {
                Ok(user_results) => results.extend(user_results),
                Err(e) => error!(error = %e, "replay task failed"),
            }
        }

        results
    }
}
