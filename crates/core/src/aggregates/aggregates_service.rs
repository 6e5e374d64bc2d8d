use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::events::{DomainEvent, DomainEventSink};
use crate::postings::{Posting, PostingError};
use crate::Result;

use super::aggregates_model::{AggregateKey, Direction};
use super::aggregates_traits::AggregateRepositoryTrait;
use super::key_resolver::resolve_keys;
use super::scope_lock::ScopeLocks;

/// Trait defining the contract for the upsert engine.
#[async_trait]
pub trait AggregationServiceTrait: Send + Sync {
    /// Applies every posting's signed amount to all of its aggregate keys.
    ///
    /// One batch serves one owner scope. Submitting the same posting and
    /// direction twice double-counts; deduplication is the ledger's job.
    async fn apply_postings(&self, postings: &[Posting], direction: Direction) -> Result<()>;
}

/// The upsert engine: fans postings out to their aggregate keys and applies
/// the resulting deltas through the aggregate store.
pub struct AggregationService {
    aggregate_repository: Arc<dyn AggregateRepositoryTrait>,
    scope_locks: Arc<ScopeLocks>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl AggregationService {
    pub fn new(
        aggregate_repository: Arc<dyn AggregateRepositoryTrait>,
        scope_locks: Arc<ScopeLocks>,
        event_sink: Arc<dyn DomainEventSink>,
    ) -> Self {
        Self {
            aggregate_repository,
            scope_locks,
            event_sink,
        }
    }

    /// Collapses a batch into one delta per key before any storage round
    /// trip: N postings hitting the same key cost one read-modify-write.
    fn accumulate_deltas(
        postings: &[Posting],
        direction: Direction,
    ) -> HashMap<AggregateKey, Decimal> {
        let sign = direction.sign();
        let mut deltas: HashMap<AggregateKey, Decimal> = HashMap::new();
        for posting in postings {
            for key in resolve_keys(posting) {
                *deltas.entry(key).or_insert(Decimal::ZERO) += sign * posting.amount;
            }
        }
        deltas
    }

    async fn apply_deltas(&self, postings: &[Posting], direction: Direction) -> Result<()> {
        let deltas = Self::accumulate_deltas(postings, direction);
        // Stable write order keeps storage behavior reproducible.
        let mut batch: Vec<(AggregateKey, Decimal)> = deltas.into_iter().collect();
        batch.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(
            "Applying {} aggregate deltas for {} postings",
            batch.len(),
            postings.len()
        );
        self.aggregate_repository.accumulate_many(batch).await
    }

    /// Rebuild replay entry point.
    ///
    /// The rebuild coordinator already holds the owner's exclusive
    /// aggregation lock, so no read lock is taken here. Replay deltas do
    /// not emit change events; the rebuild emits its own terminal event.
    pub(crate) async fn apply_postings_unlocked(
        &self,
        postings: &[Posting],
        direction: Direction,
    ) -> Result<()> {
        if postings.is_empty() {
            return Ok(());
        }
        self.apply_deltas(postings, direction).await
    }
}

#[async_trait]
impl AggregationServiceTrait for AggregationService {
    async fn apply_postings(&self, postings: &[Posting], direction: Direction) -> Result<()> {
        if postings.is_empty() {
            return Ok(());
        }
        let owner_id = postings[0].owner_id.clone();
        if let Some(foreign) = postings.iter().find(|p| p.owner_id != owner_id) {
            return Err(PostingError::InvalidData(format!(
                "Batch mixes owner scopes {} and {}",
                owner_id, foreign.owner_id
            ))
            .into());
        }

        let lock = self.scope_locks.for_owner(&owner_id);
        let _guard = lock.read().await;
        self.apply_deltas(postings, direction).await?;
        self.event_sink
            .emit(DomainEvent::aggregates_changed(owner_id));
        Ok(())
    }
}
