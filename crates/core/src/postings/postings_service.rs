use chrono::Utc;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use async_trait::async_trait;

use crate::aggregates::{AggregationServiceTrait, Direction};
use crate::events::{DomainEvent, DomainEventSink};
use crate::Result;

use super::postings_model::{NewPosting, Posting};
use super::postings_traits::{PostingRepositoryTrait, PostingServiceTrait};

/// Service for booking and reversing postings.
///
/// Thin persistence-plus-hook layer over the ledger: every booked posting
/// flows through the aggregation engine in the same call.
pub struct PostingService {
    posting_repository: Arc<dyn PostingRepositoryTrait>,
    aggregation_service: Arc<dyn AggregationServiceTrait>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl PostingService {
    pub fn new(
        posting_repository: Arc<dyn PostingRepositoryTrait>,
        aggregation_service: Arc<dyn AggregationServiceTrait>,
        event_sink: Arc<dyn DomainEventSink>,
    ) -> Self {
        Self {
            posting_repository,
            aggregation_service,
            event_sink,
        }
    }

    async fn book(&self, posting: Posting) -> Result<Posting> {
        let stored = self.posting_repository.create(posting).await?;
        self.aggregation_service
            .apply_postings(std::slice::from_ref(&stored), Direction::Apply)
            .await?;
        self.event_sink.emit(DomainEvent::postings_changed(
            stored.owner_id.clone(),
            vec![stored.id.clone()],
        ));
        Ok(stored)
    }
}

#[async_trait]
impl PostingServiceTrait for PostingService {
    async fn create_posting(&self, draft: NewPosting) -> Result<Posting> {
        let dimension = draft.dimension()?;
        let now = Utc::now();
        let posting = Posting {
            id: Uuid::new_v4().to_string(),
            owner_id: draft.owner_id,
            dimension,
            booking_date: draft.booking_date,
            valuta_date: draft.valuta_date,
            amount: draft.amount,
            sequence: 0,
            created_at: now,
            updated_at: now,
        };
        debug!(
            "Booking posting {} ({} {})",
            posting.id,
            posting.kind(),
            posting.dimension_id()
        );
        self.book(posting).await
    }

    async fn reverse_posting(&self, posting_id: &str) -> Result<Posting> {
        let original = self.posting_repository.get(posting_id)?;
        let now = Utc::now();
        let reversal = Posting {
            id: Uuid::new_v4().to_string(),
            owner_id: original.owner_id.clone(),
            dimension: original.dimension.clone(),
            booking_date: original.booking_date,
            valuta_date: original.valuta_date,
            amount: -original.amount,
            sequence: 0,
            created_at: now,
            updated_at: now,
        };
        debug!("Reversing posting {} with {}", posting_id, reversal.id);
        self.book(reversal).await
    }

    fn get_posting(&self, posting_id: &str) -> Result<Posting> {
        self.posting_repository.get(posting_id)
    }
}
