#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use crate::aggregates::{
        AggregateKey, AggregateRepositoryTrait, AggregationService, DateKind, Period,
        PostingAggregate, ScopeLocks,
    };
    use crate::events::{DomainEvent, MockDomainEventSink};
    use crate::errors::Result as AppResult;
    use crate::postings::{
        NewPosting, Posting, PostingError, PostingKind, PostingRepositoryTrait, PostingService,
        PostingServiceTrait,
    };
    use crate::Error;

    #[derive(Default)]
    struct MockPostingRepository {
        postings: Mutex<Vec<Posting>>,
    }

    impl MockPostingRepository {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn len(&self) -> usize {
            self.postings.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PostingRepositoryTrait for MockPostingRepository {
        async fn create(&self, mut posting: Posting) -> AppResult<Posting> {
            let mut postings = self.postings.lock().unwrap();
            posting.sequence = postings.len() as i64 + 1;
            postings.push(posting.clone());
            Ok(posting)
        }

        fn get(&self, posting_id: &str) -> AppResult<Posting> {
            self.postings
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == posting_id)
                .cloned()
                .ok_or_else(|| PostingError::NotFound(posting_id.to_string()).into())
        }

        fn count_by_owner(&self, owner_id: &str) -> AppResult<i64> {
            Ok(self
                .postings
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.owner_id == owner_id)
                .count() as i64)
        }

        fn max_sequence_by_owner(&self, owner_id: &str) -> AppResult<i64> {
            Ok(self
                .postings
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.owner_id == owner_id)
                .map(|p| p.sequence)
                .max()
                .unwrap_or(0))
        }

        fn list_page_by_sequence(
            &self,
            owner_id: &str,
            after_sequence: i64,
            limit: i64,
            max_sequence: i64,
        ) -> AppResult<Vec<Posting>> {
            let mut page: Vec<Posting> = self
                .postings
                .lock()
                .unwrap()
                .iter()
                .filter(|p| {
                    p.owner_id == owner_id
                        && p.sequence > after_sequence
                        && p.sequence <= max_sequence
                })
                .cloned()
                .collect();
            page.sort_by_key(|p| p.sequence);
            page.truncate(limit as usize);
            Ok(page)
        }
    }

    #[derive(Default)]
    struct MockAggregateRepository {
        rows: Mutex<HashMap<AggregateKey, PostingAggregate>>,
    }

    impl MockAggregateRepository {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn amount(&self, key: &AggregateKey) -> Option<Decimal> {
            self.rows.lock().unwrap().get(key).map(|r| r.amount)
        }

        fn row_count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AggregateRepositoryTrait for MockAggregateRepository {
        async fn accumulate_many(
            &self,
            deltas: Vec<(AggregateKey, Decimal)>,
        ) -> AppResult<()> {
            let mut rows = self.rows.lock().unwrap();
            for (key, delta) in deltas {
                match rows.get_mut(&key) {
                    Some(row) => row.amount += delta,
                    None => {
                        rows.insert(key.clone(), PostingAggregate::new(key, delta));
                    }
                }
            }
            Ok(())
        }

        fn get_by_key(&self, key: &AggregateKey) -> AppResult<Option<PostingAggregate>> {
            Ok(self.rows.lock().unwrap().get(key).cloned())
        }

        fn get_by_dimension(
            &self,
            _owner_id: &str,
            _kind: PostingKind,
            _dimension_id: &str,
            _period: Period,
            _date_kind: DateKind,
        ) -> AppResult<Vec<PostingAggregate>> {
            unimplemented!()
        }

        fn get_by_kind(
            &self,
            _owner_id: &str,
            _kind: PostingKind,
            _period: Period,
            _date_kind: DateKind,
        ) -> AppResult<Vec<PostingAggregate>> {
            unimplemented!()
        }

        async fn delete_all(&self, owner_id: &str) -> AppResult<usize> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|k, _| k.owner_id != owner_id);
            Ok(before - rows.len())
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn setup() -> (
        PostingService,
        Arc<MockPostingRepository>,
        Arc<MockAggregateRepository>,
        Arc<MockDomainEventSink>,
    ) {
        let posting_repository = MockPostingRepository::new();
        let aggregate_repository = MockAggregateRepository::new();
        let sink = Arc::new(MockDomainEventSink::new());
        let aggregation_service = Arc::new(AggregationService::new(
            aggregate_repository.clone(),
            Arc::new(ScopeLocks::new()),
            sink.clone(),
        ));
        let service = PostingService::new(
            posting_repository.clone(),
            aggregation_service,
            sink.clone(),
        );
        (service, posting_repository, aggregate_repository, sink)
    }

    fn bank_draft(amount: Decimal) -> NewPosting {
        NewPosting {
            owner_id: "owner-1".to_string(),
            kind: PostingKind::Bank,
            account_id: Some("acc-1".to_string()),
            contact_id: None,
            savings_plan_id: None,
            security_id: None,
            security_sub_type: None,
            booking_date: d(2025, 3, 10),
            valuta_date: d(2025, 3, 12),
            amount,
        }
    }

    #[tokio::test]
    async fn test_create_posting_persists_and_aggregates() {
        let (service, posting_repository, aggregate_repository, _) = setup();

        let stored = service.create_posting(bank_draft(dec!(100))).await.unwrap();

        assert_eq!(stored.sequence, 1);
        assert_eq!(posting_repository.len(), 1);
        assert_eq!(aggregate_repository.row_count(), 8);
        let month_key = AggregateKey {
            owner_id: "owner-1".to_string(),
            kind: PostingKind::Bank,
            dimension_id: "acc-1".to_string(),
            security_sub_type: None,
            period: Period::Month,
            period_start: d(2025, 3, 1),
            date_kind: DateKind::Booking,
        };
        assert_eq!(aggregate_repository.amount(&month_key), Some(dec!(100)));
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected_before_persistence() {
        let (service, posting_repository, aggregate_repository, sink) = setup();

        let mut draft = bank_draft(dec!(100));
        draft.account_id = None;
        draft.contact_id = Some("con-1".to_string());

        let result = service.create_posting(draft).await;
        assert!(matches!(result, Err(Error::Posting(_))));
        assert_eq!(posting_repository.len(), 0);
        assert_eq!(aggregate_repository.row_count(), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_reverse_posting_books_inverse_and_nets_to_zero() {
        let (service, posting_repository, aggregate_repository, _) = setup();

        let original = service.create_posting(bank_draft(dec!(100))).await.unwrap();
        let reversal = service.reverse_posting(&original.id).await.unwrap();

        assert_ne!(reversal.id, original.id);
        assert_eq!(reversal.amount, dec!(-100));
        assert_eq!(reversal.dimension, original.dimension);
        assert_eq!(reversal.booking_date, original.booking_date);
        assert_eq!(reversal.valuta_date, original.valuta_date);

        // The original row is untouched; the ledger now has both entries.
        assert_eq!(posting_repository.len(), 2);
        assert_eq!(
            posting_repository.get(&original.id).unwrap().amount,
            dec!(100)
        );

        // Every touched aggregate row is back at zero but still present.
        assert_eq!(aggregate_repository.row_count(), 8);
        let month_key = AggregateKey {
            owner_id: "owner-1".to_string(),
            kind: PostingKind::Bank,
            dimension_id: "acc-1".to_string(),
            security_sub_type: None,
            period: Period::Month,
            period_start: d(2025, 3, 1),
            date_kind: DateKind::Booking,
        };
        assert_eq!(aggregate_repository.amount(&month_key), Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_reverse_unknown_posting_fails_loudly() {
        let (service, _, _, _) = setup();
        let result = service.reverse_posting("missing").await;
        assert!(matches!(
            result,
            Err(Error::Posting(PostingError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_events_emitted_for_booking_and_aggregation() {
        let (service, _, _, sink) = setup();

        let stored = service.create_posting(bank_draft(dec!(25))).await.unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| matches!(
            e,
            DomainEvent::AggregatesChanged { owner_id } if owner_id == "owner-1"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            DomainEvent::PostingsChanged { owner_id, posting_ids }
                if owner_id == "owner-1" && posting_ids == &vec![stored.id.clone()]
        )));
    }
}
