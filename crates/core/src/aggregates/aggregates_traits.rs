use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::postings::PostingKind;
use crate::Result;

use super::aggregates_model::{AggregateKey, DateKind, PostingAggregate};
use super::period::Period;

/// Contract for the persisted aggregate store.
///
/// Implementations enforce the one-row-per-key invariant at the storage
/// level (unique index), not only in application logic.
#[async_trait]
pub trait AggregateRepositoryTrait: Send + Sync {
    /// Applies a batch of per-key deltas in one storage transaction.
    ///
    /// Creates missing rows; keeps rows that reach an exact zero. An insert
    /// losing a first-contribution race to the unique index is detected as
    /// a unique violation and retried as an update inside the
    /// implementation; that conflict never surfaces to callers.
    async fn accumulate_many(&self, deltas: Vec<(AggregateKey, Decimal)>) -> Result<()>;

    fn get_by_key(&self, key: &AggregateKey) -> Result<Option<PostingAggregate>>;

    /// All rows (including per-sub-type rows) for one dimension id at one
    /// granularity, ascending by period start.
    fn get_by_dimension(
        &self,
        owner_id: &str,
        kind: PostingKind,
        dimension_id: &str,
        period: Period,
        date_kind: DateKind,
    ) -> Result<Vec<PostingAggregate>>;

    /// All rows of one kind at one granularity across all owned dimensions.
    fn get_by_kind(
        &self,
        owner_id: &str,
        kind: PostingKind,
        period: Period,
        date_kind: DateKind,
    ) -> Result<Vec<PostingAggregate>>;

    /// Rebuild reset step: removes every aggregate row in the owner scope.
    /// Returns the number of deleted rows.
    async fn delete_all(&self, owner_id: &str) -> Result<usize>;
}
