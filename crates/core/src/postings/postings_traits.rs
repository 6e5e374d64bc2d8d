use async_trait::async_trait;

use super::postings_model::{NewPosting, Posting};
use crate::Result;

/// Trait defining the contract for Posting repository operations.
#[async_trait]
pub trait PostingRepositoryTrait: Send + Sync {
    /// Persists a posting and returns it with its storage-assigned sequence.
    async fn create(&self, posting: Posting) -> Result<Posting>;

    fn get(&self, posting_id: &str) -> Result<Posting>;

    fn count_by_owner(&self, owner_id: &str) -> Result<i64>;

    /// Highest assigned sequence for an owner; zero when no postings exist.
    /// Rebuilds snapshot this under their exclusive lock.
    fn max_sequence_by_owner(&self, owner_id: &str) -> Result<i64>;

    /// One replay page: postings with `after_sequence < sequence <= max_sequence`,
    /// ascending by sequence, at most `limit` rows.
    fn list_page_by_sequence(
        &self,
        owner_id: &str,
        after_sequence: i64,
        limit: i64,
        max_sequence: i64,
    ) -> Result<Vec<Posting>>;
}

/// Trait defining the contract for Posting service operations.
#[async_trait]
pub trait PostingServiceTrait: Send + Sync {
    /// Validates, persists, and aggregates a new posting.
    async fn create_posting(&self, draft: NewPosting) -> Result<Posting>;

    /// Books an explicit reversal posting (inverse amount, same dimension
    /// and dates) for an existing posting. The original is never mutated.
    async fn reverse_posting(&self, posting_id: &str) -> Result<Posting>;

    fn get_posting(&self, posting_id: &str) -> Result<Posting>;
}
