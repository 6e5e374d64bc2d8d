//! Posting-related error types.

use thiserror::Error;

use super::postings_model::PostingKind;

/// Errors raised when a posting violates the ledger contract.
///
/// These are caller errors, not aggregation bugs: a malformed posting is
/// rejected before key resolution and must fail loudly, never be skipped.
#[derive(Error, Debug)]
pub enum PostingError {
    #[error("Posting of kind {kind} is missing its {field} id")]
    MissingDimensionId {
        kind: PostingKind,
        field: &'static str,
    },

    #[error("Posting of kind {kind} carries a foreign {field} id")]
    ForeignDimensionId {
        kind: PostingKind,
        field: &'static str,
    },

    #[error("Security sub-type is only valid on security postings, not kind {0}")]
    SubTypeOnNonSecurity(PostingKind),

    #[error("Posting not found: {0}")]
    NotFound(String),

    #[error("Invalid posting data: {0}")]
    InvalidData(String),
}
