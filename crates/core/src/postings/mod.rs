//! Postings module - domain models, services, and traits.

mod postings_errors;
mod postings_model;
mod postings_service;
mod postings_traits;


#[cfg(test)]
mod postings_service_tests;

pub use postings_errors::PostingError;
pub use postings_model::{DimensionRef, NewPosting, Posting, PostingKind, SecuritySubType};
pub use postings_service::PostingService;
pub use postings_traits::{PostingRepositoryTrait, PostingServiceTrait};
