//! Aggregates module - period bucketing, key resolution, and the upsert engine.

mod aggregates_model;
mod aggregates_service;
mod aggregates_traits;
mod key_resolver;
mod period;
mod scope_lock;


pub use aggregates_model::{AggregateKey, DateKind, Direction, PostingAggregate};
pub use aggregates_service::{AggregationService, AggregationServiceTrait};
pub use aggregates_traits::AggregateRepositoryTrait;
pub use key_resolver::resolve_keys;
pub use period::Period;
pub use scope_lock::ScopeLocks;
