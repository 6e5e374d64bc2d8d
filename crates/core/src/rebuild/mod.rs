//! Rebuild module - full recomputation of aggregates from the posting history.

mod rebuild_errors;
mod rebuild_model;
mod rebuild_service;


pub use rebuild_errors::RebuildError;
pub use rebuild_model::{RebuildHandle, RebuildState, RebuildStatus};
pub use rebuild_service::{RebuildService, RebuildServiceTrait};
