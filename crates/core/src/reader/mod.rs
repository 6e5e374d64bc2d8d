//! Reader module - time-series and cross-entity queries over aggregates.

mod reader_model;
mod reader_service;


pub use reader_model::PeriodTotal;
pub use reader_service::{AggregateReaderService, ReaderServiceTrait};
