//! Posting persistence.

pub mod model;
pub mod repository;

pub use model::PostingDB;
pub use repository::PostingRepository;
