//! Rebuild-related error types.

use thiserror::Error;

/// Errors raised by the rebuild coordinator's control surface.
///
/// Replay failures are not represented here: they land in the run's
/// `Failed` status together with the partial progress count.
#[derive(Error, Debug)]
pub enum RebuildError {
    #[error("A rebuild is already running for owner {0}")]
    AlreadyRunning(String),

    #[error("Unknown rebuild handle: {0}")]
    UnknownHandle(String),
}
