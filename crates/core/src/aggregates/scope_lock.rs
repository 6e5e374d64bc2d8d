//! Per-owner aggregation locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Registry of per-owner read/write locks coordinating live upserts with
/// full rebuilds.
///
/// Live applies hold the read half for the duration of one batch; a rebuild
/// holds the write half for its whole reset-and-replay window. Incremental
/// upserts for the scope therefore suspend while a rebuild runs, so a
/// posting can never be both replayed from the snapshot and applied live
/// against the freshly reset table, nor slip between the reset and the
/// replay and be dropped.
#[derive(Default)]
pub struct ScopeLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock for one owner scope, created on first use.
    pub fn for_owner(&self, owner_id: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(owner_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }
}
