use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use async_trait::async_trait;

use crate::aggregates::{
    AggregateRepositoryTrait, AggregationService, Direction, ScopeLocks,
};
use crate::constants::REBUILD_REPLAY_BATCH_SIZE;
use crate::events::{DomainEvent, DomainEventSink};
use crate::postings::PostingRepositoryTrait;
use crate::Result;

use super::rebuild_errors::RebuildError;
use super::rebuild_model::{RebuildHandle, RebuildState, RebuildStatus};

/// Trait defining the contract for the rebuild coordinator.
#[async_trait]
pub trait RebuildServiceTrait: Send + Sync {
    /// Starts a full rebuild for one owner scope and returns its handle.
    /// Refuses to start while another rebuild for the same owner is running.
    async fn start_rebuild(&self, owner_id: &str) -> Result<RebuildHandle>;

    fn get_rebuild_status(&self, handle: &RebuildHandle) -> Result<RebuildStatus>;

    /// Requests cooperative cancellation; checked between replay batches.
    fn cancel_rebuild(&self, handle: &RebuildHandle) -> Result<()>;
}

struct RebuildEntry {
    owner_id: String,
    status: RebuildStatus,
    cancel: Arc<AtomicBool>,
}

type RunRegistry = Arc<Mutex<HashMap<String, RebuildEntry>>>;

/// Full recomputation coordinator.
///
/// Holds the owner's exclusive aggregation lock for the whole
/// reset-and-replay window, so live incremental upserts for the scope
/// suspend until the rebuild reaches a terminal state. Replay goes through
/// the same upsert engine as live traffic; correctness does not depend on
/// replay order because addition is commutative.
pub struct RebuildService {
    posting_repository: Arc<dyn PostingRepositoryTrait>,
    aggregate_repository: Arc<dyn AggregateRepositoryTrait>,
    aggregation_service: Arc<AggregationService>,
    scope_locks: Arc<ScopeLocks>,
    event_sink: Arc<dyn DomainEventSink>,
    runs: RunRegistry,
}

struct RunContext {
    handle_id: String,
    owner_id: String,
    cancel: Arc<AtomicBool>,
    posting_repository: Arc<dyn PostingRepositoryTrait>,
    aggregate_repository: Arc<dyn AggregateRepositoryTrait>,
    aggregation_service: Arc<AggregationService>,
    scope_locks: Arc<ScopeLocks>,
    runs: RunRegistry,
}

impl RunContext {
    fn update_status(&self, f: impl FnOnce(&mut RebuildStatus)) {
        let mut runs = self.runs.lock().unwrap();
        if let Some(entry) = runs.get_mut(&self.handle_id) {
            f(&mut entry.status);
        }
    }
}

impl RebuildService {
    pub fn new(
        posting_repository: Arc<dyn PostingRepositoryTrait>,
        aggregate_repository: Arc<dyn AggregateRepositoryTrait>,
        aggregation_service: Arc<AggregationService>,
        scope_locks: Arc<ScopeLocks>,
        event_sink: Arc<dyn DomainEventSink>,
    ) -> Self {
        Self {
            posting_repository,
            aggregate_repository,
            aggregation_service,
            scope_locks,
            event_sink,
            runs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn run(ctx: RunContext, event_sink: Arc<dyn DomainEventSink>) {
        let owner_id = ctx.owner_id.clone();
        let state = match Self::replay(&ctx).await {
            Ok(true) => {
                info!("Rebuild for owner {} completed", owner_id);
                RebuildState::Completed
            }
            Ok(false) => {
                warn!("Rebuild for owner {} cancelled; aggregates are stale until restarted", owner_id);
                RebuildState::Cancelled
            }
            Err(e) => {
                error!("Rebuild for owner {} failed: {}", owner_id, e);
                let message = e.to_string();
                ctx.update_status(|s| s.error = Some(message));
                RebuildState::Failed
            }
        };
        ctx.update_status(|s| s.state = state);
        event_sink.emit(DomainEvent::rebuild_finished(owner_id, state));
    }

    /// Reset and replay under the owner's exclusive lock.
    ///
    /// Returns `Ok(true)` on completion, `Ok(false)` on cancellation.
    async fn replay(ctx: &RunContext) -> Result<bool> {
        let lock = ctx.scope_locks.for_owner(&ctx.owner_id);
        let _guard = lock.write().await;

        // Snapshot the replay window under the lock: postings booked after
        // the rebuild started carry a higher sequence and are applied live
        // once the lock is released, so they are counted exactly once.
        let max_sequence = ctx.posting_repository.max_sequence_by_owner(&ctx.owner_id)?;
        let total = ctx.posting_repository.count_by_owner(&ctx.owner_id)? as u64;
        ctx.update_status(|s| s.total = total);

        let removed = ctx.aggregate_repository.delete_all(&ctx.owner_id).await?;
        info!(
            "Rebuild for owner {}: reset {} aggregate rows, replaying {} postings up to sequence {}",
            ctx.owner_id, removed, total, max_sequence
        );

        let mut after_sequence = 0i64;
        loop {
            if ctx.cancel.load(Ordering::Relaxed) {
                return Ok(false);
            }
            let page = ctx.posting_repository.list_page_by_sequence(
                &ctx.owner_id,
                after_sequence,
                REBUILD_REPLAY_BATCH_SIZE,
                max_sequence,
            )?;
            let Some(last) = page.last() else {
                break;
            };
            after_sequence = last.sequence;
            ctx.aggregation_service
                .apply_postings_unlocked(&page, Direction::Apply)
                .await?;
            ctx.update_status(|s| s.processed += page.len() as u64);
        }
        Ok(true)
    }
}

#[async_trait]
impl RebuildServiceTrait for RebuildService {
    async fn start_rebuild(&self, owner_id: &str) -> Result<RebuildHandle> {
        // Pre-lock count for initial progress display; the replay task
        // recomputes the authoritative snapshot under the scope lock.
        let total = self.posting_repository.count_by_owner(owner_id)? as u64;

        let (handle_id, cancel) = {
            let mut runs = self.runs.lock().unwrap();
            if runs
                .values()
                .any(|e| e.owner_id == owner_id && e.status.state == RebuildState::Running)
            {
                return Err(RebuildError::AlreadyRunning(owner_id.to_string()).into());
            }
            let handle_id = Uuid::new_v4().to_string();
            let cancel = Arc::new(AtomicBool::new(false));
            runs.insert(
                handle_id.clone(),
                RebuildEntry {
                    owner_id: owner_id.to_string(),
                    status: RebuildStatus::running(total),
                    cancel: cancel.clone(),
                },
            );
            (handle_id, cancel)
        };

        info!("Starting rebuild {} for owner {}", handle_id, owner_id);
        let ctx = RunContext {
            handle_id: handle_id.clone(),
            owner_id: owner_id.to_string(),
            cancel,
            posting_repository: self.posting_repository.clone(),
            aggregate_repository: self.aggregate_repository.clone(),
            aggregation_service: self.aggregation_service.clone(),
            scope_locks: self.scope_locks.clone(),
            runs: self.runs.clone(),
        };
        let event_sink = self.event_sink.clone();
        tokio::spawn(Self::run(ctx, event_sink));

        Ok(RebuildHandle { id: handle_id })
    }

    fn get_rebuild_status(&self, handle: &RebuildHandle) -> Result<RebuildStatus> {
        let runs = self.runs.lock().unwrap();
        runs.get(&handle.id)
            .map(|entry| entry.status.clone())
            .ok_or_else(|| RebuildError::UnknownHandle(handle.id.clone()).into())
    }

    fn cancel_rebuild(&self, handle: &RebuildHandle) -> Result<()> {
        let runs = self.runs.lock().unwrap();
        let entry = runs
            .get(&handle.id)
            .ok_or_else(|| RebuildError::UnknownHandle(handle.id.clone()))?;
        entry.cancel.store(true, Ordering::Relaxed);
        Ok(())
    }
}
