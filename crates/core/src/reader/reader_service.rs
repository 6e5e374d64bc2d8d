use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::aggregates::{AggregateRepositoryTrait, DateKind, Period, PostingAggregate};
use crate::postings::{PostingKind, SecuritySubType};
use crate::Result;

use super::reader_model::PeriodTotal;

/// Trait defining the contract for time-series and cross-entity queries.
///
/// Consumes but never mutates aggregates. Reads see whatever is currently
/// persisted; a running or failed rebuild does not block them, so results
/// may transiently reflect a partially-rebuilt state.
pub trait ReaderServiceTrait: Send + Sync {
    /// Time-series for one dimension: the most recent `take` periods,
    /// ascending by period start. Security sub-type rows are summed per
    /// period; use `query_security` to keep them apart.
    fn query(
        &self,
        owner_id: &str,
        kind: PostingKind,
        dimension_id: &str,
        period: Period,
        date_kind: DateKind,
        take: usize,
    ) -> Result<Vec<PeriodTotal>>;

    /// Cross-entity series: per-period sums across all owned dimensions of
    /// one kind.
    fn query_all(
        &self,
        owner_id: &str,
        kind: PostingKind,
        period: Period,
        date_kind: DateKind,
        take: usize,
    ) -> Result<Vec<PeriodTotal>>;

    /// Security series restricted to one sub-type (or to rows without a
    /// sub-type when `None`).
    fn query_security(
        &self,
        owner_id: &str,
        security_id: &str,
        period: Period,
        date_kind: DateKind,
        sub_type: Option<SecuritySubType>,
        take: usize,
    ) -> Result<Vec<PeriodTotal>>;
}

/// Read-side service over the aggregate store.
pub struct AggregateReaderService {
    aggregate_repository: Arc<dyn AggregateRepositoryTrait>,
}

impl AggregateReaderService {
    pub fn new(aggregate_repository: Arc<dyn AggregateRepositoryTrait>) -> Self {
        Self {
            aggregate_repository,
        }
    }

    /// Sums rows per period start and keeps the `take` most recent periods
    /// in ascending order. Summation happens here with exact decimals; the
    /// store is never asked to add amounts.
    fn collapse(rows: Vec<PostingAggregate>, take: usize) -> Vec<PeriodTotal> {
        let mut by_period: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for row in rows {
            *by_period.entry(row.period_start).or_insert(Decimal::ZERO) += row.amount;
        }
        let mut recent: Vec<PeriodTotal> = by_period
            .into_iter()
            .rev()
            .take(take)
            .map(|(period_start, amount)| PeriodTotal {
                period_start,
                amount,
            })
            .collect();
        recent.reverse();
        recent
    }
}

impl ReaderServiceTrait for AggregateReaderService {
    fn query(
        &self,
        owner_id: &str,
        kind: PostingKind,
        dimension_id: &str,
        period: Period,
        date_kind: DateKind,
        take: usize,
    ) -> Result<Vec<PeriodTotal>> {
        debug!(
            "Querying {} periods of {} {} for owner {}",
            take, kind, dimension_id, owner_id
        );
        let rows = self.aggregate_repository.get_by_dimension(
            owner_id,
            kind,
            dimension_id,
            period,
            date_kind,
        )?;
        Ok(Self::collapse(rows, take))
    }

    fn query_all(
        &self,
        owner_id: &str,
        kind: PostingKind,
        period: Period,
        date_kind: DateKind,
        take: usize,
    ) -> Result<Vec<PeriodTotal>> {
        let rows = self
            .aggregate_repository
            .get_by_kind(owner_id, kind, period, date_kind)?;
        Ok(Self::collapse(rows, take))
    }

    fn query_security(
        &self,
        owner_id: &str,
        security_id: &str,
        period: Period,
        date_kind: DateKind,
        sub_type: Option<SecuritySubType>,
        take: usize,
    ) -> Result<Vec<PeriodTotal>> {
        let rows = self.aggregate_repository.get_by_dimension(
            owner_id,
            PostingKind::Security,
            security_id,
            period,
            date_kind,
        )?;
        let filtered = rows
            .into_iter()
            .filter(|row| row.security_sub_type == sub_type)
            .collect();
        Ok(Self::collapse(filtered, take))
    }
}
