use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{is_unique_violation, StorageError};
use crate::schema::posting_aggregates;
use tallyfolio_core::aggregates::{
    AggregateKey, AggregateRepositoryTrait, DateKind, Period, PostingAggregate,
};
use tallyfolio_core::postings::PostingKind;
use tallyfolio_core::{Error, Result};

use super::model::PostingAggregateDB;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct AggregateRepository {
    pool: DbPool,
    writer: WriteHandle,
}

impl AggregateRepository {
    pub fn new(pool: DbPool, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

type BoxedQuery<'a> = posting_aggregates::BoxedQuery<'a, diesel::sqlite::Sqlite>;

/// Exact-key filter. The sub-type column is part of the key; NULL means
/// "no sub-type" and must match only NULL.
fn filter_by_key(key: &AggregateKey) -> BoxedQuery<'_> {
    let query = posting_aggregates::table
        .filter(posting_aggregates::owner_id.eq(&key.owner_id))
        .filter(posting_aggregates::kind.eq(key.kind.as_str()))
        .filter(posting_aggregates::dimension_id.eq(&key.dimension_id))
        .filter(posting_aggregates::period.eq(key.period.as_str()))
        .filter(posting_aggregates::period_start.eq(key.period_start.format(DATE_FORMAT).to_string()))
        .filter(posting_aggregates::date_kind.eq(key.date_kind.as_str()))
        .into_boxed();
    match key.security_sub_type {
        Some(sub_type) => query.filter(posting_aggregates::security_sub_type.eq(sub_type.as_str())),
        None => query.filter(posting_aggregates::security_sub_type.is_null()),
    }
}

fn find_row(
    conn: &mut SqliteConnection,
    key: &AggregateKey,
) -> std::result::Result<Option<PostingAggregateDB>, StorageError> {
    Ok(filter_by_key(key)
        .first::<PostingAggregateDB>(conn)
        .optional()?)
}

fn add_to_row(
    conn: &mut SqliteConnection,
    row: &PostingAggregateDB,
    delta: Decimal,
) -> std::result::Result<(), StorageError> {
    let current = Decimal::from_str(&row.amount).map_err(|e| {
        StorageError::SerializationError(format!(
            "Aggregate {} holds unparseable amount '{}': {}",
            row.id, row.amount, e
        ))
    })?;
    let next = current + delta;
    diesel::update(posting_aggregates::table.filter(posting_aggregates::id.eq(&row.id)))
        .set((
            posting_aggregates::amount.eq(next.to_string()),
            posting_aggregates::updated_at.eq(Utc::now().to_rfc3339()),
        ))
        .execute(conn)?;
    Ok(())
}

/// Applies one delta to one key: read, then update or insert.
///
/// The read-then-write is race-prone when another writer creates the same
/// key between the miss and the insert; the unique index rejects the
/// second insert and that specific conflict is retried as an update. Any
/// other write failure propagates. A result of exact zero keeps the row.
fn accumulate_one(
    conn: &mut SqliteConnection,
    key: &AggregateKey,
    delta: Decimal,
) -> std::result::Result<(), StorageError> {
    if let Some(row) = find_row(conn, key)? {
        return add_to_row(conn, &row, delta);
    }
    let fresh = PostingAggregateDB::from_key(key, delta);
    match diesel::insert_into(posting_aggregates::table)
        .values(&fresh)
        .execute(conn)
    {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => {
            // Lost the first-contribution race; the row exists now.
            warn!(
                "Aggregate insert for {}/{} lost a unique-index race, retrying as update",
                fresh.dimension_id, fresh.period_start
            );
            let row = find_row(conn, key)?.ok_or_else(|| {
                StorageError::SerializationError(
                    "Aggregate row vanished after unique-constraint conflict".to_string(),
                )
            })?;
            add_to_row(conn, &row, delta)
        }
        Err(e) => Err(StorageError::QueryFailed(e)),
    }
}

#[async_trait]
impl AggregateRepositoryTrait for AggregateRepository {
    async fn accumulate_many(&self, deltas: Vec<(AggregateKey, Decimal)>) -> Result<()> {
        if deltas.is_empty() {
            return Ok(());
        }
        debug!("Accumulating {} aggregate deltas", deltas.len());
        self.writer
            .exec(move |conn| {
                for (key, delta) in &deltas {
                    accumulate_one(conn, key, *delta).map_err(Error::from)?;
                }
                Ok(())
            })
            .await
    }

    fn get_by_key(&self, key: &AggregateKey) -> Result<Option<PostingAggregate>> {
        let mut conn = get_connection(&self.pool)?;
        let row = find_row(&mut conn, key).map_err(Error::from)?;
        row.map(PostingAggregateDB::into_domain).transpose()
    }

    fn get_by_dimension(
        &self,
        owner_id: &str,
        kind: PostingKind,
        dimension_id: &str,
        period: Period,
        date_kind: DateKind,
    ) -> Result<Vec<PostingAggregate>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = posting_aggregates::table
            .filter(posting_aggregates::owner_id.eq(owner_id))
            .filter(posting_aggregates::kind.eq(kind.as_str()))
            .filter(posting_aggregates::dimension_id.eq(dimension_id))
            .filter(posting_aggregates::period.eq(period.as_str()))
            .filter(posting_aggregates::date_kind.eq(date_kind.as_str()))
            .order(posting_aggregates::period_start.asc())
            .load::<PostingAggregateDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(PostingAggregateDB::into_domain).collect()
    }

    fn get_by_kind(
        &self,
        owner_id: &str,
        kind: PostingKind,
        period: Period,
        date_kind: DateKind,
    ) -> Result<Vec<PostingAggregate>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = posting_aggregates::table
            .filter(posting_aggregates::owner_id.eq(owner_id))
            .filter(posting_aggregates::kind.eq(kind.as_str()))
            .filter(posting_aggregates::period.eq(period.as_str()))
            .filter(posting_aggregates::date_kind.eq(date_kind.as_str()))
            .order(posting_aggregates::period_start.asc())
            .load::<PostingAggregateDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(PostingAggregateDB::into_domain).collect()
    }

    async fn delete_all(&self, owner_id: &str) -> Result<usize> {
        let owner_id = owner_id.to_string();
        self.writer
            .exec(move |conn| {
                let removed = diesel::delete(
                    posting_aggregates::table
                        .filter(posting_aggregates::owner_id.eq(&owner_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(removed)
            })
            .await
    }
}
