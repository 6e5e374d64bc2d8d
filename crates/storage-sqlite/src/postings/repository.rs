use async_trait::async_trait;
use diesel::prelude::*;
use log::debug;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::postings;
use tallyfolio_core::postings::{Posting, PostingError, PostingRepositoryTrait};
use tallyfolio_core::Result;

use super::model::PostingDB;

pub struct PostingRepository {
    pool: DbPool,
    writer: WriteHandle,
}

impl PostingRepository {
    pub fn new(pool: DbPool, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl PostingRepositoryTrait for PostingRepository {
    async fn create(&self, posting: Posting) -> Result<Posting> {
        let row = PostingDB::from(&posting);
        let stored = self
            .writer
            .exec(move |conn| {
                // The writer actor serializes all inserts, so max+1 cannot
                // hand out the same sequence twice.
                let next_sequence: i64 = postings::table
                    .select(diesel::dsl::max(postings::sequence))
                    .first::<Option<i64>>(conn)
                    .map_err(StorageError::from)?
                    .unwrap_or(0)
                    + 1;
                let mut row = row;
                row.sequence = next_sequence;
                diesel::insert_into(postings::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(row)
            })
            .await?;
        debug!("Stored posting {} at sequence {}", stored.id, stored.sequence);
        stored.into_domain()
    }

    fn get(&self, posting_id: &str) -> Result<Posting> {
        let mut conn = get_connection(&self.pool)?;
        let row = postings::table
            .filter(postings::id.eq(posting_id))
            .first::<PostingDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .ok_or_else(|| PostingError::NotFound(posting_id.to_string()))?;
        row.into_domain()
    }

    fn count_by_owner(&self, owner_id: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        postings::table
            .filter(postings::owner_id.eq(owner_id))
            .count()
            .get_result::<i64>(&mut conn)
            .into_core()
    }

    fn max_sequence_by_owner(&self, owner_id: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let max = postings::table
            .filter(postings::owner_id.eq(owner_id))
            .select(diesel::dsl::max(postings::sequence))
            .first::<Option<i64>>(&mut conn)
            .into_core()?;
        Ok(max.unwrap_or(0))
    }

    fn list_page_by_sequence(
        &self,
        owner_id: &str,
        after_sequence: i64,
        limit: i64,
        max_sequence: i64,
    ) -> Result<Vec<Posting>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = postings::table
            .filter(postings::owner_id.eq(owner_id))
            .filter(postings::sequence.gt(after_sequence))
            .filter(postings::sequence.le(max_sequence))
            .order(postings::sequence.asc())
            .limit(limit)
            .load::<PostingDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(PostingDB::into_domain).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init, spawn_writer};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use tallyfolio_core::postings::{DimensionRef, SecuritySubType};
    use tallyfolio_core::Error;
    use tempfile::TempDir;

    fn setup() -> (PostingRepository, TempDir) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = init(db_path.to_str().unwrap(), 4).unwrap();
        let writer = spawn_writer(pool.clone());
        (PostingRepository::new(pool, writer), dir)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn posting(id: &str, owner_id: &str, dimension: DimensionRef) -> Posting {
        let now = Utc::now();
        Posting {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            dimension,
            booking_date: d(2025, 3, 10),
            valuta_date: d(2025, 3, 12),
            amount: dec!(42.50),
            sequence: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_monotonic_sequences() {
        let (repository, _dir) = setup();

        let first = repository
            .create(posting(
                "p1",
                "owner-1",
                DimensionRef::Bank {
                    account_id: "acc-1".to_string(),
                },
            ))
            .await
            .unwrap();
        let second = repository
            .create(posting(
                "p2",
                "owner-1",
                DimensionRef::Contact {
                    contact_id: "con-1".to_string(),
                },
            ))
            .await
            .unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(repository.max_sequence_by_owner("owner-1").unwrap(), 2);
        assert_eq!(repository.count_by_owner("owner-1").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_round_trips_the_dimension() {
        let (repository, _dir) = setup();

        let stored = repository
            .create(posting(
                "p1",
                "owner-1",
                DimensionRef::Security {
                    security_id: "sec-1".to_string(),
                    sub_type: Some(SecuritySubType::Dividend),
                },
            ))
            .await
            .unwrap();

        let loaded = repository.get(&stored.id).unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(
            loaded.dimension.security_sub_type(),
            Some(SecuritySubType::Dividend)
        );
    }

    #[tokio::test]
    async fn test_get_missing_posting_fails_loudly() {
        let (repository, _dir) = setup();
        assert!(matches!(
            repository.get("missing"),
            Err(Error::Posting(PostingError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_page_by_sequence_respects_window_and_owner() {
        let (repository, _dir) = setup();

        for i in 1..=5 {
            let owner = if i == 3 { "owner-2" } else { "owner-1" };
            repository
                .create(posting(
                    &format!("p{}", i),
                    owner,
                    DimensionRef::Bank {
                        account_id: "acc-1".to_string(),
                    },
                ))
                .await
                .unwrap();
        }

        // owner-1 holds sequences 1, 2, 4, 5; the window caps at 4.
        let page = repository
            .list_page_by_sequence("owner-1", 1, 10, 4)
            .unwrap();
        let sequences: Vec<i64> = page.iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, vec![2, 4]);

        let limited = repository
            .list_page_by_sequence("owner-1", 0, 2, 5)
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].sequence, 1);
    }
}
