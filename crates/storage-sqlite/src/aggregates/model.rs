//! Database models for posting aggregates.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use tallyfolio_core::aggregates::{AggregateKey, PostingAggregate};
use tallyfolio_core::Result;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database model for one aggregate row.
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::posting_aggregates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostingAggregateDB {
    pub id: String,
    pub owner_id: String,
    pub kind: String,
    pub dimension_id: String,
    pub security_sub_type: Option<String>,
    pub period: String,
    pub period_start: String,
    pub date_kind: String,
    pub amount: String,
    pub updated_at: String,
}

impl PostingAggregateDB {
    /// Fresh row for a key's first contribution.
    pub fn from_key(key: &AggregateKey, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: key.owner_id.clone(),
            kind: key.kind.as_str().to_string(),
            dimension_id: key.dimension_id.clone(),
            security_sub_type: key.security_sub_type.map(|s| s.as_str().to_string()),
            period: key.period.as_str().to_string(),
            period_start: key.period_start.format(DATE_FORMAT).to_string(),
            date_kind: key.date_kind.as_str().to_string(),
            amount: amount.to_string(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    /// Converts a stored row back into the domain model.
    ///
    /// Strict parsing: aggregates carry the correctness invariant, so a
    /// row that fails to round-trip is an error, never a silent zero.
    pub fn into_domain(self) -> Result<PostingAggregate> {
        Ok(PostingAggregate {
            kind: self.kind.parse()?,
            security_sub_type: self
                .security_sub_type
                .as_deref()
                .map(str::parse)
                .transpose()?,
            period: self.period.parse()?,
            period_start: NaiveDate::parse_from_str(&self.period_start, DATE_FORMAT)?,
            date_kind: self.date_kind.parse()?,
            amount: Decimal::from_str(&self.amount)?,
            updated_at: DateTime::parse_from_rfc3339(&self.updated_at)?.with_timezone(&Utc),
            id: self.id,
            owner_id: self.owner_id,
            dimension_id: self.dimension_id,
        })
    }
}
