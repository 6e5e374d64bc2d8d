//! Database models for postings.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use tallyfolio_core::postings::{DimensionRef, Posting};
use tallyfolio_core::Result;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database model for postings.
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
#[diesel(table_name = crate::schema::postings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostingDB {
    pub id: String,
    pub owner_id: String,
    pub kind: String,
    pub dimension_id: String,
    pub security_sub_type: Option<String>,
    pub booking_date: String,
    pub valuta_date: String,
    pub amount: String,
    pub sequence: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Posting> for PostingDB {
    fn from(posting: &Posting) -> Self {
        Self {
            id: posting.id.clone(),
            owner_id: posting.owner_id.clone(),
            kind: posting.kind().as_str().to_string(),
            dimension_id: posting.dimension_id().to_string(),
            security_sub_type: posting
                .dimension
                .security_sub_type()
                .map(|s| s.as_str().to_string()),
            booking_date: posting.booking_date.format(DATE_FORMAT).to_string(),
            valuta_date: posting.valuta_date.format(DATE_FORMAT).to_string(),
            amount: posting.amount.to_string(),
            sequence: posting.sequence,
            created_at: posting.created_at.to_rfc3339(),
            updated_at: posting.updated_at.to_rfc3339(),
        }
    }
}

impl PostingDB {
    /// Converts a stored row back into the domain model.
    ///
    /// Parsing is strict: a row that no longer round-trips (unknown enum
    /// token, malformed date or amount) is a contract violation and fails
    /// loudly instead of being skipped.
    pub fn into_domain(self) -> Result<Posting> {
        let kind = self.kind.parse()?;
        let sub_type = self
            .security_sub_type
            .as_deref()
            .map(str::parse)
            .transpose()?;
        let dimension = DimensionRef::from_parts(kind, self.dimension_id, sub_type)?;
        Ok(Posting {
            id: self.id,
            owner_id: self.owner_id,
            dimension,
            booking_date: NaiveDate::parse_from_str(&self.booking_date, DATE_FORMAT)?,
            valuta_date: NaiveDate::parse_from_str(&self.valuta_date, DATE_FORMAT)?,
            amount: Decimal::from_str(&self.amount)?,
            sequence: self.sequence,
            created_at: DateTime::parse_from_rfc3339(&self.created_at)?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&self.updated_at)?.with_timezone(&Utc),
        })
    }
}
