//! Aggregate domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ValidationError;
use crate::postings::{PostingKind, SecuritySubType};

use super::period::Period;

/// Which of a posting's two dates produced an aggregate row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateKind {
    Booking,
    Valuta,
}

impl DateKind {
    pub const ALL: [DateKind; 2] = [DateKind::Booking, DateKind::Valuta];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateKind::Booking => "BOOKING",
            DateKind::Valuta => "VALUTA",
        }
    }
}

impl fmt::Display for DateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "BOOKING" => Ok(DateKind::Booking),
            "VALUTA" => Ok(DateKind::Valuta),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown date kind: {}",
                other
            ))),
        }
    }
}

/// Natural key of one aggregate row.
///
/// At most one row exists per key; the storage layer enforces this with a
/// unique index so concurrent upserts racing on the same key collapse to
/// one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateKey {
    pub owner_id: String,
    pub kind: PostingKind,
    pub dimension_id: String,
    pub security_sub_type: Option<SecuritySubType>,
    pub period: Period,
    pub period_start: NaiveDate,
    pub date_kind: DateKind,
}

/// Persisted running total for one aggregate key.
///
/// Created on first contribution, incremented or decremented on every
/// subsequent matching posting. A zero balance is a valid, persisted row;
/// rows are deleted only by a rebuild's reset step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingAggregate {
    pub id: String,
    pub owner_id: String,
    pub kind: PostingKind,
    pub dimension_id: String,
    pub security_sub_type: Option<SecuritySubType>,
    pub period: Period,
    pub period_start: NaiveDate,
    pub date_kind: DateKind,
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl PostingAggregate {
    /// Fresh row for a key's first contribution.
    pub fn new(key: AggregateKey, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: key.owner_id,
            kind: key.kind,
            dimension_id: key.dimension_id,
            security_sub_type: key.security_sub_type,
            period: key.period,
            period_start: key.period_start,
            date_kind: key.date_kind,
            amount,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> AggregateKey {
        AggregateKey {
            owner_id: self.owner_id.clone(),
            kind: self.kind,
            dimension_id: self.dimension_id.clone(),
            security_sub_type: self.security_sub_type,
            period: self.period,
            period_start: self.period_start,
            date_kind: self.date_kind,
        }
    }
}

/// Sign applied to posting amounts when feeding the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// A newly booked posting: add its amount.
    Apply,
    /// Removing a posting's contribution: subtract exactly what was added.
    Reverse,
}

impl Direction {
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Apply => Decimal::ONE,
            Direction::Reverse => Decimal::NEGATIVE_ONE,
        }
    }
}
