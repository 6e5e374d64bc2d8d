//! Period granularities and bucketing.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Time bucket size of an aggregate row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Period {
    Month,
    Quarter,
    HalfYear,
    Year,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Month,
        Period::Quarter,
        Period::HalfYear,
        Period::Year,
    ];

    /// First calendar day of the period containing `date`.
    ///
    /// Pure and total: every input date maps to the 1st of some month,
    /// so the construction below cannot fail.
    pub fn start_of(&self, date: NaiveDate) -> NaiveDate {
        let month = match self {
            Period::Month => date.month(),
            Period::Quarter => ((date.month() - 1) / 3) * 3 + 1,
            Period::HalfYear => {
                if date.month() <= 6 {
                    1
                } else {
                    7
                }
            }
            Period::Year => 1,
        };
        NaiveDate::from_ymd_opt(date.year(), month, 1)
            .expect("the first day of a month is always a valid date")
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Month => "MONTH",
            Period::Quarter => "QUARTER",
            Period::HalfYear => "HALF_YEAR",
            Period::Year => "YEAR",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "MONTH" => Ok(Period::Month),
            "QUARTER" => Ok(Period::Quarter),
            "HALF_YEAR" => Ok(Period::HalfYear),
            "YEAR" => Ok(Period::Year),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown period: {}",
                other
            ))),
        }
    }
}
