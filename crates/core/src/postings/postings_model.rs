//! Posting domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

use super::postings_errors::PostingError;

/// The ownership dimension a posting is attributed to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostingKind {
    Bank,
    Contact,
    SavingsPlan,
    Security,
}

impl PostingKind {
    pub const ALL: [PostingKind; 4] = [
        PostingKind::Bank,
        PostingKind::Contact,
        PostingKind::SavingsPlan,
        PostingKind::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostingKind::Bank => "BANK",
            PostingKind::Contact => "CONTACT",
            PostingKind::SavingsPlan => "SAVINGS_PLAN",
            PostingKind::Security => "SECURITY",
        }
    }
}

impl fmt::Display for PostingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostingKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "BANK" => Ok(PostingKind::Bank),
            "CONTACT" => Ok(PostingKind::Contact),
            "SAVINGS_PLAN" => Ok(PostingKind::SavingsPlan),
            "SECURITY" => Ok(PostingKind::Security),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown posting kind: {}",
                other
            ))),
        }
    }
}

/// Sub-classification of a security posting.
///
/// Participates in the aggregate key: a dividend and its withholding tax on
/// the same security and date accumulate into two separate rows, never one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecuritySubType {
    Trade,
    Fee,
    Tax,
    Dividend,
}

impl SecuritySubType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecuritySubType::Trade => "TRADE",
            SecuritySubType::Fee => "FEE",
            SecuritySubType::Tax => "TAX",
            SecuritySubType::Dividend => "DIVIDEND",
        }
    }
}

impl fmt::Display for SecuritySubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecuritySubType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "TRADE" => Ok(SecuritySubType::Trade),
            "FEE" => Ok(SecuritySubType::Fee),
            "TAX" => Ok(SecuritySubType::Tax),
            "DIVIDEND" => Ok(SecuritySubType::Dividend),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown security sub-type: {}",
                other
            ))),
        }
    }
}

/// Tagged reference to the single entity a posting belongs to.
///
/// Exactly one dimension id exists per posting by construction; a posting
/// with zero or two populated ids is unrepresentable. The sub-type lives
/// inside the `Security` variant because it only means something there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum DimensionRef {
    Bank {
        account_id: String,
    },
    Contact {
        contact_id: String,
    },
    SavingsPlan {
        savings_plan_id: String,
    },
    Security {
        security_id: String,
        sub_type: Option<SecuritySubType>,
    },
}

impl DimensionRef {
    pub fn kind(&self) -> PostingKind {
        match self {
            DimensionRef::Bank { .. } => PostingKind::Bank,
            DimensionRef::Contact { .. } => PostingKind::Contact,
            DimensionRef::SavingsPlan { .. } => PostingKind::SavingsPlan,
            DimensionRef::Security { .. } => PostingKind::Security,
        }
    }

    pub fn dimension_id(&self) -> &str {
        match self {
            DimensionRef::Bank { account_id } => account_id,
            DimensionRef::Contact { contact_id } => contact_id,
            DimensionRef::SavingsPlan { savings_plan_id } => savings_plan_id,
            DimensionRef::Security { security_id, .. } => security_id,
        }
    }

    pub fn security_sub_type(&self) -> Option<SecuritySubType> {
        match self {
            DimensionRef::Security { sub_type, .. } => *sub_type,
            _ => None,
        }
    }

    /// Reassembles a dimension from its persisted parts.
    ///
    /// Used at the storage boundary where kind, id and sub-type live in
    /// separate columns. A sub-type on a non-security kind is a contract
    /// violation and fails loudly.
    pub fn from_parts(
        kind: PostingKind,
        dimension_id: String,
        sub_type: Option<SecuritySubType>,
    ) -> std::result::Result<Self, PostingError> {
        if sub_type.is_some() && kind != PostingKind::Security {
            return Err(PostingError::SubTypeOnNonSecurity(kind));
        }
        Ok(match kind {
            PostingKind::Bank => DimensionRef::Bank {
                account_id: dimension_id,
            },
            PostingKind::Contact => DimensionRef::Contact {
                contact_id: dimension_id,
            },
            PostingKind::SavingsPlan => DimensionRef::SavingsPlan {
                savings_plan_id: dimension_id,
            },
            PostingKind::Security => DimensionRef::Security {
                security_id: dimension_id,
                sub_type,
            },
        })
    }
}

/// Domain model representing one immutable ledger entry.
///
/// A correction is a new posting with the inverse amount, never a mutation
/// of an existing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Posting {
    pub id: String,
    /// Opaque scope identifier; one owner's postings never contribute to
    /// another owner's aggregates.
    pub owner_id: String,
    #[serde(flatten)]
    pub dimension: DimensionRef,
    pub booking_date: NaiveDate,
    pub valuta_date: NaiveDate,
    /// Signed amount; positive = credit, negative = debit.
    pub amount: Decimal,
    /// Monotonic insertion sequence assigned by storage; zero until persisted.
    /// Rebuilds use it as their snapshot cursor.
    #[serde(default)]
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Posting {
    pub fn kind(&self) -> PostingKind {
        self.dimension.kind()
    }

    pub fn dimension_id(&self) -> &str {
        self.dimension.dimension_id()
    }
}

/// Input model for booking a posting.
///
/// Carries the four nullable dimension id fields the outside world speaks
/// in; `dimension()` collapses them into the tagged [`DimensionRef`],
/// rejecting contract violations before any key is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPosting {
    pub owner_id: String,
    pub kind: PostingKind,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub savings_plan_id: Option<String>,
    #[serde(default)]
    pub security_id: Option<String>,
    #[serde(default)]
    pub security_sub_type: Option<SecuritySubType>,
    pub booking_date: NaiveDate,
    pub valuta_date: NaiveDate,
    pub amount: Decimal,
}

fn require_id(
    id: &Option<String>,
    kind: PostingKind,
    field: &'static str,
) -> std::result::Result<String, PostingError> {
    id.clone()
        .filter(|v| !v.is_empty())
        .ok_or(PostingError::MissingDimensionId { kind, field })
}

fn forbid_id(
    id: &Option<String>,
    kind: PostingKind,
    field: &'static str,
) -> std::result::Result<(), PostingError> {
    if id.is_some() {
        return Err(PostingError::ForeignDimensionId { kind, field });
    }
    Ok(())
}

impl NewPosting {
    /// Validates the nullable id columns against `kind` and collapses them
    /// into the tagged dimension.
    pub fn dimension(&self) -> std::result::Result<DimensionRef, PostingError> {
        if self.security_sub_type.is_some() && self.kind != PostingKind::Security {
            return Err(PostingError::SubTypeOnNonSecurity(self.kind));
        }
        match self.kind {
            PostingKind::Bank => {
                forbid_id(&self.contact_id, self.kind, "contact")?;
                forbid_id(&self.savings_plan_id, self.kind, "savings plan")?;
                forbid_id(&self.security_id, self.kind, "security")?;
                Ok(DimensionRef::Bank {
                    account_id: require_id(&self.account_id, self.kind, "account")?,
                })
            }
            PostingKind::Contact => {
                forbid_id(&self.account_id, self.kind, "account")?;
                forbid_id(&self.savings_plan_id, self.kind, "savings plan")?;
                forbid_id(&self.security_id, self.kind, "security")?;
                Ok(DimensionRef::Contact {
                    contact_id: require_id(&self.contact_id, self.kind, "contact")?,
                })
            }
            PostingKind::SavingsPlan => {
                forbid_id(&self.account_id, self.kind, "account")?;
                forbid_id(&self.contact_id, self.kind, "contact")?;
                forbid_id(&self.security_id, self.kind, "security")?;
                Ok(DimensionRef::SavingsPlan {
                    savings_plan_id: require_id(&self.savings_plan_id, self.kind, "savings plan")?,
                })
            }
            PostingKind::Security => {
                forbid_id(&self.account_id, self.kind, "account")?;
                forbid_id(&self.contact_id, self.kind, "contact")?;
                forbid_id(&self.savings_plan_id, self.kind, "savings plan")?;
                Ok(DimensionRef::Security {
                    security_id: require_id(&self.security_id, self.kind, "security")?,
                    sub_type: self.security_sub_type,
                })
            }
        }
    }
}
