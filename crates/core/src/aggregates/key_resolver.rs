//! Expansion of postings into the aggregate keys they contribute to.

use crate::postings::Posting;

use super::aggregates_model::{AggregateKey, DateKind};
use super::period::Period;

/// Resolves the exact set of aggregate keys one posting must update:
/// one per (period, date kind) pair, each carrying the posting's owner,
/// dimension id and security sub-type unchanged.
///
/// Both dates are required on every posting, so this always yields
/// 4 periods x 2 date kinds = 8 keys.
pub fn resolve_keys(posting: &Posting) -> Vec<AggregateKey> {
    let mut keys = Vec::with_capacity(Period::ALL.len() * DateKind::ALL.len());
    for date_kind in DateKind::ALL {
        let date = match date_kind {
            DateKind::Booking => posting.booking_date,
            DateKind::Valuta => posting.valuta_date,
        };
        for period in Period::ALL {
            keys.push(AggregateKey {
                owner_id: posting.owner_id.clone(),
                kind: posting.dimension.kind(),
                dimension_id: posting.dimension.dimension_id().to_string(),
                security_sub_type: posting.dimension.security_sub_type(),
                period,
                period_start: period.start_of(date),
                date_kind,
            });
        }
    }
    keys
}
