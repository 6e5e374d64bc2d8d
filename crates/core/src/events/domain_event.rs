//! Domain event types.

use serde::{Deserialize, Serialize};

use crate::rebuild::RebuildState;

/// Domain events emitted by core services after successful mutations.
///
/// These events represent facts about domain data changes. Runtime adapters
/// translate them into platform-specific actions (dashboard refresh, chart
/// invalidation, etc.).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Postings were booked or reversed.
    PostingsChanged {
        owner_id: String,
        posting_ids: Vec<String>,
    },

    /// Aggregate rows were created or updated for an owner scope.
    AggregatesChanged { owner_id: String },

    /// A full rebuild reached a terminal state.
    RebuildFinished {
        owner_id: String,
        state: RebuildState,
    },
}

impl DomainEvent {
    /// Creates a PostingsChanged event.
    pub fn postings_changed(owner_id: String, posting_ids: Vec<String>) -> Self {
        Self::PostingsChanged {
            owner_id,
            posting_ids,
        }
    }

    /// Creates an AggregatesChanged event.
    pub fn aggregates_changed(owner_id: String) -> Self {
        Self::AggregatesChanged { owner_id }
    }

    /// Creates a RebuildFinished event.
    pub fn rebuild_finished(owner_id: String, state: RebuildState) -> Self {
        Self::RebuildFinished { owner_id, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_event_serialization() {
        let event =
            DomainEvent::postings_changed("owner-1".to_string(), vec!["p1".to_string()]);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("postings_changed"));

        let deserialized: DomainEvent = serde_json::from_str(&json).unwrap();
        match deserialized {
            DomainEvent::PostingsChanged {
                owner_id,
                posting_ids,
            } => {
                assert_eq!(owner_id, "owner-1");
                assert_eq!(posting_ids, vec!["p1"]);
            }
            _ => panic!("Expected PostingsChanged"),
        }
    }

    #[test]
    fn test_rebuild_finished_serialization() {
        let event = DomainEvent::rebuild_finished("owner-1".to_string(), RebuildState::Completed);

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: DomainEvent = serde_json::from_str(&json).unwrap();

        match deserialized {
            DomainEvent::RebuildFinished { owner_id, state } => {
                assert_eq!(owner_id, "owner-1");
                assert_eq!(state, RebuildState::Completed);
            }
            _ => panic!("Expected RebuildFinished"),
        }
    }
}
