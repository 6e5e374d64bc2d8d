//! Rebuild run models.

use serde::{Deserialize, Serialize};

/// Lifecycle of one rebuild run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RebuildState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RebuildState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RebuildState::Completed | RebuildState::Failed | RebuildState::Cancelled
        )
    }
}

/// Point-in-time progress of one rebuild run.
///
/// A cancelled or failed run leaves the aggregate table partially rebuilt
/// (incomplete but not corrupt); callers must not treat its output as
/// authoritative and should restart the rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildStatus {
    pub state: RebuildState,
    pub processed: u64,
    pub total: u64,
    pub error: Option<String>,
}

impl RebuildStatus {
    pub fn running(total: u64) -> Self {
        Self {
            state: RebuildState::Running,
            processed: 0,
            total,
            error: None,
        }
    }
}

/// Opaque handle identifying one rebuild run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildHandle {
    pub id: String,
}
