//! Reconciliation run reports

use crate::collection::ProfileId;
use crate::diff::Operation;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Terminal outcome for one mirror within a run
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MirrorOutcome {
    /// Every computed operation was applied (possibly zero)
    Synced { applied: Vec<Operation> },
    /// Application stopped partway; the mirror is in a consistent
    /// intermediate state and the next run picks up the remainder
    Partial {
        applied: Vec<Operation>,
        unapplied: Vec<Operation>,
        cause: String,
    },
    /// The mirror's collection could not be fetched; nothing was changed
    FetchFailed { cause: String },
}

impl MirrorOutcome {
    #[must_use]
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }

    /// Operations successfully applied, regardless of outcome
    #[must_use]
    pub fn applied(&self) -> &[Operation] {
        match self {
            Self::Synced { applied } | Self::Partial { applied, .. } => applied,
            Self::FetchFailed { .. } => &[],
        }
    }
}

/// Outcome for one mirror, tagged with its profile
#[derive(Debug, Serialize)]
pub struct MirrorReport {
    pub mirror: ProfileId,
    pub outcome: MirrorOutcome,
}

/// Full report for one master's reconciliation run
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub master: ProfileId,
    pub mirrors: Vec<MirrorReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Whether every mirror reached the synced outcome
    #[must_use]
    pub fn all_synced(&self) -> bool {
        self.mirrors.iter().all(|m| m.outcome.is_synced())
    }

    /// Total operations applied across all mirrors
    #[must_use]
    pub fn total_applied(&self) -> usize {
        self.mirrors.iter().map(|m| m.outcome.applied().len()).sum()
    }
}
