//! Reconciliation events, persisted alongside the profile they describe.
//!
//! Variants are added over time, never removed or reordered.

use crate::{
    counters::Discrepancy,
    inventory::Retention,
    merge::ProfileField,
    profile::ExitStatus,
    remap::ReferentialGap,
    types::{ItemId, SessionId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReconcileEvent {
    SessionPassedThrough {
        session_id: SessionId,
        exit: ExitStatus,
    },
    SessionReconciled {
        session_id: SessionId,
        exit: ExitStatus,
        applied_fields: Vec<ProfileField>,
        retention: Retention,
        session_items_kept: usize,
        standing: Option<f64>,
    },
    CounterDiscrepancyFound {
        session_id: SessionId,
        discrepancy: Discrepancy,
    },
    ReferentialGapRecovered {
        session_id: SessionId,
        gap: ReferentialGap,
    },
    QuestItemsLost {
        session_id: SessionId,
        item_ids: Vec<ItemId>,
    },
    SideEffectExecuted {
        session_id: SessionId,
        effect: String,
    },
}

impl ReconcileEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SessionPassedThrough { .. }     => "session_passed_through",
            Self::SessionReconciled { .. }        => "session_reconciled",
            Self::CounterDiscrepancyFound { .. }  => "counter_discrepancy_found",
            Self::ReferentialGapRecovered { .. }  => "referential_gap_recovered",
            Self::QuestItemsLost { .. }           => "quest_items_lost",
            Self::SideEffectExecuted { .. }       => "side_effect_executed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub session_id: SessionId,
    pub event_type: String,
    pub payload: String, // JSON-serialized ReconcileEvent
    pub created_at: String,
}

impl EventLogEntry {
    pub fn from_event(session_id: &str, event: &ReconcileEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            session_id: session_id.to_string(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn event(&self) -> serde_json::Result<ReconcileEvent> {
        serde_json::from_str(&self.payload)
    }
}
