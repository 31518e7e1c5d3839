//! Task condition counter validation.
//!
//! Advisory only: findings are returned to the caller, which hands them to
//! a DiscrepancySink. Nothing here blocks or alters a merge.

use crate::profile::TaskConditionCounter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// The counter exists after the session but not before it.
    MissingKey,
    /// The counter changed value. `regressed` marks a decrease, which a
    /// progress counter should never show.
    ValueMismatch { old: f64, new: f64, regressed: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub key: String,
    #[serde(flatten)]
    pub kind: DiscrepancyKind,
}

impl Discrepancy {
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            DiscrepancyKind::MissingKey => "missing_key",
            DiscrepancyKind::ValueMismatch { .. } => "value_mismatch",
        }
    }
}

/// Where counter discrepancies are reported.
pub trait DiscrepancySink {
    fn report_discrepancy(&mut self, session_id: &str, discrepancy: &Discrepancy);
}

/// Reports to the log at error level.
#[derive(Debug, Default)]
pub struct LogDiscrepancySink;

impl DiscrepancySink for LogDiscrepancySink {
    fn report_discrepancy(&mut self, session_id: &str, d: &Discrepancy) {
        match &d.kind {
            DiscrepancyKind::MissingKey => log::error!(
                "session={session_id} counters: unable to find key {} in pre-session task condition counters",
                d.key
            ),
            DiscrepancyKind::ValueMismatch { old, new, regressed } => log::error!(
                "session={session_id} counters: key {} differs (old={old}, new={new}, regressed={regressed})",
                d.key
            ),
        }
    }
}

/// Compare post-session counters against the pre-session ones, key by key.
pub fn validate_counters(
    pre: &BTreeMap<String, TaskConditionCounter>,
    post: &BTreeMap<String, TaskConditionCounter>,
) -> Vec<Discrepancy> {
    let mut found = Vec::new();

    for (key, counter) in post {
        // Skip counters with no id
        if counter.id.is_empty() {
            continue;
        }
        let Some(new) = counter.value else {
            continue;
        };

        let Some(matching) = pre.get(key) else {
            found.push(Discrepancy {
                key: key.clone(),
                kind: DiscrepancyKind::MissingKey,
            });
            continue;
        };

        let old = matching.value.unwrap_or(0.0);
        if old != new {
            found.push(Discrepancy {
                key: key.clone(),
                kind: DiscrepancyKind::ValueMismatch {
                    old,
                    new,
                    regressed: new < old,
                },
            });
        }
    }

    found
}
