//! Vitality persistence.
//!
//! The orchestrator hands post-session health to a HealthSync
//! collaborator when the policy saves vitality. DirectHealthSync writes
//! the payload straight onto the profile and is what the runner uses.

use crate::{
    error::ReconcileResult,
    profile::{BodyPartHealth, HealthSyncPayload, ProfileSnapshot, Vital},
};

pub trait HealthSync {
    fn persist_health(
        &mut self,
        profile: &mut ProfileSnapshot,
        payload: &HealthSyncPayload,
        session_id: &str,
        is_dead: bool,
    ) -> ReconcileResult<()>;
}

#[derive(Debug, Default)]
pub struct DirectHealthSync;

impl HealthSync for DirectHealthSync {
    fn persist_health(
        &mut self,
        profile: &mut ProfileSnapshot,
        payload: &HealthSyncPayload,
        session_id: &str,
        is_dead: bool,
    ) -> ReconcileResult<()> {
        let health = &mut profile.health;
        if let Some(v) = payload.hydration {
            health.hydration.current = v;
        }
        if let Some(v) = payload.energy {
            health.energy.current = v;
        }
        if let Some(v) = payload.temperature {
            health.temperature.current = v;
        }

        for (part, sync) in &payload.health {
            let entry = health
                .body_parts
                .entry(part.clone())
                .or_insert_with(BodyPartHealth::default);
            entry.health = Vital {
                current: sync.current,
                maximum: sync.maximum,
            };
            entry.effects = sync.effects.clone();

            // A dead actor starts the next session with no destroyed limbs
            // and no lingering effects.
            if is_dead {
                entry.effects = None;
                if entry.health.current < 1.0 {
                    entry.health.current = 1.0;
                }
            }
        }

        log::debug!(
            "session={session_id} health: synced {} body parts (dead={is_dead})",
            payload.health.len()
        );
        Ok(())
    }
}

/// Remove every body-part effect from the profile.
pub fn clear_body_part_effects(profile: &mut ProfileSnapshot) {
    for part in profile.health.body_parts.values_mut() {
        part.effects = None;
    }
}
