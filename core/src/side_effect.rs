//! Side-effect requests produced by reconciliation.
//!
//! The orchestrator never touches shared state or sends anything itself.
//! It returns SideEffect values, and the engine executes them against the
//! collaborators that own the cache and the messaging.

use crate::{
    error::ReconcileResult,
    profile::{Aggressor, ProfileSnapshot, Victim},
    types::SessionId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    ClearMatchCache,
    KillerMessage {
        session_id: SessionId,
        aggressor: Aggressor,
        profile: Box<ProfileSnapshot>,
    },
    VictimMessages {
        session_id: SessionId,
        victims: Vec<Victim>,
        profile: Box<ProfileSnapshot>,
    },
}

impl SideEffect {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ClearMatchCache => "clear_match_cache",
            Self::KillerMessage { .. } => "killer_message",
            Self::VictimMessages { .. } => "victim_messages",
        }
    }
}

/// Sends the post-session chat messages.
pub trait MessageDispatcher {
    fn dispatch_killer_message(
        &mut self,
        session_id: &str,
        profile: &ProfileSnapshot,
        aggressor: &Aggressor,
    ) -> ReconcileResult<()>;

    fn dispatch_victim_messages(
        &mut self,
        session_id: &str,
        victims: &[Victim],
        profile: &ProfileSnapshot,
    ) -> ReconcileResult<()>;
}

/// Writes messages to the log instead of a mailbox.
#[derive(Debug, Default)]
pub struct LogMessageDispatcher;

impl MessageDispatcher for LogMessageDispatcher {
    fn dispatch_killer_message(
        &mut self,
        session_id: &str,
        profile: &ProfileSnapshot,
        aggressor: &Aggressor,
    ) -> ReconcileResult<()> {
        log::info!(
            "session={session_id} message: {} ({}) killed {}",
            aggressor.name,
            aggressor.role,
            profile.info.nickname
        );
        Ok(())
    }

    fn dispatch_victim_messages(
        &mut self,
        session_id: &str,
        victims: &[Victim],
        profile: &ProfileSnapshot,
    ) -> ReconcileResult<()> {
        for victim in victims {
            log::info!(
                "session={session_id} message: {} ({}) was killed by {}",
                victim.name,
                victim.role,
                profile.info.nickname
            );
        }
        Ok(())
    }
}

/// Process-wide cache of bot details used by matchmaking.
///
/// Shared across sessions. The only operation reconciliation performs is
/// `clear`, which is idempotent, so concurrent session ends need no
/// coordination beyond the lock.
#[derive(Debug, Default)]
pub struct MatchBotCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl MatchBotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bot_id: &str, details: Value) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(bot_id.to_string(), details);
    }

    pub fn get(&self, bot_id: &str) -> Option<Value> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(bot_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Execute `effects` in order. Stops at the first failure.
pub fn execute_side_effects(
    effects: &[SideEffect],
    dispatcher: &mut dyn MessageDispatcher,
    cache: &MatchBotCache,
) -> ReconcileResult<()> {
    for effect in effects {
        match effect {
            SideEffect::ClearMatchCache => cache.clear(),
            SideEffect::KillerMessage {
                session_id,
                aggressor,
                profile,
            } => dispatcher.dispatch_killer_message(session_id, profile, aggressor)?,
            SideEffect::VictimMessages {
                session_id,
                victims,
                profile,
            } => dispatcher.dispatch_victim_messages(session_id, victims, profile)?,
        }
        log::debug!("side effect executed: {}", effect.name());
    }
    Ok(())
}
