//! The session-end engine: wires the reconciler to its collaborators.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Load the account profile for the session
//!   2. Reconcile (or pass through to the survived handler)
//!   3. Report counter discrepancies
//!   4. Execute side effects (messages, match cache)
//!   5. Commit the profile and its events in one transaction
//!
//! RULES:
//!   - Nothing is committed until every earlier step has succeeded.
//!     A failing collaborator aborts the session end and the stored
//!     profile stays as it was.
//!   - The engine holds no per-session state between calls.

use crate::{
    config::KeepConfig,
    counters::{DiscrepancySink, LogDiscrepancySink},
    error::ReconcileResult,
    event::{EventLogEntry, ReconcileEvent},
    health::{DirectHealthSync, HealthSync},
    profile::{AccountProfile, PostSessionResult},
    quest_items::{PickupConditionTable, QuestRepair},
    reconcile::{Collaborators, Reconciler, Reconciliation, Stage},
    rng::IdRng,
    side_effect::{execute_side_effects, LogMessageDispatcher, MatchBotCache, MessageDispatcher},
    store::ProfileRepository,
};
use std::sync::Arc;

/// Default handling of sessions reconciliation does not own.
pub trait SurvivedHandler {
    fn save_progress(
        &mut self,
        session_id: &str,
        account: AccountProfile,
        post: &PostSessionResult,
    ) -> ReconcileResult<AccountProfile>;
}

/// Takes the post-session profile as the new primary persona.
#[derive(Debug, Default)]
pub struct AdoptSessionProfile;

impl SurvivedHandler for AdoptSessionProfile {
    fn save_progress(
        &mut self,
        session_id: &str,
        mut account: AccountProfile,
        post: &PostSessionResult,
    ) -> ReconcileResult<AccountProfile> {
        if post.is_player_scav {
            account.characters.scav = Some(post.profile.clone());
        } else {
            account.characters.pmc = post.profile.clone();
        }
        account.inraid.location = "none".into();
        log::debug!("session={session_id} survived: session profile adopted");
        Ok(account)
    }
}

/// What a session end produced.
#[derive(Debug, Clone)]
pub enum SessionEndReport {
    PassedThrough,
    Reconciled(Box<Reconciliation>),
}

pub struct SessionEndEngine<R: ProfileRepository> {
    pub config: KeepConfig,
    pub store: R,
    master_seed: u64,
    health: Box<dyn HealthSync>,
    quests: Box<dyn QuestRepair>,
    discrepancies: Box<dyn DiscrepancySink>,
    messages: Box<dyn MessageDispatcher>,
    survived: Box<dyn SurvivedHandler>,
    cache: Arc<MatchBotCache>,
}

impl<R: ProfileRepository> SessionEndEngine<R> {
    /// Build an engine with the default collaborators: direct health sync,
    /// an empty pickup table, log-based reporting and messaging.
    pub fn new(config: KeepConfig, master_seed: u64, store: R) -> Self {
        Self {
            config,
            store,
            master_seed,
            health: Box::new(DirectHealthSync),
            quests: Box::new(PickupConditionTable::default()),
            discrepancies: Box::new(LogDiscrepancySink),
            messages: Box::new(LogMessageDispatcher),
            survived: Box::new(AdoptSessionProfile),
            cache: Arc::new(MatchBotCache::new()),
        }
    }

    /// Engine with the test policy and default collaborators.
    pub fn build_test(store: R, master_seed: u64) -> Self {
        Self::new(KeepConfig::default_test(), master_seed, store)
    }

    pub fn with_health(mut self, health: Box<dyn HealthSync>) -> Self {
        self.health = health;
        self
    }

    pub fn with_quest_repair(mut self, quests: Box<dyn QuestRepair>) -> Self {
        self.quests = quests;
        self
    }

    pub fn with_discrepancy_sink(mut self, sink: Box<dyn DiscrepancySink>) -> Self {
        self.discrepancies = sink;
        self
    }

    pub fn with_messages(mut self, messages: Box<dyn MessageDispatcher>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_survived_handler(mut self, handler: Box<dyn SurvivedHandler>) -> Self {
        self.survived = handler;
        self
    }

    /// Share a match cache owned elsewhere in the process.
    pub fn with_cache(mut self, cache: Arc<MatchBotCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<MatchBotCache> {
        &self.cache
    }

    /// Handle one session end from load to commit.
    pub fn handle_session_end(
        &mut self,
        session_id: &str,
        post: PostSessionResult,
    ) -> ReconcileResult<SessionEndReport> {
        let account = self.store.load_profile(session_id)?;
        let exit = post.exit;

        if Reconciler::new(&self.config).classify(&post) == Stage::PassThrough {
            let account = self.survived.save_progress(session_id, account, &post)?;
            let events = [ReconcileEvent::SessionPassedThrough {
                session_id: session_id.to_string(),
                exit,
            }];
            self.commit(session_id, &account, &events)?;
            log::info!("session={session_id} passed through (exit={exit:?})");
            return Ok(SessionEndReport::PassedThrough);
        }

        let mut rng = IdRng::for_session(self.master_seed, session_id);
        let result = {
            let mut collaborators = Collaborators {
                health: self.health.as_mut(),
                quests: self.quests.as_mut(),
            };
            Reconciler::new(&self.config).rebuild(
                session_id,
                account,
                post,
                &mut rng,
                &mut collaborators,
            )?
        };

        for d in &result.discrepancies {
            self.discrepancies.report_discrepancy(session_id, d);
        }

        execute_side_effects(&result.side_effects, self.messages.as_mut(), &self.cache)?;

        let events = self.events_for(session_id, exit, &result);
        self.commit(session_id, &result.account, &events)?;

        log::info!(
            "session={session_id} reconciled: {} fields, {} discrepancies, {} side effects",
            result.applied_fields.len(),
            result.discrepancies.len(),
            result.side_effects.len()
        );
        Ok(SessionEndReport::Reconciled(Box::new(result)))
    }

    fn events_for(
        &self,
        session_id: &str,
        exit: crate::profile::ExitStatus,
        result: &Reconciliation,
    ) -> Vec<ReconcileEvent> {
        let sid = || session_id.to_string();
        let mut events = vec![ReconcileEvent::SessionReconciled {
            session_id: sid(),
            exit,
            applied_fields: result.applied_fields.clone(),
            retention: result.retention,
            session_items_kept: result.session_items_kept.len(),
            standing: result.standing,
        }];
        events.extend(result.discrepancies.iter().map(|d| {
            ReconcileEvent::CounterDiscrepancyFound {
                session_id: sid(),
                discrepancy: d.clone(),
            }
        }));
        events.extend(result.gaps.iter().map(|g| ReconcileEvent::ReferentialGapRecovered {
            session_id: sid(),
            gap: g.clone(),
        }));
        if !result.lost_quest_items.is_empty() {
            events.push(ReconcileEvent::QuestItemsLost {
                session_id: sid(),
                item_ids: result.lost_quest_items.clone(),
            });
        }
        events.extend(result.side_effects.iter().map(|e| ReconcileEvent::SideEffectExecuted {
            session_id: sid(),
            effect: e.name().to_string(),
        }));
        events
    }

    fn commit(
        &mut self,
        session_id: &str,
        account: &AccountProfile,
        events: &[ReconcileEvent],
    ) -> ReconcileResult<()> {
        let entries = events
            .iter()
            .map(|e| EventLogEntry::from_event(session_id, e))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.commit(session_id, account, &entries)
    }
}
