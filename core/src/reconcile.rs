//! The reconciliation orchestrator.
//!
//! STAGES: Classify → (PassThrough | Reconcile) → SideEffects → Done
//!
//! RECONCILE ORDER (fixed, never reordered):
//!    1. Snapshot pre-session quests
//!    2. Capture quest items brought back from the session
//!    3. Policy-gated field merge
//!    4. Drop quest items and reopen their pickup conditions (if not kept)
//!    5. Identity remap of the session inventory
//!    6. Money stack normalization
//!    7. Inventory retention (all items | protected container | nothing)
//!    8. Found-in-session status stripping
//!    9. Trader standing clamp
//!   10. Encyclopedia merge across personas
//!   11. Vitality persistence
//!
//! RULES:
//!   - The pre-session account is consumed and a new one is returned.
//!     Nothing is persisted here; the caller saves only a finished result.
//!   - Shared state (the match cache) and messaging are never touched.
//!     They are returned as SideEffect requests.

use crate::{
    config::KeepConfig,
    counters::Discrepancy,
    error::ReconcileResult,
    health::{clear_body_part_effects, HealthSync},
    inventory::{
        adopt_session_inventory, graft_protected_container, normalize_money_stacks,
        prune_dangling_references, quest_items, remove_items, strip_found_in_session, Retention,
    },
    item_graph::find_cycle,
    merge::{merge_fields, FieldMerge, ProfileField},
    profile::{
        AccountProfile, Characters, PostSessionResult, ProfileSnapshot, QuestState, QuestStatus,
        FENCE_TRADER_ID,
    },
    quest_items::QuestRepair,
    remap::{remap_identities, ReferentialGap},
    rng::IdRng,
    side_effect::SideEffect,
    standing::{apply_standing_clamp, STANDING_LOWER_BOUND, STANDING_UPPER_BOUND},
    types::ItemId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Location and overall-counter key fragment of the sacred amulet rule.
const AMULET_LOCATION: &str = "lighthouse";
const AMULET_SIDE: &str = "usec";
const AMULET_COUNTER: &str = "UsecRaidRemainKills";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    PassThrough,
    Reconcile,
    SideEffects,
    Done,
}

/// External collaborators called while reconciling.
pub struct Collaborators<'a> {
    pub health: &'a mut dyn HealthSync,
    pub quests: &'a mut dyn QuestRepair,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestChange {
    pub qid: String,
    pub before: Option<QuestState>,
    pub after: QuestState,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub account: AccountProfile,
    pub side_effects: Vec<SideEffect>,
    pub discrepancies: Vec<Discrepancy>,
    pub applied_fields: Vec<ProfileField>,
    pub gaps: Vec<ReferentialGap>,
    pub quest_changes: Vec<QuestChange>,
    pub retention: Retention,
    pub lost_quest_items: Vec<ItemId>,
    /// Items in the merged inventory that came from the session.
    pub session_items_kept: Vec<ItemId>,
    pub standing: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// Favorable or out-of-scope session: the default handler owns it.
    PassThrough(Box<PostSessionResult>),
    Reconciled(Box<Reconciliation>),
}

pub struct Reconciler<'c> {
    config: &'c KeepConfig,
}

impl<'c> Reconciler<'c> {
    pub fn new(config: &'c KeepConfig) -> Self {
        Self { config }
    }

    /// Decide which branch a session takes.
    pub fn classify(&self, post: &PostSessionResult) -> Stage {
        if !self.config.active || post.is_player_scav || post.exit.is_favorable() {
            Stage::PassThrough
        } else {
            Stage::Reconcile
        }
    }

    pub fn reconcile(
        &self,
        session_id: &str,
        account: AccountProfile,
        post: PostSessionResult,
        rng: &mut IdRng,
        collaborators: &mut Collaborators<'_>,
    ) -> ReconcileResult<ReconcileOutcome> {
        log::debug!("session={session_id} stage: {:?}", Stage::Classify);
        if self.classify(&post) == Stage::PassThrough {
            log::debug!(
                "session={session_id} stage: {:?} (exit={:?})",
                Stage::PassThrough,
                post.exit
            );
            return Ok(ReconcileOutcome::PassThrough(Box::new(post)));
        }
        let result = self.rebuild(session_id, account, post, rng, collaborators)?;
        Ok(ReconcileOutcome::Reconciled(Box::new(result)))
    }

    /// Run the reconcile stages without classifying first. Callers that
    /// have not already called `classify` go through `reconcile`.
    pub fn rebuild(
        &self,
        session_id: &str,
        account: AccountProfile,
        mut post: PostSessionResult,
        rng: &mut IdRng,
        collaborators: &mut Collaborators<'_>,
    ) -> ReconcileResult<Reconciliation> {
        log::debug!("session={session_id} stage: {:?}", Stage::Reconcile);

        let AccountProfile {
            characters: Characters { pmc: pre, mut scav },
            mut inraid,
            extra,
        } = account;

        // 1. pre-session quest snapshot
        let pre_quests = pre.quests.clone();

        // 2. quest items brought back
        let session_quest_items = quest_items(&post.profile.inventory);

        // 3. field merge
        let FieldMerge {
            profile: mut merged,
            applied: applied_fields,
            discrepancies,
        } = merge_fields(pre, &mut post.profile, self.config);
        inraid.character = "pmc".into();
        inraid.location = "none".into();

        // 4. quest item loss
        let mut lost_quest_items = Vec::new();
        if !self.config.keep_quest_items && !session_quest_items.is_empty() {
            let ids: Vec<ItemId> = session_quest_items.iter().map(|i| i.id.clone()).collect();
            let removed = remove_items(&mut post.profile.inventory, &ids);
            collaborators.quests.repair_pickup_quests_after_loss(
                session_id,
                &removed,
                &mut merged.quests,
            )?;
            log::info!(
                "session={session_id} quests: {} quest items lost",
                removed.len()
            );
            lost_quest_items = removed.into_iter().map(|i| i.id).collect();
        }

        // 5. identity remap
        if let Some(item_id) = find_cycle(&post.profile.inventory.items) {
            log::warn!("session={session_id} inventory: parent cycle through item {item_id}");
        }
        let exempt: HashSet<ItemId> = post
            .profile
            .inventory
            .fixed_container_ids()
            .into_iter()
            .chain(merged.inventory.fixed_container_ids())
            .collect();
        // Fresh ids may land next to pre-session items.
        rng.reserve(merged.inventory.items.iter().map(|i| i.id.clone()));
        let remapped = remap_identities(
            std::mem::take(&mut post.profile.inventory.items),
            &exempt,
            &merged.insured_items,
            &post.profile.inventory.fast_panel,
            rng,
        );
        post.profile.inventory.items = remapped.items;
        post.profile.inventory.fast_panel = remapped.fast_panel;
        let gaps = remapped.gaps;
        let renamed = remapped.renamed;

        // 6. money stacks
        normalize_money_stacks(&mut post.profile.inventory.items);

        // 7. retention
        let retention = Retention::from_config(self.config);
        let session_items_kept: Vec<ItemId> = match retention {
            Retention::AllItems => {
                // Insurance follows the remap only when the remapped items land.
                for entry in &mut merged.insured_items {
                    if let Some(fresh) = renamed.get(&entry.item_id) {
                        entry.item_id = fresh.clone();
                    }
                }
                merged.inventory = adopt_session_inventory(
                    std::mem::take(&mut merged.inventory),
                    &post.profile.inventory,
                );
                post.profile.inventory.items.iter().map(|i| i.id.clone()).collect()
            }
            Retention::ProtectedContainer => {
                let (inventory, grafted) = graft_protected_container(
                    std::mem::take(&mut merged.inventory),
                    &post.profile.inventory.items,
                );
                merged.inventory = inventory;
                grafted
            }
            Retention::Nothing => Vec::new(),
        };
        log::debug!(
            "session={session_id} inventory: {retention:?} kept {} session items",
            session_items_kept.len()
        );
        let pruned = prune_dangling_references(&mut merged.inventory, &mut merged.insured_items);
        if !pruned.is_empty() {
            log::debug!(
                "session={session_id} inventory: dropped references to {} retired items",
                pruned.len()
            );
        }

        // 8. found-in-session status
        if !self.config.retain_found_in_raid_status {
            let kept: HashSet<ItemId> = session_items_kept.iter().cloned().collect();
            strip_found_in_session(&mut merged.inventory.items, &kept);
        }

        // 9. standing
        let standing = apply_standing_clamp(
            &mut merged,
            &post.profile,
            scav.as_mut(),
            FENCE_TRADER_ID,
            STANDING_LOWER_BOUND,
            STANDING_UPPER_BOUND,
        );

        // 10. encyclopedia across personas
        if let Some(scav) = scav.as_mut() {
            merge_encyclopedias(&mut merged, scav);
        }

        // 11. vitality
        if self.config.save_vitality {
            collaborators.health.persist_health(
                &mut merged,
                &post.health,
                session_id,
                post.exit.is_dead(),
            )?;
        } else {
            clear_body_part_effects(&mut merged);
        }

        if self.config.use_sacred_amulet {
            apply_sacred_amulet(&mut merged, &post);
        }

        let quest_changes = diff_quests(&pre_quests, &merged.quests);
        for change in &quest_changes {
            log::debug!(
                "session={session_id} quests: {} {:?} -> {:?}",
                change.qid,
                change.before,
                change.after
            );
        }

        log::debug!("session={session_id} stage: {:?}", Stage::SideEffects);
        let side_effects = self.side_effects(session_id, &post, &merged);

        log::debug!("session={session_id} stage: {:?}", Stage::Done);
        Ok(Reconciliation {
            account: AccountProfile {
                characters: Characters { pmc: merged, scav },
                inraid,
                extra,
            },
            side_effects,
            discrepancies,
            applied_fields,
            gaps,
            quest_changes,
            retention,
            lost_quest_items,
            session_items_kept,
            standing,
        })
    }

    fn side_effects(
        &self,
        session_id: &str,
        post: &PostSessionResult,
        merged: &ProfileSnapshot,
    ) -> Vec<SideEffect> {
        let mut effects = Vec::new();

        if post.exit.is_dead() {
            if self.config.killer_messages {
                if let Some(aggressor) = post.aggressor() {
                    effects.push(SideEffect::KillerMessage {
                        session_id: session_id.to_string(),
                        aggressor: aggressor.clone(),
                        profile: Box::new(merged.clone()),
                    });
                }
            }
            effects.push(SideEffect::ClearMatchCache);
        }

        let victims = post.player_victims();
        if self.config.victim_messages && !victims.is_empty() {
            effects.push(SideEffect::VictimMessages {
                session_id: session_id.to_string(),
                victims,
                profile: Box::new(merged.clone()),
            });
        }

        effects
    }
}

/// Make both personas know every item either of them has seen.
pub fn merge_encyclopedias(pmc: &mut ProfileSnapshot, scav: &mut ProfileSnapshot) {
    for (tpl, examined) in &scav.encyclopedia {
        let entry = pmc.encyclopedia.entry(tpl.clone()).or_insert(false);
        *entry |= *examined;
    }
    scav.encyclopedia = pmc.encyclopedia.clone();
}

/// On the amulet location a USEC death spends one of the remaining
/// safe-passage kills. Never goes below zero.
fn apply_sacred_amulet(merged: &mut ProfileSnapshot, post: &PostSessionResult) {
    if !post.location_name.eq_ignore_ascii_case(AMULET_LOCATION)
        || !post.profile.info.side.eq_ignore_ascii_case(AMULET_SIDE)
    {
        return;
    }
    let counter = merged
        .stats
        .eft
        .overall_counters
        .items
        .iter_mut()
        .find(|c| c.key.iter().any(|k| k.contains(AMULET_COUNTER)));
    if let Some(counter) = counter {
        if counter.value > 0 {
            counter.value -= 1;
        }
    }
}

fn diff_quests(before: &[QuestStatus], after: &[QuestStatus]) -> Vec<QuestChange> {
    after
        .iter()
        .filter_map(|q| {
            let prior = before.iter().find(|p| p.qid == q.qid).map(|p| p.status);
            (prior != Some(q.status)).then(|| QuestChange {
                qid: q.qid.clone(),
                before: prior,
                after: q.status,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::CounterKeyValue;

    #[test]
    fn encyclopedias_union_both_ways() {
        let mut pmc = ProfileSnapshot::default();
        pmc.encyclopedia.insert("a".into(), true);
        pmc.encyclopedia.insert("b".into(), false);
        let mut scav = ProfileSnapshot::default();
        scav.encyclopedia.insert("b".into(), true);
        scav.encyclopedia.insert("c".into(), false);

        merge_encyclopedias(&mut pmc, &mut scav);

        assert_eq!(pmc.encyclopedia, scav.encyclopedia);
        assert_eq!(pmc.encyclopedia.len(), 3);
        assert!(pmc.encyclopedia["b"]);
    }

    #[test]
    fn amulet_counter_never_goes_negative() {
        let mut merged = ProfileSnapshot::default();
        merged.stats.eft.overall_counters.items.push(CounterKeyValue {
            key: vec!["UsecRaidRemainKills".into()],
            value: 1,
        });
        let mut profile = ProfileSnapshot::default();
        profile.info.side = "Usec".into();
        let post = PostSessionResult {
            exit: crate::profile::ExitStatus::Killed,
            profile,
            health: Default::default(),
            location_name: "Lighthouse".into(),
            is_player_scav: false,
        };

        apply_sacred_amulet(&mut merged, &post);
        apply_sacred_amulet(&mut merged, &post);

        assert_eq!(merged.stats.eft.overall_counters.items[0].value, 0);
    }

    #[test]
    fn quest_diff_reports_new_and_changed() {
        let before = vec![QuestStatus {
            qid: "q1".into(),
            status: QuestState::Started,
            ..QuestStatus::default()
        }];
        let after = vec![
            QuestStatus {
                qid: "q1".into(),
                status: QuestState::AvailableForFinish,
                ..QuestStatus::default()
            },
            QuestStatus {
                qid: "q2".into(),
                status: QuestState::Started,
                ..QuestStatus::default()
            },
        ];
        let changes = diff_quests(&before, &after);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].before, Some(QuestState::Started));
        assert_eq!(changes[1].before, None);
    }
}
