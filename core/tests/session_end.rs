//! End-to-end tests for SessionEndEngine against an in-memory store.

mod common;

use aftermath_core::{
    counters::{Discrepancy, DiscrepancyKind, DiscrepancySink},
    engine::{SessionEndEngine, SessionEndReport},
    error::{ReconcileError, ReconcileResult},
    event::ReconcileEvent,
    health::HealthSync,
    profile::{
        Aggressor, ExitStatus, HealthSyncPayload, Item, ProfileSnapshot, QuestState, QuestStatus,
        Victim,
    },
    quest_items::{PickupCondition, PickupConditionTable},
    side_effect::{MatchBotCache, MessageDispatcher},
    store::{ProfileRepository, ProfileStore},
};
use common::*;
use serde_json::json;
use std::{cell::RefCell, rc::Rc, sync::Arc};

fn seeded_store() -> ProfileStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = ProfileStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.put_profile(SESSION, &account()).unwrap();
    store
}

#[derive(Default, Clone)]
struct RecordingSink(Rc<RefCell<Vec<Discrepancy>>>);

impl DiscrepancySink for RecordingSink {
    fn report_discrepancy(&mut self, _session_id: &str, d: &Discrepancy) {
        self.0.borrow_mut().push(d.clone());
    }
}

#[derive(Default, Clone)]
struct RecordingMessages(Rc<RefCell<Vec<String>>>);

impl MessageDispatcher for RecordingMessages {
    fn dispatch_killer_message(
        &mut self,
        _session_id: &str,
        _profile: &ProfileSnapshot,
        aggressor: &Aggressor,
    ) -> ReconcileResult<()> {
        self.0.borrow_mut().push(format!("killer:{}", aggressor.name));
        Ok(())
    }

    fn dispatch_victim_messages(
        &mut self,
        _session_id: &str,
        victims: &[Victim],
        _profile: &ProfileSnapshot,
    ) -> ReconcileResult<()> {
        for v in victims {
            self.0.borrow_mut().push(format!("victim:{}", v.name));
        }
        Ok(())
    }
}

struct OfflineMailbox;

impl MessageDispatcher for OfflineMailbox {
    fn dispatch_killer_message(
        &mut self,
        _: &str,
        _: &ProfileSnapshot,
        _: &Aggressor,
    ) -> ReconcileResult<()> {
        Err(ReconcileError::collaborator("messages", "mailbox offline"))
    }

    fn dispatch_victim_messages(
        &mut self,
        _: &str,
        _: &[Victim],
        _: &ProfileSnapshot,
    ) -> ReconcileResult<()> {
        Err(ReconcileError::collaborator("messages", "mailbox offline"))
    }
}

struct BrokenHealth;

impl HealthSync for BrokenHealth {
    fn persist_health(
        &mut self,
        _: &mut ProfileSnapshot,
        _: &HealthSyncPayload,
        _: &str,
        _: bool,
    ) -> ReconcileResult<()> {
        Err(ReconcileError::collaborator("health", "sync refused"))
    }
}

fn event_types(store: &ProfileStore) -> Vec<String> {
    store
        .events_for_session(SESSION)
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Happy paths
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn death_is_reconciled_persisted_and_logged() {
    let messages = RecordingMessages::default();
    let mut engine = SessionEndEngine::build_test(seeded_store(), 42)
        .with_messages(Box::new(messages.clone()));
    engine.cache().insert("bot-1", json!({ "level": 30 }));

    let report = engine.handle_session_end(SESSION, killed_by_pmc()).unwrap();
    assert!(matches!(report, SessionEndReport::Reconciled(_)));

    let stored = engine.store.load_profile(SESSION).unwrap();
    assert_eq!(stored.characters.pmc.info.level, 12);
    assert_eq!(stored.inraid.location, "none");
    assert!(engine.cache().is_empty(), "match cache cleared on death");
    assert_eq!(
        *messages.0.borrow(),
        vec!["killer:Killa".to_string(), "victim:bear-1".to_string()]
    );

    let types = event_types(&engine.store);
    assert_eq!(types[0], "session_reconciled");
    assert_eq!(types.iter().filter(|t| *t == "side_effect_executed").count(), 3);
}

#[test]
fn survived_session_takes_the_default_path() {
    let mut engine = SessionEndEngine::build_test(seeded_store(), 42);
    let post = post(ExitStatus::Survived);

    let report = engine.handle_session_end(SESSION, post.clone()).unwrap();
    assert!(matches!(report, SessionEndReport::PassedThrough));

    let stored = engine.store.load_profile(SESSION).unwrap();
    assert_eq!(stored.characters.pmc, post.profile, "session profile adopted as-is");
    assert_eq!(event_types(&engine.store), vec!["session_passed_through"]);
}

#[test]
fn shared_cache_is_cleared_for_every_holder() {
    let cache = Arc::new(MatchBotCache::new());
    cache.insert("bot-1", json!({}));
    let held_elsewhere = Arc::clone(&cache);

    let mut engine = SessionEndEngine::build_test(seeded_store(), 1).with_cache(cache);
    engine.handle_session_end(SESSION, killed_by_pmc()).unwrap();

    assert!(held_elsewhere.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Counter discrepancies
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unknown_counter_is_reported_and_still_adopted() {
    let sink = RecordingSink::default();
    let mut engine = SessionEndEngine::build_test(seeded_store(), 42)
        .with_discrepancy_sink(Box::new(sink.clone()));

    let mut post = post(ExitStatus::Killed);
    post.profile.task_condition_counters.insert("k1".into(), counter("k1", 5.0));

    let report = engine.handle_session_end(SESSION, post).unwrap();
    let SessionEndReport::Reconciled(result) = report else {
        panic!("expected reconciliation");
    };

    let reported = sink.0.borrow();
    let missing: Vec<_> = reported
        .iter()
        .filter(|d| d.kind == DiscrepancyKind::MissingKey)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].key, "k1");
    assert_eq!(result.discrepancies, *reported);

    let stored = engine.store.load_profile(SESSION).unwrap();
    assert_eq!(stored.characters.pmc.task_condition_counters["k1"].value, Some(5.0));

    let logged: Vec<_> = engine
        .store
        .events_for_session(SESSION)
        .unwrap()
        .into_iter()
        .filter_map(|e| match e.event().unwrap() {
            ReconcileEvent::CounterDiscrepancyFound { discrepancy, .. } => Some(discrepancy),
            _ => None,
        })
        .collect();
    assert_eq!(logged, *reported);
}

// ─────────────────────────────────────────────────────────────────────────────
// Quest item loss
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn lost_quest_item_reopens_its_pickup_condition() {
    let store = seeded_store();
    let mut acct = account();
    acct.characters.pmc.quests.push(QuestStatus {
        qid: "q-flash".into(),
        status: QuestState::Started,
        ..QuestStatus::default()
    });
    store.put_profile(SESSION, &acct).unwrap();

    let table = PickupConditionTable::new(vec![PickupCondition {
        quest_id: "q-flash".into(),
        condition_id: "pick-flash".into(),
        targets: vec!["tpl-flash".into()],
    }]);
    let mut engine = SessionEndEngine::build_test(store, 42).with_quest_repair(Box::new(table));
    engine.config.keep_quest_items = false;

    let mut post = post(ExitStatus::Killed);
    post.profile.quests.push(QuestStatus {
        qid: "q-flash".into(),
        status: QuestState::AvailableForFinish,
        completed_conditions: vec!["pick-flash".into()],
        ..QuestStatus::default()
    });

    let report = engine.handle_session_end(SESSION, post).unwrap();
    let SessionEndReport::Reconciled(result) = report else {
        panic!("expected reconciliation");
    };

    assert_eq!(result.lost_quest_items, vec!["flash".to_string()]);
    let quest = &result.account.characters.pmc.quests[0];
    assert!(quest.completed_conditions.is_empty());
    assert!(event_types(&engine.store).contains(&"quest_items_lost".to_string()));
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure atomicity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn failing_messenger_leaves_stored_profile_untouched() {
    let mut engine = SessionEndEngine::build_test(seeded_store(), 42)
        .with_messages(Box::new(OfflineMailbox));

    let err = engine.handle_session_end(SESSION, killed_by_pmc()).unwrap_err();
    assert!(matches!(err, ReconcileError::Collaborator { name: "messages", .. }));

    assert_eq!(engine.store.load_profile(SESSION).unwrap(), account());
    assert_eq!(engine.store.event_count(SESSION).unwrap(), 0);
}

#[test]
fn failing_health_sync_leaves_stored_profile_untouched() {
    let mut engine = SessionEndEngine::build_test(seeded_store(), 42)
        .with_health(Box::new(BrokenHealth));
    engine.config.save_vitality = true;

    let err = engine.handle_session_end(SESSION, post(ExitStatus::Killed)).unwrap_err();
    assert!(matches!(err, ReconcileError::Collaborator { name: "health", .. }));

    assert_eq!(engine.store.load_profile(SESSION).unwrap(), account());
    assert_eq!(engine.store.event_count(SESSION).unwrap(), 0);
}

#[test]
fn unknown_session_is_an_error() {
    let store = ProfileStore::in_memory().unwrap();
    store.migrate().unwrap();
    let mut engine = SessionEndEngine::build_test(store, 42);

    let err = engine.handle_session_end("nobody", post(ExitStatus::Killed)).unwrap_err();
    assert!(matches!(err, ReconcileError::ProfileNotFound { .. }));
}

#[test]
fn same_seed_same_session_gives_same_profile() {
    let run = || {
        let mut engine = SessionEndEngine::build_test(seeded_store(), 7);
        engine.config.keep_items_found_in_raid = true;
        engine.handle_session_end(SESSION, post(ExitStatus::Killed)).unwrap();
        engine.store.load_profile(SESSION).unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a, b);
    assert!(a.characters.pmc.inventory.items.iter().any(|i: &Item| i.tpl == "tpl-loot"));
}
