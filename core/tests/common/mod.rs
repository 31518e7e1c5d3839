//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use aftermath_core::profile::{
    AccountProfile, Aggressor, Characters, ExitStatus, HealthSyncPayload, InsuredItem, Inventory,
    Item, ItemUpd, PostSessionResult, ProfileSnapshot, TaskConditionCounter, TraderInfo, Victim,
    FENCE_TRADER_ID, PROTECTED_CONTAINER_SLOT,
};
use std::collections::BTreeMap;

pub const SESSION: &str = "session-0001";

pub fn fixed_roots() -> Vec<Item> {
    vec![
        Item::new("equip", "tpl-equipment"),
        Item::new("stash", "tpl-stash"),
        Item::new("sort", "tpl-sorting"),
        Item::new("qri", "tpl-quest-raid"),
        Item::new("qsi", "tpl-quest-stash"),
    ]
}

pub fn inventory(items: Vec<Item>) -> Inventory {
    Inventory {
        items,
        equipment: "equip".into(),
        stash: "stash".into(),
        sorting_table: "sort".into(),
        quest_raid_items: "qri".into(),
        quest_stash_items: "qsi".into(),
        ..Inventory::default()
    }
}

pub fn fir(mut item: Item) -> Item {
    item.upd = Some(ItemUpd {
        spawned_in_session: Some(true),
        ..ItemUpd::default()
    });
    item
}

pub fn counter(id: &str, value: f64) -> TaskConditionCounter {
    TaskConditionCounter {
        id: id.into(),
        source_id: "quest-1".into(),
        kind: "CounterCreator".into(),
        value: Some(value),
    }
}

pub fn trader(standing: f64) -> TraderInfo {
    TraderInfo {
        standing,
        ..TraderInfo::default()
    }
}

/// Pre-session primary persona: level 10, an old protected container with
/// one item, a gun in the stash.
pub fn pre_profile() -> ProfileSnapshot {
    let mut items = fixed_roots();
    items.extend([
        Item::new("old-secure", "tpl-alpha").child_of("equip", PROTECTED_CONTAINER_SLOT),
        Item::new("old-gem", "tpl-old-gem").child_of("old-secure", "main"),
        Item::new("stash-gun", "tpl-gun").child_of("stash", "hideout"),
        Item::new("rig", "tpl-rig").child_of("equip", "TacticalVest"),
    ]);

    let mut p = ProfileSnapshot {
        id: "pmc-1".into(),
        inventory: inventory(items),
        ..ProfileSnapshot::default()
    };
    p.info.nickname = "Tester".into();
    p.info.side = "Usec".into();
    p.info.level = 10;
    p.info.experience = 5_000;
    p.stats.eft.total_session_experience = 0;
    p.encyclopedia.insert("tpl-gun".into(), true);
    p.task_condition_counters.insert("c-kills".into(), counter("c-kills", 2.0));
    p.traders_info.insert(FENCE_TRADER_ID.into(), trader(1.0));
    p.insured_items.push(InsuredItem {
        tid: "prapor".into(),
        item_id: "rig".into(),
    });
    p
}

/// The session's view of the same persona: level 12, a new protected
/// container with two nested items, found-in-session loot, a quest item.
pub fn post_profile() -> ProfileSnapshot {
    let mut items = fixed_roots();
    items.extend([
        Item::new("secure", "tpl-gamma").child_of("equip", PROTECTED_CONTAINER_SLOT),
        fir(Item::new("case", "tpl-case").child_of("secure", "main")),
        fir(Item::new("gem", "tpl-gem").child_of("case", "main")),
        Item::new("rig", "tpl-rig").child_of("equip", "TacticalVest"),
        fir(Item::new("loot", "tpl-loot").child_of("rig", "1")),
        Item::new("cash", aftermath_core::profile::MONEY_TEMPLATES[0]).child_of("rig", "2"),
        fir(Item::new("flash", "tpl-flash").child_of("qri", "main")),
    ]);

    let mut p = ProfileSnapshot {
        id: "pmc-1".into(),
        inventory: inventory(items),
        ..ProfileSnapshot::default()
    };
    p.inventory.fast_panel = BTreeMap::from([("Item4".to_string(), "loot".to_string())]);
    p.info.nickname = "Tester".into();
    p.info.side = "Usec".into();
    p.info.level = 12;
    p.info.experience = 5_000;
    p.stats.eft.total_session_experience = 750;
    p.encyclopedia.insert("tpl-gem".into(), true);
    p.task_condition_counters.insert("c-kills".into(), counter("c-kills", 3.0));
    p.traders_info.insert(FENCE_TRADER_ID.into(), trader(2.5));
    p
}

pub fn scav_profile() -> ProfileSnapshot {
    let mut p = ProfileSnapshot {
        id: "scav-1".into(),
        ..ProfileSnapshot::default()
    };
    p.encyclopedia.insert("tpl-scav-find".into(), true);
    p.traders_info.insert(FENCE_TRADER_ID.into(), trader(0.0));
    p
}

pub fn account() -> AccountProfile {
    AccountProfile {
        characters: Characters {
            pmc: pre_profile(),
            scav: Some(scav_profile()),
        },
        ..AccountProfile::default()
    }
}

pub fn post(exit: ExitStatus) -> PostSessionResult {
    PostSessionResult {
        exit,
        profile: post_profile(),
        health: HealthSyncPayload::default(),
        location_name: "bigmap".into(),
        is_player_scav: false,
    }
}

pub fn killed_by_pmc() -> PostSessionResult {
    let mut post = post(ExitStatus::Killed);
    post.profile.stats.eft.aggressor = Some(Aggressor {
        name: "Killa".into(),
        role: "sptBear".into(),
        ..Aggressor::default()
    });
    post.profile.stats.eft.victims = vec![
        Victim {
            name: "bear-1".into(),
            role: "sptBear".into(),
            ..Victim::default()
        },
        Victim {
            name: "scav-1".into(),
            role: "assault".into(),
            ..Victim::default()
        },
    ];
    post
}

pub fn tpls(items: &[Item]) -> Vec<&str> {
    let mut out: Vec<&str> = items.iter().map(|i| i.tpl.as_str()).collect();
    out.sort_unstable();
    out
}
