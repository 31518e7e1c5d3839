//! Inventory helpers used while rebuilding the persisted inventory.

use crate::{
    config::KeepConfig,
    item_graph::{descendants_of, find_protected_subtree, remove_protected_subtree, remove_subtree},
    profile::{InsuredItem, Inventory, Item, ItemUpd},
    types::ItemId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What survives from the post-session inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    /// Adopt everything brought back.
    AllItems,
    /// Keep only the protected container and its contents.
    ProtectedContainer,
    /// Keep the pre-session inventory as it was.
    Nothing,
}

impl Retention {
    pub fn from_config(config: &KeepConfig) -> Self {
        if config.keep_items_found_in_raid {
            Self::AllItems
        } else if config.keep_items_in_secure_container {
            Self::ProtectedContainer
        } else {
            Self::Nothing
        }
    }
}

/// Money stacks from a session may arrive without a count; a missing
/// count means one.
pub fn normalize_money_stacks(items: &mut [Item]) {
    for item in items.iter_mut().filter(|i| i.is_money()) {
        let upd = item.upd.get_or_insert_with(ItemUpd::default);
        if upd.stack_objects_count.is_none() {
            upd.stack_objects_count = Some(1);
        }
    }
}

/// Remove the found-in-session status from the items whose id is in `ids`.
/// Returns how many items lost the status.
pub fn strip_found_in_session(items: &mut [Item], ids: &HashSet<ItemId>) -> usize {
    let mut stripped = 0;
    for item in items.iter_mut().filter(|i| ids.contains(&i.id)) {
        if let Some(upd) = item.upd.as_mut() {
            if upd.spawned_in_session.take().is_some() {
                stripped += 1;
            }
        }
    }
    stripped
}

/// Items held in the quest-raid container (not the container itself).
pub fn quest_items(inventory: &Inventory) -> Vec<Item> {
    if inventory.quest_raid_items.is_empty() {
        return Vec::new();
    }
    descendants_of(&inventory.items, &inventory.quest_raid_items)
}

/// Remove the given items and everything they contain from `inventory`.
pub fn remove_items(inventory: &mut Inventory, ids: &[ItemId]) -> Vec<Item> {
    let mut removed = Vec::new();
    for id in ids {
        let items = std::mem::take(&mut inventory.items);
        let (kept, gone) = remove_subtree(items, id);
        inventory.items = kept;
        removed.extend(gone);
    }
    let gone: HashSet<&str> = removed.iter().map(|i| i.id.as_str()).collect();
    inventory.fast_panel.retain(|_, id| !gone.contains(id.as_str()));
    removed
}

/// The merged inventory when everything from the session is kept: the
/// pre-session stash and other containers stay, the equipment and quest
/// raid subtrees are replaced by the post-session ones.
pub fn adopt_session_inventory(pre: Inventory, post: &Inventory) -> Inventory {
    let mut merged = pre;
    let mut items = std::mem::take(&mut merged.items);
    for root in [&merged.equipment, &merged.quest_raid_items] {
        if !root.is_empty() {
            items = remove_subtree(items, root).0;
        }
    }

    let incoming: HashSet<&str> = post.items.iter().map(|i| i.id.as_str()).collect();
    items.retain(|i| !incoming.contains(i.id.as_str()));

    let mut adopted = post.items.clone();
    adopted.extend(items);
    merged.items = adopted;
    merged.fast_panel = post.fast_panel.clone();
    merged
}

/// Replace the pre-session protected container with the one from the
/// session. Returns the inventory and the ids grafted in; when the session
/// has no protected container the inventory is returned untouched.
pub fn graft_protected_container(pre: Inventory, post_items: &[Item]) -> (Inventory, Vec<ItemId>) {
    let Some(mut subtree) = find_protected_subtree(post_items) else {
        log::debug!("inventory: no protected container in session inventory; nothing to keep");
        return (pre, Vec::new());
    };
    let grafted: Vec<ItemId> = subtree.iter().map(|i| i.id.clone()).collect();

    let mut merged = pre;
    // The container hangs off the equipment of the profile it lands in.
    if !merged.equipment.is_empty() {
        subtree[0].parent_id = Some(merged.equipment.clone());
    }
    let mut items = remove_protected_subtree(std::mem::take(&mut merged.items));
    let incoming: HashSet<&str> = grafted.iter().map(String::as_str).collect();
    items.retain(|i| !incoming.contains(i.id.as_str()));
    items.extend(subtree);
    merged.items = items;
    (merged, grafted)
}

/// Drop quick-access slots and insurance entries that name items no longer
/// in `inventory`. Returns the dropped identities, sorted.
pub fn prune_dangling_references(
    inventory: &mut Inventory,
    insured: &mut Vec<InsuredItem>,
) -> Vec<ItemId> {
    let present: HashSet<&str> = inventory.items.iter().map(|i| i.id.as_str()).collect();
    let mut dropped: Vec<ItemId> = Vec::new();

    inventory.fast_panel.retain(|_, id| {
        let keep = present.contains(id.as_str());
        if !keep {
            dropped.push(id.clone());
        }
        keep
    });
    insured.retain(|entry| {
        let keep = present.contains(entry.item_id.as_str());
        if !keep {
            dropped.push(entry.item_id.clone());
        }
        keep
    });

    dropped.sort_unstable();
    dropped.dedup();
    dropped
}
