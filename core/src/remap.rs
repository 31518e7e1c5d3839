//! Identity remapping for a post-session item graph.
//!
//! Items brought back from a session get fresh identities before they are
//! written into the persisted profile. Every reference to an old identity
//! (parent links, insurance entries, quick-access slots) is rewritten in
//! the same pass, so the output never points at a retired identity.

use crate::{
    profile::{InsuredItem, Item},
    rng::IdRng,
    types::ItemId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// An item whose declared parent was not in the graph. The item was kept
/// as a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferentialGap {
    pub item_id: ItemId,
    pub missing_parent: ItemId,
}

#[derive(Debug, Clone, Default)]
pub struct RemapOutcome {
    pub items: Vec<Item>,
    pub insured: Vec<InsuredItem>,
    pub fast_panel: BTreeMap<String, ItemId>,
    pub gaps: Vec<ReferentialGap>,
    /// old identity → new identity
    pub renamed: HashMap<ItemId, ItemId>,
}

/// Reissue the identity of every item not in `exempt` and rewrite all
/// references to match.
///
/// Insured and quick-access entries whose target is absent from the
/// output graph are dropped.
pub fn remap_identities(
    items: Vec<Item>,
    exempt: &HashSet<ItemId>,
    insured: &[InsuredItem],
    fast_panel: &BTreeMap<String, ItemId>,
    rng: &mut IdRng,
) -> RemapOutcome {
    let mut taken: HashSet<ItemId> = items.iter().map(|i| i.id.clone()).collect();
    let present = taken.clone();

    let mut renamed: HashMap<ItemId, ItemId> = HashMap::new();
    for item in &items {
        if exempt.contains(&item.id) || renamed.contains_key(&item.id) {
            continue;
        }
        let fresh = rng.next_id(&taken);
        taken.insert(fresh.clone());
        renamed.insert(item.id.clone(), fresh);
    }

    let rename = |id: &ItemId| renamed.get(id).cloned().unwrap_or_else(|| id.clone());

    let mut gaps = Vec::new();
    let items: Vec<Item> = items
        .into_iter()
        .map(|mut item| {
            let old_id = item.id.clone();
            item.id = rename(&old_id);
            item.parent_id = match item.parent_id.take() {
                Some(parent) if present.contains(&parent) => Some(rename(&parent)),
                Some(parent) => {
                    log::warn!(
                        "remap: item {old_id} references missing parent {parent}; treating it as a root"
                    );
                    gaps.push(ReferentialGap {
                        item_id: old_id,
                        missing_parent: parent,
                    });
                    None
                }
                None => None,
            };
            item
        })
        .collect();

    let output_ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();

    let insured: Vec<InsuredItem> = insured
        .iter()
        .map(|entry| InsuredItem {
            tid: entry.tid.clone(),
            item_id: rename(&entry.item_id),
        })
        .filter(|entry| output_ids.contains(entry.item_id.as_str()))
        .collect();

    let fast_panel: BTreeMap<String, ItemId> = fast_panel
        .iter()
        .map(|(slot, id)| (slot.clone(), rename(id)))
        .filter(|(_, id)| output_ids.contains(id.as_str()))
        .collect();

    log::debug!(
        "remap: {} of {} items reissued, {} gaps",
        renamed.len(),
        items.len(),
        gaps.len()
    );

    RemapOutcome {
        items,
        insured,
        fast_panel,
        gaps,
        renamed,
    }
}
