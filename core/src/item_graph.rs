//! Item ownership graph utilities.
//!
//! Items form a rooted forest through `parent_id`. The item generator
//! never produces cycles; traversals here still carry a visited set, and
//! `find_cycle` checks the invariant explicitly so callers can log a
//! malformed graph instead of silently walking it.

use crate::{
    profile::{Item, PROTECTED_CONTAINER_SLOT},
    types::ItemId,
};
use std::collections::{HashMap, HashSet, VecDeque};

/// parent id → indices of its direct children, in input order.
fn children_index(items: &[Item]) -> HashMap<&str, Vec<usize>> {
    let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        if let Some(parent) = item.parent_id.as_deref() {
            index.entry(parent).or_default().push(i);
        }
    }
    index
}

/// Return the root item `root_id` followed by every transitive descendant,
/// breadth first. Empty when the root is not in `items`.
pub fn collect_subtree(items: &[Item], root_id: &str) -> Vec<Item> {
    subtree_indices(items, root_id)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}

fn subtree_indices(items: &[Item], root_id: &str) -> Vec<usize> {
    let Some(root) = items.iter().position(|i| i.id == root_id) else {
        return Vec::new();
    };
    let index = children_index(items);
    let mut visited: HashSet<usize> = HashSet::from([root]);
    let mut order = vec![root];
    let mut queue = VecDeque::from([root]);

    while let Some(current) = queue.pop_front() {
        let Some(children) = index.get(items[current].id.as_str()) else {
            continue;
        };
        for &child in children {
            if visited.insert(child) {
                order.push(child);
                queue.push_back(child);
            }
        }
    }
    order
}

/// The protected container and everything inside it, if the graph has one.
pub fn find_protected_subtree(items: &[Item]) -> Option<Vec<Item>> {
    let container = items
        .iter()
        .find(|i| i.slot_id.as_deref() == Some(PROTECTED_CONTAINER_SLOT))?;
    Some(collect_subtree(items, &container.id))
}

/// Split `items` into (kept, removed) where removed is the subtree rooted
/// at `root_id`. Input order is preserved on both sides.
pub fn remove_subtree(items: Vec<Item>, root_id: &str) -> (Vec<Item>, Vec<Item>) {
    let doomed: HashSet<usize> = subtree_indices(&items, root_id).into_iter().collect();
    let mut kept = Vec::with_capacity(items.len() - doomed.len());
    let mut removed = Vec::with_capacity(doomed.len());
    for (i, item) in items.into_iter().enumerate() {
        if doomed.contains(&i) {
            removed.push(item);
        } else {
            kept.push(item);
        }
    }
    (kept, removed)
}

/// Drop every protected container in `items`, with its contents.
pub fn remove_protected_subtree(items: Vec<Item>) -> Vec<Item> {
    let roots: Vec<ItemId> = items
        .iter()
        .filter(|i| i.slot_id.as_deref() == Some(PROTECTED_CONTAINER_SLOT))
        .map(|i| i.id.clone())
        .collect();
    roots
        .iter()
        .fold(items, |acc, root| remove_subtree(acc, root).0)
}

/// The direct and transitive children of `root_id`, excluding the root.
pub fn descendants_of(items: &[Item], root_id: &str) -> Vec<Item> {
    let mut subtree = collect_subtree(items, root_id);
    if !subtree.is_empty() {
        subtree.remove(0);
    }
    subtree
}

/// First item found on a parent cycle, or None for a well-formed forest.
pub fn find_cycle(items: &[Item]) -> Option<ItemId> {
    let parent_of: HashMap<&str, &str> = items
        .iter()
        .filter_map(|i| i.parent_id.as_deref().map(|p| (i.id.as_str(), p)))
        .collect();
    let mut cleared: HashSet<&str> = HashSet::new();

    for item in items {
        let mut path: HashSet<&str> = HashSet::new();
        let mut current = item.id.as_str();
        loop {
            if cleared.contains(current) {
                break;
            }
            if !path.insert(current) {
                return Some(current.to_string());
            }
            match parent_of.get(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        cleared.extend(path);
    }
    None
}

/// Items whose parent is not part of the graph.
pub fn dangling_parents(items: &[Item]) -> Vec<ItemId> {
    let ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
    items
        .iter()
        .filter(|i| i.parent_id.as_deref().is_some_and(|p| !ids.contains(p)))
        .map(|i| i.id.clone())
        .collect()
}
