//! Post-session profile reconciliation.
//!
//! When a session ends badly for the actor, the persisted profile is
//! rebuilt from the pre-session profile and the session's own snapshot,
//! under a static keep/discard policy. `reconcile` holds the pipeline;
//! `engine` connects it to persistence and the other collaborators.

pub mod config;
pub mod counters;
pub mod engine;
pub mod error;
pub mod event;
pub mod health;
pub mod inventory;
pub mod item_graph;
pub mod merge;
pub mod profile;
pub mod quest_items;
pub mod reconcile;
pub mod remap;
pub mod rng;
pub mod side_effect;
pub mod standing;
pub mod store;
pub mod types;
