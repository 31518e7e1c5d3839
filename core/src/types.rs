//! Shared primitive types used across the reconciliation engine.

/// Identifies one session-end event. Also the persistence key of an account.
pub type SessionId = String;

/// A stable, unique identifier for an item within one snapshot.
pub type ItemId = String;

/// An item template identifier (`_tpl`).
pub type TemplateId = String;

/// A trader identifier, the key of a profile's `TradersInfo` table.
pub type TraderId = String;
