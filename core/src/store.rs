//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine goes through ProfileRepository; it never executes SQL.

use rusqlite::{params, Connection, OptionalExtension};
use crate::{
    error::{ReconcileError, ReconcileResult},
    event::EventLogEntry,
    profile::AccountProfile,
};

/// Load/save of account profiles by session id.
pub trait ProfileRepository {
    fn load_profile(&self, session_id: &str) -> ReconcileResult<AccountProfile>;

    /// Persist `account` and its events as one unit: either both land or
    /// neither does.
    fn commit(
        &mut self,
        session_id: &str,
        account: &AccountProfile,
        events: &[EventLogEntry],
    ) -> ReconcileResult<()>;
}

pub struct ProfileStore {
    conn: Connection,
}

impl ProfileStore {
    /// Open (or create) the profile database at `path`.
    pub fn open(path: &str) -> ReconcileResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ReconcileResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ReconcileResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_profiles.sql"))?;
        Ok(())
    }

    // ── Profiles ───────────────────────────────────────────────

    /// Insert or replace the stored profile for `session_id`.
    pub fn put_profile(&self, session_id: &str, account: &AccountProfile) -> ReconcileResult<()> {
        let json = serde_json::to_string(account)?;
        self.conn.execute(
            "INSERT INTO account_profile (session_id, profile_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO UPDATE SET
                profile_json = excluded.profile_json,
                updated_at   = excluded.updated_at",
            params![session_id, json, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, session_id: &str) -> ReconcileResult<Option<AccountProfile>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT profile_json FROM account_profile WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn events_for_session(&self, session_id: &str) -> ReconcileResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, event_type, payload, created_at
             FROM reconcile_event WHERE session_id = ?1
             ORDER BY id ASC"
        )?;
        let entries = stmt.query_map(params![session_id], |row| {
            Ok(EventLogEntry {
                id:         Some(row.get(0)?),
                session_id: row.get(1)?,
                event_type: row.get(2)?,
                payload:    row.get(3)?,
                created_at: row.get(4)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, session_id: &str) -> ReconcileResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM reconcile_event WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl ProfileRepository for ProfileStore {
    fn load_profile(&self, session_id: &str) -> ReconcileResult<AccountProfile> {
        self.get_profile(session_id)?
            .ok_or_else(|| ReconcileError::ProfileNotFound {
                session_id: session_id.to_string(),
            })
    }

    fn commit(
        &mut self,
        session_id: &str,
        account: &AccountProfile,
        events: &[EventLogEntry],
    ) -> ReconcileResult<()> {
        let json = serde_json::to_string(account)?;
        let now = chrono::Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO account_profile (session_id, profile_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO UPDATE SET
                profile_json = excluded.profile_json,
                updated_at   = excluded.updated_at",
            params![session_id, json, now],
        )?;
        for entry in events {
            tx.execute(
                "INSERT INTO reconcile_event (session_id, event_type, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entry.session_id, entry.event_type, entry.payload, entry.created_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
