//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Callers go through store methods; they never execute SQL directly.

mod dimensions;
mod history;
mod punishments;
mod selector;

pub use history::StoredAddressHistory;

use crate::config::DEFAULT_DIMENSION_RETRY_ATTEMPTS;
use crate::error::{EngineError, EngineResult};
use crate::punishment::PunishmentType;
use crate::sequence::{
    Sequence, BAN_IDS, MUTE_IDS, SCOPE_IDS, TRACK_IDS, VICTIM_IDS, WARN_IDS,
};
use crate::types::PunishmentId;
use rusqlite::Connection;

pub struct PunishmentStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
    retry_attempts: u32,
    victim_ids: Sequence,
    scope_ids: Sequence,
    track_ids: Sequence,
    ban_ids: Sequence,
    mute_ids: Sequence,
    warn_ids: Sequence,
}

impl PunishmentStore {
    fn from_connection(conn: Connection, path: Option<String>) -> Self {
        Self {
            conn,
            path,
            retry_attempts: DEFAULT_DIMENSION_RETRY_ATTEMPTS,
            victim_ids: Sequence::new(VICTIM_IDS),
            scope_ids: Sequence::new(SCOPE_IDS),
            track_ids: Sequence::new(TRACK_IDS),
            ban_ids: Sequence::new(BAN_IDS),
            mute_ids: Sequence::new(MUTE_IDS),
            warn_ids: Sequence::new(WARN_IDS),
        }
    }

    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self::from_connection(conn, Some(path.to_string())))
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self::from_connection(conn, None))
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> EngineResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EngineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_schema.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_history.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_views.sql"))?;
        Ok(())
    }

    /// Retry budget for the dimension get-or-create race. Clamped to at
    /// least one attempt.
    pub fn set_dimension_retry_attempts(&mut self, attempts: u32) {
        self.retry_attempts = attempts.max(1);
    }

    fn punishment_sequence(&self, kind: PunishmentType) -> EngineResult<&Sequence> {
        match kind {
            PunishmentType::Ban => Ok(&self.ban_ids),
            PunishmentType::Mute => Ok(&self.mute_ids),
            PunishmentType::Warn => Ok(&self.warn_ids),
            PunishmentType::Kick => Err(EngineError::Unsupported(
                "kicks are never persisted and have no id sequence",
            )),
        }
    }

    /// The last punishment id this handle allocated for `kind`, if any.
    /// Other handles bumping the same sequence are not visible here.
    pub fn current_id_in_session(&self, kind: PunishmentType) -> EngineResult<Option<PunishmentId>> {
        Ok(self.punishment_sequence(kind)?.current_in_session())
    }

    /// Force a fact-table sequence so the next insert takes `value + 1`.
    pub fn set_punishment_sequence(&self, kind: PunishmentType, value: i64) -> EngineResult<()> {
        self.punishment_sequence(kind)?.set(&self.conn, value)
    }
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
