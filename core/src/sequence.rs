//! Portable unique-id allocation over single-row counter tables.
//!
//! The storage engine has no native sequences, so each sequence is a table
//! `<name>_ids(num)` holding exactly one row: the last value issued.
//! `next()` bumps and reads it in a single statement, so concurrent handles
//! can never observe the same value.

use crate::error::{EngineError, EngineResult};
use rusqlite::{params, Connection};
use std::cell::Cell;

/// Static shape of one counter table: its name and the closed range of
/// values `next()` may hand out.
#[derive(Debug, Clone, Copy)]
pub struct SequenceDef {
    pub table: &'static str,
    pub first: i64,
    pub last: i64,
}

impl SequenceDef {
    /// The counter value a fresh table is seeded with, one below `first`.
    pub fn seed(self) -> i64 {
        self.first - 1
    }
}

/// Fact-table sequences run from 1 with one value of headroom below the
/// representable maximum, so the permanent-end sentinel can never collide
/// with an id.
const FACT_RANGE: (i64, i64) = (1, i64::MAX - 1);

pub const BAN_IDS: SequenceDef = SequenceDef {
    table: "ban_ids",
    first: FACT_RANGE.0,
    last: FACT_RANGE.1,
};

pub const MUTE_IDS: SequenceDef = SequenceDef {
    table: "mute_ids",
    first: FACT_RANGE.0,
    last: FACT_RANGE.1,
};

pub const WARN_IDS: SequenceDef = SequenceDef {
    table: "warn_ids",
    first: FACT_RANGE.0,
    last: FACT_RANGE.1,
};

/// Victim ids span the full signed 32-bit range; the other dimensions get
/// 64-bit ranges like the fact tables.
pub const VICTIM_IDS: SequenceDef = SequenceDef {
    table: "victim_ids",
    first: i32::MIN as i64,
    last: i32::MAX as i64,
};

pub const SCOPE_IDS: SequenceDef = SequenceDef {
    table: "scope_ids",
    first: FACT_RANGE.0,
    last: FACT_RANGE.1,
};

pub const TRACK_IDS: SequenceDef = SequenceDef {
    table: "track_ids",
    first: FACT_RANGE.0,
    last: FACT_RANGE.1,
};

/// A handle on one counter table.
///
/// The last value generated *through this handle* is tracked on the handle
/// itself; other handles bumping the same table do not affect it.
#[derive(Debug)]
pub struct Sequence {
    def: SequenceDef,
    last_generated: Cell<Option<i64>>,
}

impl Sequence {
    pub fn new(def: SequenceDef) -> Self {
        Sequence {
            def,
            last_generated: Cell::new(None),
        }
    }

    pub fn def(&self) -> SequenceDef {
        self.def
    }

    /// Atomically bump the counter and return the new value.
    ///
    /// Exhausting the range is fatal, never a wraparound: the counter is
    /// left past `last` and every subsequent call keeps failing.
    pub fn next(&self, conn: &Connection) -> EngineResult<i64> {
        let sql = format!("UPDATE {} SET num = num + 1 RETURNING num", self.def.table);
        let value: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        if value > self.def.last {
            return Err(EngineError::SequenceExhausted {
                name: self.def.table,
            });
        }
        self.last_generated.set(Some(value));
        Ok(value)
    }

    /// The last value `next()` returned on this handle, if any.
    pub fn current_in_session(&self) -> Option<i64> {
        self.last_generated.get()
    }

    /// Force the counter so that the following `next()` returns `value + 1`.
    pub fn set(&self, conn: &Connection, value: i64) -> EngineResult<()> {
        let sql = format!("UPDATE {} SET num = ?1", self.def.table);
        conn.execute(&sql, params![value])?;
        Ok(())
    }
}
