//! Get-or-create resolution of natural values to dimension ids.
//!
//! The resolver is deliberately not transactional: each table carries a
//! UNIQUE constraint on its natural value, so an insert that loses a race
//! fails with a constraint violation and the loop retries the select. The
//! retry budget is explicit; spending it means the database is feeding us
//! contradictory answers.

use super::{is_unique_violation, PunishmentStore};
use crate::error::{EngineError, EngineResult};
use crate::punishment::{EscalationTrack, Scope, Victim};
use crate::types::DimensionId;
use rusqlite::{params, OptionalExtension};

impl PunishmentStore {
    /// Dimension id for this victim, creating the row if needed.
    pub fn victim_id(&self, victim: &Victim) -> EngineResult<DimensionId> {
        let kind = victim.kind().as_tag();
        let uuid = victim.uuid_half();
        let address = victim.address_half();
        for _ in 0..self.retry_attempts {
            if let Some(id) = self.existing_victim_id(victim)? {
                return Ok(id);
            }
            let id = self.victim_ids.next(&self.conn)?;
            match self.conn.execute(
                "INSERT INTO victims (id, type, uuid, address) VALUES (?1, ?2, ?3, ?4)",
                params![id, kind, uuid, address],
            ) {
                Ok(_) => return Ok(id),
                Err(err) if is_unique_violation(&err) => {
                    log::debug!("lost a victims insert race, retrying the select");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(EngineError::DimensionRaceExhausted {
            table: "victims",
            attempts: self.retry_attempts,
        })
    }

    /// Select-only half of [`PunishmentStore::victim_id`].
    pub(crate) fn existing_victim_id(&self, victim: &Victim) -> EngineResult<Option<DimensionId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM victims WHERE type = ?1 AND uuid = ?2 AND address = ?3",
                params![victim.kind().as_tag(), victim.uuid_half(), victim.address_half()],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Dimension id for this scope, creating the row if needed.
    /// The global scope has no row; fact tables store NULL for it.
    pub fn scope_id(&self, scope: &Scope) -> EngineResult<Option<DimensionId>> {
        let (type_tag, value) = match (scope.type_tag(), scope.value()) {
            (Some(tag), Some(value)) => (tag, value),
            _ => return Ok(None),
        };
        for _ in 0..self.retry_attempts {
            let existing: Option<DimensionId> = self
                .conn
                .query_row(
                    "SELECT id FROM scopes WHERE type = ?1 AND value = ?2",
                    params![type_tag, value],
                    |r| r.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                return Ok(Some(id));
            }
            let id = self.scope_ids.next(&self.conn)?;
            match self.conn.execute(
                "INSERT INTO scopes (id, type, value) VALUES (?1, ?2, ?3)",
                params![id, type_tag, value],
            ) {
                Ok(_) => return Ok(Some(id)),
                Err(err) if is_unique_violation(&err) => {
                    log::debug!("lost a scopes insert race, retrying the select");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(EngineError::DimensionRaceExhausted {
            table: "scopes",
            attempts: self.retry_attempts,
        })
    }

    /// Dimension id for this escalation track, creating the row if needed.
    pub fn track_id(&self, track: &EscalationTrack) -> EngineResult<DimensionId> {
        for _ in 0..self.retry_attempts {
            let existing: Option<DimensionId> = self
                .conn
                .query_row(
                    "SELECT id FROM tracks WHERE namespace = ?1 AND value = ?2",
                    params![track.namespace, track.value],
                    |r| r.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                return Ok(id);
            }
            let id = self.track_ids.next(&self.conn)?;
            match self.conn.execute(
                "INSERT INTO tracks (id, namespace, value) VALUES (?1, ?2, ?3)",
                params![id, track.namespace, track.value],
            ) {
                Ok(_) => return Ok(id),
                Err(err) if is_unique_violation(&err) => {
                    log::debug!("lost a tracks insert race, retrying the select");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(EngineError::DimensionRaceExhausted {
            table: "tracks",
            attempts: self.retry_attempts,
        })
    }
}
