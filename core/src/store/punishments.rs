//! Recording, revoking, and point lookups of punishments.
//!
//! Revocation deletes the fact row outright: the tables hold live
//! punishments only, so enforceability never needs an "undone" flag.

use super::{is_unique_violation, PunishmentStore};
use crate::error::EngineResult;
use crate::projection::{punishment_from_simple_row, Projection, RawTable, SimpleView, SIMPLE_COLUMNS};
use crate::punishment::{Punishment, PunishmentDraft, PunishmentType, Victim};
use crate::types::PunishmentId;
use rusqlite::{params, OptionalExtension};

impl PunishmentStore {
    /// Persist a draft, resolving its dimensions and allocating an id.
    ///
    /// `Ok(None)` means a singular type (ban, mute) already has an active
    /// punishment for this victim. The allocated id is abandoned in that
    /// case; sequences hand out unique values, not dense ones.
    pub fn record_punishment(&self, draft: &PunishmentDraft) -> EngineResult<Option<Punishment>> {
        let table = RawTable.table(draft.kind)?;
        let victim_id = self.victim_id(&draft.victim)?;
        let scope_id = self.scope_id(&draft.scope)?;
        let track_id = match &draft.track {
            Some(track) => Some(self.track_id(track)?),
            None => None,
        };
        let id = self.punishment_sequence(draft.kind)?.next(&self.conn)?;
        let sql = format!(
            "INSERT INTO {table} (id, victim_id, operator, reason, scope_id, track_id, start, \"end\")
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        );
        let inserted = self.conn.execute(
            &sql,
            params![
                id,
                victim_id,
                draft.operator.stored_uuid(),
                draft.reason,
                scope_id,
                track_id,
                draft.start,
                draft.end,
            ],
        );
        match inserted {
            Ok(_) => {
                log::debug!("recorded {} #{id}", draft.kind);
                Ok(Some(draft.clone().with_id(id)))
            }
            Err(err) if draft.kind.is_singular() && is_unique_violation(&err) => {
                log::debug!("victim already has an active {}", draft.kind);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Delete one punishment by id. `Ok(false)` when no such row.
    pub fn revoke_by_id(&self, kind: PunishmentType, id: PunishmentId) -> EngineResult<bool> {
        let table = RawTable.table(kind)?;
        let sql = format!("DELETE FROM {table} WHERE id = ?1");
        Ok(self.conn.execute(&sql, params![id])? > 0)
    }

    /// Delete every punishment of `kind` against exactly this victim.
    ///
    /// Matches by dimension identity, not by the matching engine: revoking
    /// a player ban does not touch a composite ban on the same player.
    pub fn revoke_by_type_and_victim(
        &self,
        kind: PunishmentType,
        victim: &Victim,
    ) -> EngineResult<bool> {
        let table = RawTable.table(kind)?;
        let Some(victim_id) = self.existing_victim_id(victim)? else {
            return Ok(false);
        };
        let sql = format!("DELETE FROM {table} WHERE victim_id = ?1");
        Ok(self.conn.execute(&sql, params![victim_id])? > 0)
    }

    /// Point lookup within one punishment type. `Ok(None)` when absent.
    pub fn punishment_by_id_and_type(
        &self,
        id: PunishmentId,
        kind: PunishmentType,
    ) -> EngineResult<Option<Punishment>> {
        let view = SimpleView.table(kind)?;
        let sql = format!(
            "SELECT {} FROM {view} WHERE id = ?1",
            SIMPLE_COLUMNS.join(", ")
        );
        let row = self
            .conn
            .query_row(&sql, params![id], |r| punishment_from_simple_row(kind, r))
            .optional()?;
        Ok(row)
    }

    /// Point lookup across all stored types. Ids are allocated per type, so
    /// the same number can name several punishments; the first stored type
    /// that has it wins (ban, then mute, then warn).
    pub fn punishment_by_id(&self, id: PunishmentId) -> EngineResult<Option<Punishment>> {
        for kind in PunishmentType::STORED {
            if let Some(punishment) = self.punishment_by_id_and_type(id, kind)? {
                return Ok(Some(punishment));
            }
        }
        Ok(None)
    }
}
