//! The three schema projections of a punishment record.
//!
//! Raw is the per-type fact table (dimension ids, no victim columns).
//! Simple denormalizes one row per punishment with the victim, scope and
//! track resolved. Applicable further restricts Simple to enforceable rows
//! and pairs each one with a known identity it concerns.
//!
//! `Kick` exists in no projection. Asking for a kick table is a programming
//! error ([`EngineError::Unsupported`]), distinct from an empty result.

use crate::error::{EngineError, EngineResult};
use crate::matching::VictimColumns;
use crate::punishment::{
    EscalationTrack, NetworkAddress, Operator, Punishment, PunishmentType, Scope, Victim,
    VictimKind,
};
use rusqlite::Row;
use uuid::Uuid;

/// One way of reading punishment rows: a table or view per stored
/// punishment type, with a fixed column list.
pub trait Projection {
    /// The table or view carrying this projection for `kind`.
    fn table(&self, kind: PunishmentType) -> EngineResult<&'static str>;

    /// Columns in their fixed order, quoted where needed.
    fn columns(&self) -> &'static [&'static str];
}

/// The fact tables themselves. Victim/scope/track are dimension ids here;
/// the punishment type is implied by the table, never a column.
#[derive(Debug, Clone, Copy)]
pub struct RawTable;

/// Denormalized one-row-per-punishment views.
#[derive(Debug, Clone, Copy)]
pub struct SimpleView;

/// Simple restricted to enforceable rows, joined against the address
/// association log so each row also carries a resolved uuid/address pair
/// the punishment concerns.
#[derive(Debug, Clone, Copy)]
pub struct ApplicableView;

pub const RAW_COLUMNS: &[&str] = &[
    "id",
    "victim_id",
    "operator",
    "reason",
    "scope_id",
    "track_id",
    "start",
    "\"end\"",
];

pub const SIMPLE_COLUMNS: &[&str] = &[
    "id",
    "victim_type",
    "victim_uuid",
    "victim_address",
    "operator",
    "reason",
    "scope_type",
    "scope_value",
    "track_namespace",
    "track_value",
    "start",
    "\"end\"",
];

pub const APPLICABLE_COLUMNS: &[&str] = &[
    "id",
    "victim_type",
    "victim_uuid",
    "victim_address",
    "operator",
    "reason",
    "scope_type",
    "scope_value",
    "track_namespace",
    "track_value",
    "start",
    "\"end\"",
    "uuid",
    "address",
];

/// Victim columns as named in the simple/applicable views.
pub const VIEW_VICTIM_COLUMNS: VictimColumns = VictimColumns {
    kind: "victim_type",
    uuid: "victim_uuid",
    address: "victim_address",
};

/// Victim columns as named in the victims dimension table.
pub const DIMENSION_VICTIM_COLUMNS: VictimColumns = VictimColumns {
    kind: "type",
    uuid: "uuid",
    address: "address",
};

const NO_KICK_TABLE: &str = "kicks are never persisted and have no table or view";

impl Projection for RawTable {
    fn table(&self, kind: PunishmentType) -> EngineResult<&'static str> {
        match kind {
            PunishmentType::Ban => Ok("bans"),
            PunishmentType::Mute => Ok("mutes"),
            PunishmentType::Warn => Ok("warns"),
            PunishmentType::Kick => Err(EngineError::Unsupported(NO_KICK_TABLE)),
        }
    }

    fn columns(&self) -> &'static [&'static str] {
        RAW_COLUMNS
    }
}

impl Projection for SimpleView {
    fn table(&self, kind: PunishmentType) -> EngineResult<&'static str> {
        match kind {
            PunishmentType::Ban => Ok("simple_bans"),
            PunishmentType::Mute => Ok("simple_mutes"),
            PunishmentType::Warn => Ok("simple_warns"),
            PunishmentType::Kick => Err(EngineError::Unsupported(NO_KICK_TABLE)),
        }
    }

    fn columns(&self) -> &'static [&'static str] {
        SIMPLE_COLUMNS
    }
}

impl Projection for ApplicableView {
    fn table(&self, kind: PunishmentType) -> EngineResult<&'static str> {
        match kind {
            PunishmentType::Ban => Ok("applicable_bans"),
            PunishmentType::Mute => Ok("applicable_mutes"),
            PunishmentType::Warn => Ok("applicable_warns"),
            PunishmentType::Kick => Err(EngineError::Unsupported(NO_KICK_TABLE)),
        }
    }

    fn columns(&self) -> &'static [&'static str] {
        APPLICABLE_COLUMNS
    }
}

fn bad_tag(index: usize, tag: i64) -> rusqlite::Error {
    rusqlite::Error::IntegralValueOutOfRange(index, tag)
}

/// Map a row laid out in [`SIMPLE_COLUMNS`] order back into a [`Punishment`].
///
/// Works for any query selecting those twelve columns first, whatever else
/// follows them.
pub(crate) fn punishment_from_simple_row(
    kind: PunishmentType,
    row: &Row<'_>,
) -> rusqlite::Result<Punishment> {
    let victim_tag: i64 = row.get(1)?;
    let victim_kind = VictimKind::from_tag(victim_tag).ok_or_else(|| bad_tag(1, victim_tag))?;
    let victim_uuid: Uuid = row.get(2)?;
    let victim_address: NetworkAddress = row.get(3)?;
    let victim = Victim::from_parts(victim_kind, victim_uuid, victim_address);

    let scope_type: Option<i64> = row.get(6)?;
    let scope_value: Option<String> = row.get(7)?;
    let scope = Scope::from_parts(scope_type, scope_value)
        .ok_or_else(|| bad_tag(6, scope_type.unwrap_or_default()))?;

    let track_namespace: Option<String> = row.get(8)?;
    let track_value: Option<String> = row.get(9)?;
    let track = match (track_namespace, track_value) {
        (Some(namespace), Some(value)) => Some(EscalationTrack { namespace, value }),
        (None, None) => None,
        _ => return Err(bad_tag(8, 0)),
    };

    Ok(Punishment {
        id: row.get(0)?,
        kind,
        victim,
        operator: Operator::from_stored(row.get(4)?),
        reason: row.get(5)?,
        scope,
        track,
        start: row.get(10)?,
        end: row.get(11)?,
    })
}
