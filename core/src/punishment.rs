//! The punishment domain model: victims, operators, scopes, tracks.
//!
//! RULES:
//!   - Victims compare by structural value, never by identity.
//!   - The unused half of a non-composite victim holds the empty sentinel
//!     (nil UUID / zero IPv4 address), never SQL NULL.
//!   - `Ban` and `Mute` are singular per victim; `Warn` and `Kick` are not.
//!   - `Kick` has no fact table: a kick exists only in the moment.

use crate::types::{PunishmentId, Timestamp};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use uuid::Uuid;

/// Reserved maximum instant: a punishment with this end never expires.
pub const PERMANENT_END: Timestamp = i64::MAX;

/// Sentinel for the UUID half a victim does not use. For composite victims
/// the same value reads as a wildcard ("any UUID matches").
pub const EMPTY_UUID: Uuid = Uuid::nil();
pub const WILDCARD_UUID: Uuid = EMPTY_UUID;

/// An IP endpoint a punishment can target. Persisted as a 4- or 16-byte blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkAddress(pub IpAddr);

/// Sentinel for the address half a victim does not use. For composite
/// victims the same value reads as a wildcard ("any address matches").
pub const EMPTY_ADDRESS: NetworkAddress = NetworkAddress(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
pub const WILDCARD_ADDRESS: NetworkAddress = EMPTY_ADDRESS;

impl NetworkAddress {
    pub fn to_bytes(self) -> Vec<u8> {
        match self.0 {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(bytes);
                Some(NetworkAddress(IpAddr::V4(Ipv4Addr::from(octets))))
            }
            16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(bytes);
                Some(NetworkAddress(IpAddr::V6(Ipv6Addr::from(octets))))
            }
            _ => None,
        }
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for NetworkAddress {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_bytes()))
    }
}

impl FromSql for NetworkAddress {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let blob = value.as_blob()?;
        NetworkAddress::from_bytes(blob).ok_or(FromSqlError::InvalidBlobSize {
            expected_size: 4,
            blob_size: blob.len(),
        })
    }
}

/// Punishment categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunishmentType {
    Ban,
    Mute,
    Warn,
    Kick,
}

impl PunishmentType {
    pub const ALL: [PunishmentType; 4] = [
        PunishmentType::Ban,
        PunishmentType::Mute,
        PunishmentType::Warn,
        PunishmentType::Kick,
    ];

    /// Types persisted in fact tables, i.e. everything but `Kick`.
    pub const STORED: [PunishmentType; 3] =
        [PunishmentType::Ban, PunishmentType::Mute, PunishmentType::Warn];

    /// At most one active instance per victim is meaningful.
    pub fn is_singular(self) -> bool {
        matches!(self, PunishmentType::Ban | PunishmentType::Mute)
    }

    pub fn as_tag(self) -> i64 {
        match self {
            PunishmentType::Ban => 0,
            PunishmentType::Mute => 1,
            PunishmentType::Warn => 2,
            PunishmentType::Kick => 3,
        }
    }

    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(PunishmentType::Ban),
            1 => Some(PunishmentType::Mute),
            2 => Some(PunishmentType::Warn),
            3 => Some(PunishmentType::Kick),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PunishmentType::Ban => "ban",
            PunishmentType::Mute => "mute",
            PunishmentType::Warn => "warn",
            PunishmentType::Kick => "kick",
        }
    }
}

impl fmt::Display for PunishmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Victim-type discriminant persisted in the victims dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictimKind {
    Player,
    Address,
    Composite,
}

impl VictimKind {
    pub fn as_tag(self) -> i64 {
        match self {
            VictimKind::Player => 0,
            VictimKind::Address => 1,
            VictimKind::Composite => 2,
        }
    }

    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(VictimKind::Player),
            1 => Some(VictimKind::Address),
            2 => Some(VictimKind::Composite),
            _ => None,
        }
    }
}

/// The party a punishment targets.
///
/// A composite victim may carry [`WILDCARD_UUID`] or [`WILDCARD_ADDRESS`]
/// in either half, meaning "any value matches this half".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Victim {
    Player { uuid: Uuid },
    Address { address: NetworkAddress },
    Composite { uuid: Uuid, address: NetworkAddress },
}

impl Victim {
    pub fn kind(self) -> VictimKind {
        match self {
            Victim::Player { .. } => VictimKind::Player,
            Victim::Address { .. } => VictimKind::Address,
            Victim::Composite { .. } => VictimKind::Composite,
        }
    }

    /// The UUID half as persisted: the empty sentinel for address victims.
    pub fn uuid_half(self) -> Uuid {
        match self {
            Victim::Player { uuid } | Victim::Composite { uuid, .. } => uuid,
            Victim::Address { .. } => EMPTY_UUID,
        }
    }

    /// The address half as persisted: the empty sentinel for player victims.
    pub fn address_half(self) -> NetworkAddress {
        match self {
            Victim::Address { address } | Victim::Composite { address, .. } => address,
            Victim::Player { .. } => EMPTY_ADDRESS,
        }
    }

    /// Rebuild a victim from its persisted parts.
    ///
    /// The empty sentinel must only appear in the half the victim type does
    /// not use; anything else is a write-path bug upstream.
    pub fn from_parts(kind: VictimKind, uuid: Uuid, address: NetworkAddress) -> Victim {
        match kind {
            VictimKind::Player => {
                debug_assert!(
                    address == EMPTY_ADDRESS,
                    "player victim carries a non-empty address"
                );
                Victim::Player { uuid }
            }
            VictimKind::Address => {
                debug_assert!(uuid == EMPTY_UUID, "address victim carries a non-empty uuid");
                Victim::Address { address }
            }
            VictimKind::Composite => Victim::Composite { uuid, address },
        }
    }
}

/// The party that issued a punishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operator {
    Console,
    Player { uuid: Uuid },
}

impl Operator {
    /// The operator column value: the console persists as the nil UUID.
    pub fn stored_uuid(self) -> Uuid {
        match self {
            Operator::Console => Uuid::nil(),
            Operator::Player { uuid } => uuid,
        }
    }

    pub fn from_stored(uuid: Uuid) -> Operator {
        if uuid.is_nil() {
            Operator::Console
        } else {
            Operator::Player { uuid }
        }
    }
}

/// Applicability breadth of a punishment.
///
/// `Global` never has a dimension row; fact rows store NULL for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Global,
    Server { name: String },
    Category { name: String },
}

impl Scope {
    pub fn type_tag(&self) -> Option<i64> {
        match self {
            Scope::Global => None,
            Scope::Server { .. } => Some(1),
            Scope::Category { .. } => Some(2),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::Server { name } | Scope::Category { name } => Some(name),
        }
    }

    pub fn from_parts(type_tag: Option<i64>, value: Option<String>) -> Option<Scope> {
        match (type_tag, value) {
            (None, _) => Some(Scope::Global),
            (Some(1), Some(name)) => Some(Scope::Server { name }),
            (Some(2), Some(name)) => Some(Scope::Category { name }),
            _ => None,
        }
    }
}

/// A named escalation ladder a punishment can belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EscalationTrack {
    pub namespace: String,
    pub value: String,
}

/// A persisted punishment. Immutable once read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Punishment {
    pub id: PunishmentId,
    pub kind: PunishmentType,
    pub victim: Victim,
    pub operator: Operator,
    pub reason: String,
    pub scope: Scope,
    pub track: Option<EscalationTrack>,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Punishment {
    pub fn is_permanent(&self) -> bool {
        self.end == PERMANENT_END
    }

    /// Not yet expired at `now`. Revoked punishments are deleted outright,
    /// so presence in storage already implies "not undone".
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.end == PERMANENT_END || self.end > now
    }
}

/// A punishment that has not been persisted yet, so it has no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunishmentDraft {
    pub kind: PunishmentType,
    pub victim: Victim,
    pub operator: Operator,
    pub reason: String,
    pub scope: Scope,
    pub track: Option<EscalationTrack>,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl PunishmentDraft {
    pub fn with_id(self, id: PunishmentId) -> Punishment {
        Punishment {
            id,
            kind: self.kind,
            victim: self.victim,
            operator: self.operator,
            reason: self.reason,
            scope: self.scope,
            track: self.track,
            start: self.start,
            end: self.end,
        }
    }
}
