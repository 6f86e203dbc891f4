//! The victim matching engine.
//!
//! Matching is expressed twice: as plain predicates over in-memory victims,
//! and as [`Cond`] fragments compiled into SQL over victim-type/uuid/address
//! columns. The two must agree; the tests hold them together.
//!
//! Applicability under an [`AddressStrictness`] level is parameterized by an
//! [`AddressHistory`] collaborator. The engine only translates a strictness
//! level plus history sets into a condition; it never computes the history
//! itself.

use crate::error::EngineResult;
use crate::punishment::{
    NetworkAddress, Victim, VictimKind, WILDCARD_ADDRESS, WILDCARD_UUID,
};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A boolean SQL fragment plus its positional parameters.
#[derive(Debug, Clone)]
pub struct Cond {
    sql: String,
    params: Vec<Value>,
}

impl Cond {
    pub fn always_true() -> Cond {
        Cond {
            sql: "1".to_string(),
            params: Vec::new(),
        }
    }

    pub fn always_false() -> Cond {
        Cond {
            sql: "0".to_string(),
            params: Vec::new(),
        }
    }

    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Cond {
        Cond {
            sql: sql.into(),
            params,
        }
    }

    pub fn and(self, other: Cond) -> Cond {
        if self.sql == "1" {
            return other;
        }
        if other.sql == "1" {
            return self;
        }
        Cond {
            sql: format!("({}) AND ({})", self.sql, other.sql),
            params: join_params(self.params, other.params),
        }
    }

    pub fn or(self, other: Cond) -> Cond {
        if self.sql == "0" {
            return other;
        }
        if other.sql == "0" {
            return self;
        }
        Cond {
            sql: format!("({}) OR ({})", self.sql, other.sql),
            params: join_params(self.params, other.params),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

fn join_params(mut left: Vec<Value>, right: Vec<Value>) -> Vec<Value> {
    left.extend(right);
    left
}

pub fn uuid_value(uuid: Uuid) -> Value {
    Value::Blob(uuid.as_bytes().to_vec())
}

pub fn address_value(address: NetworkAddress) -> Value {
    Value::Blob(address.to_bytes())
}

pub fn column_eq(column: &str, value: Value) -> Cond {
    Cond {
        sql: format!("{column} = ?"),
        params: vec![value],
    }
}

/// `column IN (...)`. Empty value lists match nothing; single values
/// collapse to plain equality.
pub fn column_in(column: &str, values: Vec<Value>) -> Cond {
    match values.len() {
        0 => Cond::always_false(),
        1 => column_eq(column, values.into_iter().next().unwrap()),
        n => {
            let placeholders = vec!["?"; n].join(", ");
            Cond {
                sql: format!("{column} IN ({placeholders})"),
                params: values,
            }
        }
    }
}

pub fn column_not_in(column: &str, values: Vec<Value>) -> Cond {
    match values.len() {
        0 => Cond::always_true(),
        n => {
            let placeholders = vec!["?"; n].join(", ");
            Cond {
                sql: format!("{column} NOT IN ({placeholders})"),
                params: values,
            }
        }
    }
}

/// Names of the victim-type/uuid/address columns in whatever table or view a
/// condition is being compiled against.
#[derive(Debug, Clone, Copy)]
pub struct VictimColumns {
    pub kind: &'static str,
    pub uuid: &'static str,
    pub address: &'static str,
}

// ── Exact value matching ──────────────────────────────────────────

/// Does `stored` match `candidate` exactly? Composite candidates treat a
/// wildcard half as "don't care".
pub fn matches_value(candidate: &Victim, stored: &Victim) -> bool {
    if candidate.kind() != stored.kind() {
        return false;
    }
    match *candidate {
        Victim::Player { uuid } => uuid == stored.uuid_half(),
        Victim::Address { address } => address == stored.address_half(),
        Victim::Composite { uuid, address } => {
            (uuid == WILDCARD_UUID || uuid == stored.uuid_half())
                && (address == WILDCARD_ADDRESS || address == stored.address_half())
        }
    }
}

/// SQL form of [`matches_value`], with `candidate` on the query side.
pub fn victim_equals(cols: VictimColumns, candidate: &Victim) -> Cond {
    let kind_cond = column_eq(cols.kind, Value::Integer(candidate.kind().as_tag()));
    match *candidate {
        Victim::Player { uuid } => kind_cond.and(column_eq(cols.uuid, uuid_value(uuid))),
        Victim::Address { address } => {
            kind_cond.and(column_eq(cols.address, address_value(address)))
        }
        Victim::Composite { uuid, address } => {
            let mut cond = kind_cond;
            if uuid != WILDCARD_UUID {
                cond = cond.and(column_eq(cols.uuid, uuid_value(uuid)));
            }
            if address != WILDCARD_ADDRESS {
                cond = cond.and(column_eq(cols.address, address_value(address)));
            }
            cond
        }
    }
}

// ── Simple matching ───────────────────────────────────────────────

/// Does this stored victim concern the connecting identity at all,
/// independent of any strictness policy?
pub fn simply_matches(stored: &Victim, uuid: Uuid, address: NetworkAddress) -> bool {
    match *stored {
        Victim::Player { uuid: stored_uuid } => stored_uuid == uuid,
        Victim::Address {
            address: stored_address,
        } => stored_address == address,
        Victim::Composite {
            uuid: stored_uuid,
            address: stored_address,
        } => stored_uuid == uuid || stored_address == address,
    }
}

/// SQL form of [`simply_matches`].
pub fn victim_simply_matches(cols: VictimColumns, uuid: Uuid, address: NetworkAddress) -> Cond {
    let player = column_eq(cols.kind, Value::Integer(VictimKind::Player.as_tag()))
        .and(column_eq(cols.uuid, uuid_value(uuid)));
    let addr = column_eq(cols.kind, Value::Integer(VictimKind::Address.as_tag()))
        .and(column_eq(cols.address, address_value(address)));
    let composite = column_eq(cols.kind, Value::Integer(VictimKind::Composite.as_tag())).and(
        column_eq(cols.uuid, uuid_value(uuid))
            .or(column_eq(cols.address, address_value(address))),
    );
    player.or(addr).or(composite)
}

// ── UUID-only matching ────────────────────────────────────────────

/// Player or Composite rows whose uuid half matches one of `uuids`.
pub fn victim_uuid_in(cols: VictimColumns, uuids: &[Uuid]) -> Cond {
    let kinds = column_in(
        cols.kind,
        vec![
            Value::Integer(VictimKind::Player.as_tag()),
            Value::Integer(VictimKind::Composite.as_tag()),
        ],
    );
    kinds.and(column_in(
        cols.uuid,
        uuids.iter().copied().map(uuid_value).collect(),
    ))
}

/// Address or Composite rows whose address half matches one of `addresses`.
pub fn victim_address_in(cols: VictimColumns, addresses: &[NetworkAddress]) -> Cond {
    let kinds = column_in(
        cols.kind,
        vec![
            Value::Integer(VictimKind::Address.as_tag()),
            Value::Integer(VictimKind::Composite.as_tag()),
        ],
    );
    kinds.and(column_in(
        cols.address,
        addresses.iter().copied().map(address_value).collect(),
    ))
}

// ── Applicability under address strictness ────────────────────────

/// How aggressively stored addresses are held against a connecting identity.
/// Each level matches a superset of the punishments the previous one does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressStrictness {
    /// Stored address must equal the current address (or the uuid matches).
    Lenient,
    /// Stored address may equal any address the player has ever used.
    Normal,
    /// Stored address may equal any address transitively linked through
    /// shared address history.
    Stern,
    /// Stern's closure, and user punishments on linked accounts also match.
    Strict,
}

/// The one-hop linkage closure of an account: every account that ever shared
/// an address with it, and every address those accounts have used.
#[derive(Debug, Clone, Default)]
pub struct LinkedIdentities {
    pub uuids: Vec<Uuid>,
    pub addresses: Vec<NetworkAddress>,
}

/// External collaborator supplying account address history. The engine never
/// records or derives history on its own authority; see
/// `PunishmentStore::record_association` for the storage-backed source.
pub trait AddressHistory {
    /// Every address the account has ever connected from.
    fn addresses_of(&self, uuid: Uuid) -> EngineResult<Vec<NetworkAddress>>;

    /// The one-hop linkage closure described on [`LinkedIdentities`].
    fn linked_identities(&self, uuid: Uuid) -> EngineResult<LinkedIdentities>;
}

/// Compile the applicability rule for one connecting identity.
///
/// The current uuid and address are always part of the match sets, so each
/// level strictly subsumes the one below regardless of what the history
/// source returns.
pub fn applicability_condition(
    cols: VictimColumns,
    uuid: Uuid,
    address: NetworkAddress,
    strictness: AddressStrictness,
    history: &dyn AddressHistory,
) -> EngineResult<Cond> {
    match strictness {
        AddressStrictness::Lenient => Ok(victim_simply_matches(cols, uuid, address)),
        AddressStrictness::Normal => {
            let mut addresses = history.addresses_of(uuid)?;
            push_unique_address(&mut addresses, address);
            Ok(victim_uuid_in(cols, &[uuid]).or(victim_address_in(cols, &addresses)))
        }
        AddressStrictness::Stern => {
            let linked = history.linked_identities(uuid)?;
            let mut addresses = linked.addresses;
            push_unique_address(&mut addresses, address);
            Ok(victim_uuid_in(cols, &[uuid]).or(victim_address_in(cols, &addresses)))
        }
        AddressStrictness::Strict => {
            let linked = history.linked_identities(uuid)?;
            let mut uuids = linked.uuids;
            if !uuids.contains(&uuid) {
                uuids.push(uuid);
            }
            let mut addresses = linked.addresses;
            push_unique_address(&mut addresses, address);
            Ok(victim_uuid_in(cols, &uuids).or(victim_address_in(cols, &addresses)))
        }
    }
}

fn push_unique_address(addresses: &mut Vec<NetworkAddress>, address: NetworkAddress) {
    if !addresses.contains(&address) {
        addresses.push(address);
    }
}
