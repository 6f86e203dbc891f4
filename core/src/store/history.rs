//! The address association log and its [`AddressHistory`] view.

use super::PunishmentStore;
use crate::error::EngineResult;
use crate::matching::{AddressHistory, LinkedIdentities};
use crate::punishment::NetworkAddress;
use crate::types::Timestamp;
use rusqlite::params;
use uuid::Uuid;

impl PunishmentStore {
    /// Record that `uuid` was seen connecting from `address` at `time`.
    /// Upsert keyed on the pair; repeats only move the observation time.
    pub fn record_association(
        &self,
        uuid: Uuid,
        address: NetworkAddress,
        time: Timestamp,
    ) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO history (uuid, address, updated) VALUES (?1, ?2, ?3)
             ON CONFLICT (uuid, address) DO UPDATE SET updated = excluded.updated",
            params![uuid, address, time],
        )?;
        Ok(())
    }

    /// The storage-backed history source for applicability checks.
    pub fn address_history(&self) -> StoredAddressHistory<'_> {
        StoredAddressHistory { store: self }
    }
}

/// [`AddressHistory`] answered from the `history` table.
pub struct StoredAddressHistory<'a> {
    store: &'a PunishmentStore,
}

impl AddressHistory for StoredAddressHistory<'_> {
    fn addresses_of(&self, uuid: Uuid) -> EngineResult<Vec<NetworkAddress>> {
        let mut stmt = self
            .store
            .conn
            .prepare("SELECT address FROM history WHERE uuid = ?1")?;
        let addresses = stmt
            .query_map(params![uuid], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(addresses)
    }

    fn linked_identities(&self, uuid: Uuid) -> EngineResult<LinkedIdentities> {
        // Accounts one sharing hop away: anyone who ever used one of this
        // account's addresses.
        let mut stmt = self.store.conn.prepare(
            "SELECT DISTINCT peer.uuid FROM history own
             JOIN history peer ON peer.address = own.address
             WHERE own.uuid = ?1",
        )?;
        let uuids = stmt
            .query_map(params![uuid], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        // Every address those accounts have used, the original's included.
        let mut stmt = self.store.conn.prepare(
            "SELECT DISTINCT linked.address FROM history own
             JOIN history peer ON peer.address = own.address
             JOIN history linked ON linked.uuid = peer.uuid
             WHERE own.uuid = ?1",
        )?;
        let addresses = stmt
            .query_map(params![uuid], |r| r.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LinkedIdentities { uuids, addresses })
    }
}
