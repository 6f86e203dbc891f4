//! Address strictness applicability.
//!
//! Fixture: account A connected from addr1 and addr2; account B shares
//! addr2 and also connected from addr3. Three permanent bans exist: on
//! addr2, on addr3, and on account B itself. Account A then connects from
//! addr1.
//!
//! Verifies:
//!   - Lenient sees none of them (neither addr1 nor A is banned directly)
//!   - Normal adds the addr2 ban (A's own address history)
//!   - Stern adds the addr3 ban (one sharing hop away)
//!   - Strict adds the user ban on B (linked account)
//!   - Each level matches a superset of the one below
//!   - The current address counts even with an empty history

use uuid::Uuid;
use verdict_core::matching::AddressStrictness;
use verdict_core::punishment::{
    NetworkAddress, Operator, Punishment, PunishmentDraft, PunishmentType, Scope, Victim,
    PERMANENT_END,
};
use verdict_core::store::PunishmentStore;

fn store() -> PunishmentStore {
    let store = PunishmentStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn addr(raw: &str) -> NetworkAddress {
    NetworkAddress(raw.parse().unwrap())
}

fn ban(store: &PunishmentStore, victim: Victim) -> Punishment {
    store
        .record_punishment(&PunishmentDraft {
            kind: PunishmentType::Ban,
            victim,
            operator: Operator::Console,
            reason: "test".to_string(),
            scope: Scope::Global,
            track: None,
            start: 1_000_000,
            end: PERMANENT_END,
        })
        .unwrap()
        .expect("fresh victim must be bannable")
}

struct Fixture {
    store: PunishmentStore,
    uuid_a: Uuid,
    addr1: NetworkAddress,
    own_history_ban: i64,
    linked_address_ban: i64,
    linked_account_ban: i64,
}

fn fixture() -> Fixture {
    let store = store();
    let uuid_a = Uuid::new_v4();
    let uuid_b = Uuid::new_v4();
    let addr1 = addr("10.0.0.1");
    let addr2 = addr("10.0.0.2");
    let addr3 = addr("10.0.0.3");

    store.record_association(uuid_a, addr1, 1_000_000).unwrap();
    store.record_association(uuid_a, addr2, 1_000_100).unwrap();
    store.record_association(uuid_b, addr2, 1_000_200).unwrap();
    store.record_association(uuid_b, addr3, 1_000_300).unwrap();

    let own_history_ban = ban(&store, Victim::Address { address: addr2 }).id;
    let linked_address_ban = ban(&store, Victim::Address { address: addr3 }).id;
    let linked_account_ban = ban(&store, Victim::Player { uuid: uuid_b }).id;

    Fixture {
        store,
        uuid_a,
        addr1,
        own_history_ban,
        linked_address_ban,
        linked_account_ban,
    }
}

fn applicable_ids(fixture: &Fixture, strictness: AddressStrictness) -> Vec<i64> {
    let history = fixture.store.address_history();
    fixture
        .store
        .applicable_to(
            fixture.uuid_a,
            fixture.addr1,
            PunishmentType::Ban,
            strictness,
            &history,
        )
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect()
}

#[test]
fn lenient_sees_only_direct_matches() {
    let fixture = fixture();
    let ids = applicable_ids(&fixture, AddressStrictness::Lenient);
    assert!(ids.is_empty(), "nothing targets addr1 or account A directly, got {ids:?}");
}

#[test]
fn normal_adds_own_address_history() {
    let fixture = fixture();
    let ids = applicable_ids(&fixture, AddressStrictness::Normal);
    assert_eq!(ids, vec![fixture.own_history_ban]);
}

#[test]
fn stern_adds_addresses_one_sharing_hop_away() {
    let fixture = fixture();
    let ids = applicable_ids(&fixture, AddressStrictness::Stern);
    assert_eq!(ids, vec![fixture.own_history_ban, fixture.linked_address_ban]);
}

#[test]
fn strict_adds_user_punishments_on_linked_accounts() {
    let fixture = fixture();
    let ids = applicable_ids(&fixture, AddressStrictness::Strict);
    assert_eq!(
        ids,
        vec![
            fixture.own_history_ban,
            fixture.linked_address_ban,
            fixture.linked_account_ban
        ]
    );
}

#[test]
fn each_level_subsumes_the_one_below() {
    let fixture = fixture();
    let levels = [
        AddressStrictness::Lenient,
        AddressStrictness::Normal,
        AddressStrictness::Stern,
        AddressStrictness::Strict,
    ];
    let mut previous: Vec<i64> = Vec::new();
    for strictness in levels {
        let ids = applicable_ids(&fixture, strictness);
        for id in &previous {
            assert!(
                ids.contains(id),
                "{strictness:?} dropped punishment {id} matched by the level below"
            );
        }
        previous = ids;
    }
}

#[test]
fn current_address_counts_even_with_empty_history() {
    let store = store();
    let address = addr("192.0.2.5");
    let banned = ban(&store, Victim::Address { address }).id;

    let history = store.address_history();
    let ids: Vec<i64> = store
        .applicable_to(
            Uuid::new_v4(),
            address,
            PunishmentType::Ban,
            AddressStrictness::Normal,
            &history,
        )
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![banned], "the connecting address itself is always in the match set");
}
