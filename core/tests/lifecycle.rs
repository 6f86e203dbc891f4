//! Record, enforce, look up, revoke.
//!
//! Applicability checks go through the enforceable views, which judge
//! activity against the wall clock, so every punishment here is permanent.
//!
//! Verifies:
//!   - A recorded ban applies to its victim for Ban and not for Mute
//!   - Singular types reject a second punishment on the same victim
//!   - Warns stack freely on one victim
//!   - Revocation by id and by victim, and that victim revocation matches
//!     dimension identity exactly
//!   - Point lookups by id, with and without a known type
//!   - The mute cache is consulted before storage and can be invalidated
//!   - Kick is rejected as unsupported, not silently empty

use uuid::Uuid;
use verdict_core::cache::{MemoryMuteCache, MuteCache};
use verdict_core::error::EngineError;
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

fn draft(kind: PunishmentType, victim: Victim) -> PunishmentDraft {
    PunishmentDraft {
        kind,
        victim,
        operator: Operator::Console,
        reason: "test".to_string(),
        scope: Scope::Global,
        track: None,
        start: 1_000_000,
        end: PERMANENT_END,
    }
}

fn record(store: &PunishmentStore, kind: PunishmentType, victim: Victim) -> Punishment {
    store
        .record_punishment(&draft(kind, victim))
        .unwrap()
        .expect("fresh victim must accept the punishment")
}

fn applicable(
    store: &PunishmentStore,
    uuid: Uuid,
    address: NetworkAddress,
    kind: PunishmentType,
) -> Vec<Punishment> {
    let history = store.address_history();
    store
        .applicable_to(uuid, address, kind, AddressStrictness::Lenient, &history)
        .unwrap()
}

#[test]
fn recorded_ban_applies_to_its_victim() {
    let store = store();
    let uuid = Uuid::new_v4();
    let address = addr("10.0.0.1");
    let ban = record(&store, PunishmentType::Ban, Victim::Player { uuid });

    let bans = applicable(&store, uuid, address, PunishmentType::Ban);
    assert_eq!(bans.len(), 1);
    assert_eq!(bans[0].id, ban.id);
    assert_eq!(bans[0].victim, Victim::Player { uuid });

    assert!(
        applicable(&store, uuid, address, PunishmentType::Mute).is_empty(),
        "a ban must not surface as a mute"
    );
    assert!(
        applicable(&store, Uuid::new_v4(), address, PunishmentType::Ban).is_empty(),
        "an unrelated identity must not be banned"
    );
}

#[test]
fn singular_types_reject_a_second_punishment() {
    let store = store();
    let victim = Victim::Player { uuid: Uuid::new_v4() };
    record(&store, PunishmentType::Ban, victim.clone());

    let second = store.record_punishment(&draft(PunishmentType::Ban, victim)).unwrap();
    assert!(second.is_none(), "a second ban on the same victim must be refused");
}

#[test]
fn warns_stack_on_one_victim() {
    let store = store();
    let victim = Victim::Player { uuid: Uuid::new_v4() };
    let first = record(&store, PunishmentType::Warn, victim.clone());
    let second = record(&store, PunishmentType::Warn, victim);
    assert_ne!(first.id, second.id);
}

#[test]
fn revoke_by_id_deletes_exactly_one_row() {
    let store = store();
    let uuid = Uuid::new_v4();
    let ban = record(&store, PunishmentType::Ban, Victim::Player { uuid });

    assert!(store.revoke_by_id(PunishmentType::Ban, ban.id).unwrap());
    assert!(store
        .punishment_by_id_and_type(ban.id, PunishmentType::Ban)
        .unwrap()
        .is_none());
    assert!(
        !store.revoke_by_id(PunishmentType::Ban, ban.id).unwrap(),
        "revoking twice must report that nothing was deleted"
    );
    assert!(applicable(&store, uuid, addr("10.0.0.1"), PunishmentType::Ban).is_empty());
}

#[test]
fn revoking_a_victim_frees_them_for_a_new_punishment() {
    let store = store();
    let victim = Victim::Player { uuid: Uuid::new_v4() };
    record(&store, PunishmentType::Ban, victim.clone());

    assert!(store
        .revoke_by_type_and_victim(PunishmentType::Ban, &victim)
        .unwrap());
    let again = store.record_punishment(&draft(PunishmentType::Ban, victim)).unwrap();
    assert!(again.is_some(), "the victim slot must be free after revocation");
}

#[test]
fn victim_revocation_matches_dimension_identity_exactly() {
    let store = store();
    let uuid = Uuid::new_v4();
    let composite = Victim::Composite { uuid, address: addr("10.0.0.1") };
    let ban = record(&store, PunishmentType::Ban, composite);

    assert!(
        !store
            .revoke_by_type_and_victim(PunishmentType::Ban, &Victim::Player { uuid })
            .unwrap(),
        "a player victim must not reach a composite ban on the same uuid"
    );
    assert!(store
        .punishment_by_id_and_type(ban.id, PunishmentType::Ban)
        .unwrap()
        .is_some());
}

#[test]
fn point_lookup_probes_stored_types_in_order() {
    let store = store();
    store.set_punishment_sequence(PunishmentType::Warn, 99).unwrap();
    let warn = record(&store, PunishmentType::Warn, Victim::Player { uuid: Uuid::new_v4() });
    assert_eq!(warn.id, 100);

    let found = store.punishment_by_id(warn.id).unwrap().expect("warn must be found");
    assert_eq!(found.kind, PunishmentType::Warn);
    assert_eq!(found.reason, "test");
    assert!(store.punishment_by_id(12345).unwrap().is_none());

    assert!(store
        .punishment_by_id_and_type(warn.id, PunishmentType::Ban)
        .unwrap()
        .is_none());
}

#[test]
fn cached_mute_consults_the_cache_before_storage() {
    let store = store();
    let uuid = Uuid::new_v4();
    let address = addr("10.0.0.1");
    let history = store.address_history();
    let cache = MemoryMuteCache::new();
    let mute = record(&store, PunishmentType::Mute, Victim::Player { uuid });

    let looked_up = store
        .cached_mute(uuid, address, AddressStrictness::Lenient, &history, &cache)
        .unwrap()
        .expect("the recorded mute must be found");
    assert_eq!(looked_up.id, mute.id);

    // The row is gone, but the cache still answers: proof the lookup never
    // reached storage.
    assert!(store.revoke_by_id(PunishmentType::Mute, mute.id).unwrap());
    let from_cache = store
        .cached_mute(uuid, address, AddressStrictness::Lenient, &history, &cache)
        .unwrap();
    assert_eq!(from_cache.map(|p| p.id), Some(mute.id));

    cache.invalidate(uuid, address);
    let after_invalidate = store
        .cached_mute(uuid, address, AddressStrictness::Lenient, &history, &cache)
        .unwrap();
    assert!(after_invalidate.is_none(), "invalidation must force a fresh lookup");
}

#[test]
fn cached_absence_is_also_a_hit() {
    let store = store();
    let uuid = Uuid::new_v4();
    let address = addr("10.0.0.1");
    let history = store.address_history();
    let cache = MemoryMuteCache::new();

    assert!(store
        .cached_mute(uuid, address, AddressStrictness::Lenient, &history, &cache)
        .unwrap()
        .is_none());

    // A mute recorded behind the cache's back stays invisible until the
    // entry is dropped.
    let mute = record(&store, PunishmentType::Mute, Victim::Player { uuid });
    assert!(store
        .cached_mute(uuid, address, AddressStrictness::Lenient, &history, &cache)
        .unwrap()
        .is_none());

    cache.invalidate(uuid, address);
    let found = store
        .cached_mute(uuid, address, AddressStrictness::Lenient, &history, &cache)
        .unwrap();
    assert_eq!(found.map(|p| p.id), Some(mute.id));
}

#[test]
fn kick_is_unsupported_not_silently_empty() {
    let store = store();
    let uuid = Uuid::new_v4();
    let address = addr("10.0.0.1");
    let history = store.address_history();

    let recorded = store.record_punishment(&draft(PunishmentType::Kick, Victim::Player { uuid }));
    assert!(matches!(recorded, Err(EngineError::Unsupported(_))));

    let checked = store.applicable_to(
        uuid,
        address,
        PunishmentType::Kick,
        AddressStrictness::Lenient,
        &history,
    );
    assert!(matches!(checked, Err(EngineError::Unsupported(_))));

    let revoked = store.revoke_by_id(PunishmentType::Kick, 1);
    assert!(matches!(revoked, Err(EngineError::Unsupported(_))));

    // Contrast: a stored type with no rows answers cleanly.
    assert!(applicable(&store, uuid, address, PunishmentType::Ban).is_empty());
}
