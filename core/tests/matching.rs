//! Victim matching: the in-memory predicates and the SQL fragments they
//! compile into.
//!
//! Verifies:
//!   - Exact matching honors victim type and both value halves
//!   - Composite candidates treat a wildcard half as "don't care"
//!   - Simple matching concerns player, address, and composite victims
//!   - Condition builders collapse degenerate value lists

use uuid::Uuid;
use verdict_core::matching::{
    column_in, column_not_in, matches_value, simply_matches, uuid_value, victim_equals, Cond,
};
use verdict_core::projection::DIMENSION_VICTIM_COLUMNS;
use verdict_core::punishment::{NetworkAddress, Victim, WILDCARD_ADDRESS, WILDCARD_UUID};

fn addr(raw: &str) -> NetworkAddress {
    NetworkAddress(raw.parse().unwrap())
}

#[test]
fn exact_match_requires_same_type_and_value() {
    let uuid = Uuid::new_v4();
    let player = Victim::Player { uuid };
    assert!(matches_value(&player, &player));
    assert!(!matches_value(&player, &Victim::Player { uuid: Uuid::new_v4() }));
    assert!(
        !matches_value(&player, &Victim::Composite { uuid, address: addr("10.0.0.1") }),
        "a player candidate must not match a composite victim of the same uuid"
    );
}

#[test]
fn composite_wildcard_half_matches_any_value() {
    let address = addr("10.0.0.1");
    let candidate = Victim::Composite { uuid: WILDCARD_UUID, address };
    for _ in 0..3 {
        let stored = Victim::Composite { uuid: Uuid::new_v4(), address };
        assert!(
            matches_value(&candidate, &stored),
            "wildcard uuid half must accept {stored:?}"
        );
    }
    let other_address = Victim::Composite { uuid: Uuid::new_v4(), address: addr("10.0.0.2") };
    assert!(!matches_value(&candidate, &other_address));
}

#[test]
fn double_wildcard_composite_matches_every_composite() {
    let candidate = Victim::Composite { uuid: WILDCARD_UUID, address: WILDCARD_ADDRESS };
    let stored = Victim::Composite { uuid: Uuid::new_v4(), address: addr("192.0.2.7") };
    assert!(matches_value(&candidate, &stored));
    assert!(
        !matches_value(&candidate, &Victim::Player { uuid: Uuid::new_v4() }),
        "wildcards never cross the victim-type boundary"
    );
}

#[test]
fn simple_match_concerns_each_victim_shape() {
    let uuid = Uuid::new_v4();
    let address = addr("203.0.113.9");
    let other_uuid = Uuid::new_v4();
    let other_address = addr("203.0.113.10");

    assert!(simply_matches(&Victim::Player { uuid }, uuid, other_address));
    assert!(!simply_matches(&Victim::Player { uuid }, other_uuid, address));

    assert!(simply_matches(&Victim::Address { address }, other_uuid, address));
    assert!(!simply_matches(&Victim::Address { address }, uuid, other_address));

    let composite = Victim::Composite { uuid, address };
    assert!(simply_matches(&composite, uuid, other_address), "uuid half alone suffices");
    assert!(simply_matches(&composite, other_uuid, address), "address half alone suffices");
    assert!(!simply_matches(&composite, other_uuid, other_address));
}

#[test]
fn column_in_collapses_degenerate_lists() {
    assert_eq!(column_in("uuid", Vec::new()).sql(), "0", "empty IN matches nothing");
    assert_eq!(
        column_in("uuid", vec![uuid_value(Uuid::new_v4())]).sql(),
        "uuid = ?",
        "single-value IN is plain equality"
    );
    assert_eq!(column_not_in("uuid", Vec::new()).sql(), "1", "empty NOT IN excludes nothing");
}

#[test]
fn cond_conjunction_elides_the_trivial_side() {
    let cond = Cond::always_true().and(Cond::raw("uuid = ?", vec![uuid_value(Uuid::new_v4())]));
    assert_eq!(cond.sql(), "uuid = ?");
    let cond = Cond::always_false().or(Cond::raw("uuid = ?", vec![uuid_value(Uuid::new_v4())]));
    assert_eq!(cond.sql(), "uuid = ?");
}

#[test]
fn composite_equality_omits_wildcard_halves() {
    let address = addr("10.0.0.1");
    let full = Victim::Composite { uuid: Uuid::new_v4(), address };
    let sql = victim_equals(DIMENSION_VICTIM_COLUMNS, &full).into_parts().0;
    assert!(sql.contains("uuid"), "both halves expected in {sql}");
    assert!(sql.contains("address"), "both halves expected in {sql}");

    let wildcard_uuid = Victim::Composite { uuid: WILDCARD_UUID, address };
    let sql = victim_equals(DIMENSION_VICTIM_COLUMNS, &wildcard_uuid).into_parts().0;
    assert!(!sql.contains("uuid ="), "wildcard uuid half must be absent from {sql}");
    assert!(sql.contains("address"));
}
