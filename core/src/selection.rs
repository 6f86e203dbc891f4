//! Selection criteria: accept/reject predicates, sorting, pagination.
//!
//! A [`Selection`] is built once through [`SelectionBuilder`], then reused
//! freely; it never holds a storage handle.

use crate::punishment::{EscalationTrack, Operator, PunishmentType, Scope};
use crate::types::{PunishmentId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A criterion over a value domain, defined by an accept set and a reject
/// set. An empty accept set accepts every value; the reject set always
/// subtracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPredicate<U: Ord> {
    accepted: BTreeSet<U>,
    rejected: BTreeSet<U>,
}

impl<U: Ord> SelectionPredicate<U> {
    /// Accepts every value.
    pub fn matching_all() -> Self {
        SelectionPredicate {
            accepted: BTreeSet::new(),
            rejected: BTreeSet::new(),
        }
    }

    /// Accepts exactly one value.
    pub fn matching_only(value: U) -> Self {
        SelectionPredicate {
            accepted: BTreeSet::from_iter([value]),
            rejected: BTreeSet::new(),
        }
    }

    /// Accepts any of the given values. Must be given at least one; a single
    /// distinct value collapses to [`SelectionPredicate::matching_only`].
    pub fn matching_any_of(values: impl IntoIterator<Item = U>) -> Self {
        let accepted: BTreeSet<U> = values.into_iter().collect();
        assert!(
            !accepted.is_empty(),
            "matching_any_of requires at least one value; use matching_all"
        );
        SelectionPredicate {
            accepted,
            rejected: BTreeSet::new(),
        }
    }

    /// Accepts everything except the given values.
    pub fn matching_none(values: impl IntoIterator<Item = U>) -> Self {
        SelectionPredicate {
            accepted: BTreeSet::new(),
            rejected: values.into_iter().collect(),
        }
    }

    pub fn matches(&self, value: &U) -> bool {
        (self.accepted.is_empty() || self.accepted.contains(value))
            && !self.rejected.contains(value)
    }

    /// True exactly for the `matching_only` shape: one accepted value, no
    /// rejected values. Callers may compile this to a plain `=` condition.
    pub fn is_simple_equality(&self) -> bool {
        self.accepted.len() == 1 && self.rejected.is_empty()
    }

    /// Accepts every value and rejects none, i.e. no condition needed.
    pub fn accepts_all(&self) -> bool {
        self.accepted.is_empty() && self.rejected.is_empty()
    }

    pub fn accepted(&self) -> impl Iterator<Item = &U> {
        self.accepted.iter()
    }

    pub fn rejected(&self) -> impl Iterator<Item = &U> {
        self.rejected.iter()
    }
}

/// Sort directives; each entry is a tie-break for the one before it.
///
/// The permanent sentinel is the maximum representable instant, so permanent
/// punishments are latest-ending under the natural ordering of both
/// end-date directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirective {
    NewestFirst,
    OldestFirst,
    LatestEndFirst,
    SoonestEndFirst,
}

/// Keyset pagination bound, inclusive of the boundary id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum Seek {
    /// Rows with `start > min_start OR (start == min_start AND id >= min_id)`.
    After {
        min_start: Timestamp,
        min_id: PunishmentId,
    },
    /// Rows with `start < max_start OR (start == max_start AND id <= max_id)`.
    Before {
        max_start: Timestamp,
        max_id: PunishmentId,
    },
}

/// A reusable retrieval specification.
///
/// Pagination policy: `seek` and `skip` are mutually exclusive by intent;
/// if both are set, keyset wins and the offset is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kinds: SelectionPredicate<PunishmentType>,
    pub operators: SelectionPredicate<Operator>,
    pub scopes: SelectionPredicate<Scope>,
    pub tracks: SelectionPredicate<Option<EscalationTrack>>,
    pub active_only: bool,
    pub skip: u64,
    pub seek: Option<Seek>,
    /// 0 = unlimited.
    pub limit: u64,
    pub sort: Vec<SortDirective>,
}

impl Selection {
    pub fn builder() -> SelectionBuilder {
        SelectionBuilder::default()
    }
}

/// Builder for [`Selection`]. Defaults: all predicates accept everything,
/// active punishments only, no pagination, no explicit sort.
#[derive(Debug, Clone)]
pub struct SelectionBuilder {
    kinds: SelectionPredicate<PunishmentType>,
    operators: SelectionPredicate<Operator>,
    scopes: SelectionPredicate<Scope>,
    tracks: SelectionPredicate<Option<EscalationTrack>>,
    active_only: bool,
    skip: u64,
    seek: Option<Seek>,
    limit: u64,
    sort: Vec<SortDirective>,
}

impl Default for SelectionBuilder {
    fn default() -> Self {
        SelectionBuilder {
            kinds: SelectionPredicate::matching_all(),
            operators: SelectionPredicate::matching_all(),
            scopes: SelectionPredicate::matching_all(),
            tracks: SelectionPredicate::matching_all(),
            active_only: true,
            skip: 0,
            seek: None,
            limit: 0,
            sort: Vec::new(),
        }
    }
}

impl SelectionBuilder {
    pub fn kinds(mut self, predicate: SelectionPredicate<PunishmentType>) -> Self {
        self.kinds = predicate;
        self
    }

    pub fn operators(mut self, predicate: SelectionPredicate<Operator>) -> Self {
        self.operators = predicate;
        self
    }

    pub fn scopes(mut self, predicate: SelectionPredicate<Scope>) -> Self {
        self.scopes = predicate;
        self
    }

    pub fn tracks(mut self, predicate: SelectionPredicate<Option<EscalationTrack>>) -> Self {
        self.tracks = predicate;
        self
    }

    pub fn active_only(mut self, active_only: bool) -> Self {
        self.active_only = active_only;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn seek_after(mut self, min_start: Timestamp, min_id: PunishmentId) -> Self {
        self.seek = Some(Seek::After { min_start, min_id });
        self
    }

    pub fn seek_before(mut self, max_start: Timestamp, max_id: PunishmentId) -> Self {
        self.seek = Some(Seek::Before { max_start, max_id });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn sort(mut self, directives: impl IntoIterator<Item = SortDirective>) -> Self {
        self.sort = directives.into_iter().collect();
        self
    }

    pub fn build(self) -> Selection {
        Selection {
            kinds: self.kinds,
            operators: self.operators,
            scopes: self.scopes,
            tracks: self.tracks,
            active_only: self.active_only,
            skip: self.skip,
            seek: self.seek,
            limit: self.limit,
            sort: self.sort,
        }
    }
}
