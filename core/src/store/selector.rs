//! Compiling a [`Selection`] into SQL and the public retrieval operations.
//!
//! A selection fans out into one SELECT per accepted stored type over that
//! type's simple view, glued with UNION ALL; sorting and pagination apply
//! to the combined rows. The type predicate never reaches SQL: it decides
//! which views participate at all.

use super::PunishmentStore;
use crate::cache::MuteCache;
use crate::error::EngineResult;
use crate::matching::{
    applicability_condition, column_in, column_not_in, AddressHistory, AddressStrictness, Cond,
};
use crate::projection::{
    punishment_from_simple_row, ApplicableView, Projection, SimpleView, SIMPLE_COLUMNS,
    VIEW_VICTIM_COLUMNS,
};
use crate::punishment::{
    EscalationTrack, NetworkAddress, Operator, Punishment, PunishmentType, Scope, PERMANENT_END,
};
use crate::selection::{Seek, Selection, SelectionPredicate, SortDirective};
use crate::types::Timestamp;
use rusqlite::types::Value;
use uuid::Uuid;

impl PunishmentStore {
    /// Every punishment the selection accepts, in its sort order.
    pub fn all_matching(&self, selection: &Selection, now: Timestamp) -> EngineResult<Vec<Punishment>> {
        self.run_selection(selection, now, false)
    }

    /// The first punishment the selection accepts, under its sort order.
    pub fn first_matching(
        &self,
        selection: &Selection,
        now: Timestamp,
    ) -> EngineResult<Option<Punishment>> {
        Ok(self.run_selection(selection, now, true)?.into_iter().next())
    }

    /// How many punishments the selection accepts. Pagination and sorting
    /// do not affect the count.
    pub fn count_matching(&self, selection: &Selection, now: Timestamp) -> EngineResult<u64> {
        let arms = self.selection_arms(selection, now)?;
        if arms.is_empty() {
            return Ok(0);
        }
        let (union_sql, params) = join_arms(arms);
        let sql = format!("SELECT COUNT(*) FROM ({union_sql})");
        let count: i64 =
            self.conn
                .query_row(&sql, rusqlite::params_from_iter(params), |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Punishments of `kind` held against the connecting identity under the
    /// given strictness. Enforceability is baked into the applicable views.
    pub fn applicable_to(
        &self,
        uuid: Uuid,
        address: NetworkAddress,
        kind: PunishmentType,
        strictness: AddressStrictness,
        history: &dyn AddressHistory,
    ) -> EngineResult<Vec<Punishment>> {
        let view = ApplicableView.table(kind)?;
        let cond = applicability_condition(VIEW_VICTIM_COLUMNS, uuid, address, strictness, history)?;
        let (where_sql, params) = cond.into_parts();
        // DISTINCT over the punishment columns: the identity join can pair
        // one punishment with several history rows.
        let sql = format!(
            "SELECT DISTINCT {cols} FROM {view} WHERE {where_sql} ORDER BY id ASC",
            cols = SIMPLE_COLUMNS.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let punishments = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                punishment_from_simple_row(kind, row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(punishments)
    }

    /// The applicable mute for this identity, going to storage only on a
    /// cache miss and offering the result (muted or not) back to the cache.
    pub fn cached_mute(
        &self,
        uuid: Uuid,
        address: NetworkAddress,
        strictness: AddressStrictness,
        history: &dyn AddressHistory,
        cache: &dyn MuteCache,
    ) -> EngineResult<Option<Punishment>> {
        if let Some(cached) = cache.get(uuid, address) {
            return Ok(cached);
        }
        let mute = self
            .applicable_to(uuid, address, PunishmentType::Mute, strictness, history)?
            .into_iter()
            .next();
        cache.put(uuid, address, mute.clone());
        Ok(mute)
    }

    fn run_selection(
        &self,
        selection: &Selection,
        now: Timestamp,
        first_only: bool,
    ) -> EngineResult<Vec<Punishment>> {
        let arms = self.selection_arms(selection, now)?;
        if arms.is_empty() {
            return Ok(Vec::new());
        }
        let (mut sql, mut params) = join_arms(arms);
        sql.push_str(&order_clause(&selection.sort));

        // Keyset wins over offset when both are set; the seek condition is
        // already part of each arm, so only the offset is suppressed here.
        let skip = if selection.seek.is_some() { 0 } else { selection.skip };
        let limit = if first_only { 1 } else { selection.limit };
        if limit > 0 {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(limit as i64));
            if skip > 0 {
                sql.push_str(" OFFSET ?");
                params.push(Value::Integer(skip as i64));
            }
        } else if skip > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(Value::Integer(skip as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let punishments = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                let tag: i64 = row.get(TYPE_TAG_INDEX)?;
                let kind = PunishmentType::from_tag(tag)
                    .ok_or(rusqlite::Error::IntegralValueOutOfRange(TYPE_TAG_INDEX, tag))?;
                punishment_from_simple_row(kind, row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(punishments)
    }

    /// One SELECT per stored type the selection's type predicate accepts.
    /// An empty return means the selection can match nothing.
    fn selection_arms(
        &self,
        selection: &Selection,
        now: Timestamp,
    ) -> EngineResult<Vec<(String, Vec<Value>)>> {
        let mut arms = Vec::new();
        for kind in PunishmentType::STORED {
            if !selection.kinds.matches(&kind) {
                continue;
            }
            let view = SimpleView.table(kind)?;
            let (where_sql, params) = selection_condition(selection, now).into_parts();
            let sql = format!(
                "SELECT {cols}, {tag} AS type FROM {view} WHERE {where_sql}",
                cols = SIMPLE_COLUMNS.join(", "),
                tag = kind.as_tag()
            );
            arms.push((sql, params));
        }
        Ok(arms)
    }
}

/// Index of the `type` tag column appended after [`SIMPLE_COLUMNS`].
const TYPE_TAG_INDEX: usize = 12;

fn join_arms(arms: Vec<(String, Vec<Value>)>) -> (String, Vec<Value>) {
    let mut sqls = Vec::with_capacity(arms.len());
    let mut params = Vec::new();
    for (sql, mut arm_params) in arms {
        sqls.push(sql);
        params.append(&mut arm_params);
    }
    (sqls.join(" UNION ALL "), params)
}

fn selection_condition(selection: &Selection, now: Timestamp) -> Cond {
    let mut cond = in_set_condition(&selection.operators, "operator", operator_value);
    cond = cond.and(value_set_condition(&selection.scopes, scope_equals));
    cond = cond.and(value_set_condition(&selection.tracks, track_equals));
    if selection.active_only {
        cond = cond.and(active_condition(now));
    }
    if let Some(seek) = selection.seek {
        cond = cond.and(seek_condition(seek));
    }
    cond
}

/// Predicate over a domain with a single-column SQL image: accepted values
/// become `IN`, rejected values `NOT IN`. A one-element accept set falls
/// out as plain equality.
fn in_set_condition<U: Ord>(
    predicate: &SelectionPredicate<U>,
    column: &str,
    to_value: impl Fn(&U) -> Value,
) -> Cond {
    let mut cond = Cond::always_true();
    let accepted: Vec<Value> = predicate.accepted().map(&to_value).collect();
    if !accepted.is_empty() {
        cond = cond.and(column_in(column, accepted));
    }
    let rejected: Vec<Value> = predicate.rejected().map(&to_value).collect();
    if !rejected.is_empty() {
        cond = cond.and(column_not_in(column, rejected));
    }
    cond
}

/// Predicate over a domain whose equality spans several columns: accepted
/// values OR together, rejected values subtract as negations.
fn value_set_condition<U: Ord>(
    predicate: &SelectionPredicate<U>,
    equals: impl Fn(&U) -> Cond,
) -> Cond {
    let mut cond = Cond::always_true();
    let mut accepted = predicate.accepted();
    if let Some(first) = accepted.next() {
        cond = cond.and(accepted.fold(equals(first), |acc, value| acc.or(equals(value))));
    }
    for value in predicate.rejected() {
        let (sql, params) = equals(value).into_parts();
        cond = cond.and(Cond::raw(format!("NOT ({sql})"), params));
    }
    cond
}

fn operator_value(operator: &Operator) -> Value {
    Value::Blob(operator.stored_uuid().as_bytes().to_vec())
}

// Scope and track columns are NULL for global/untracked rows, so equality
// uses IS: plain = would turn NOT (...) into UNKNOWN on those rows and
// silently drop them from rejections.

fn scope_equals(scope: &Scope) -> Cond {
    match (scope.type_tag(), scope.value()) {
        (Some(tag), Some(value)) => Cond::raw(
            "scope_type IS ? AND scope_value IS ?",
            vec![Value::Integer(tag), Value::Text(value.to_string())],
        ),
        _ => Cond::raw("scope_type IS NULL", Vec::new()),
    }
}

fn track_equals(track: &Option<EscalationTrack>) -> Cond {
    match track {
        Some(track) => Cond::raw(
            "track_namespace IS ? AND track_value IS ?",
            vec![
                Value::Text(track.namespace.clone()),
                Value::Text(track.value.clone()),
            ],
        ),
        None => Cond::raw("track_namespace IS NULL", Vec::new()),
    }
}

fn active_condition(now: Timestamp) -> Cond {
    Cond::raw(
        "\"end\" = ? OR \"end\" > ?",
        vec![Value::Integer(PERMANENT_END), Value::Integer(now)],
    )
}

/// Keyset bounds are inclusive of the boundary id on both sides.
fn seek_condition(seek: Seek) -> Cond {
    match seek {
        Seek::After { min_start, min_id } => Cond::raw(
            "start > ? OR (start = ? AND id >= ?)",
            vec![
                Value::Integer(min_start),
                Value::Integer(min_start),
                Value::Integer(min_id),
            ],
        ),
        Seek::Before { max_start, max_id } => Cond::raw(
            "start < ? OR (start = ? AND id <= ?)",
            vec![
                Value::Integer(max_start),
                Value::Integer(max_start),
                Value::Integer(max_id),
            ],
        ),
    }
}

/// Sort directives in order, each a tie-break for the one before it; id is
/// the final tie-break so result order is stable.
fn order_clause(sort: &[SortDirective]) -> String {
    let mut terms: Vec<&str> = sort
        .iter()
        .map(|directive| match directive {
            SortDirective::NewestFirst => "start DESC",
            SortDirective::OldestFirst => "start ASC",
            SortDirective::LatestEndFirst => "\"end\" DESC",
            SortDirective::SoonestEndFirst => "\"end\" ASC",
        })
        .collect();
    terms.push("id ASC");
    format!(" ORDER BY {}", terms.join(", "))
}
