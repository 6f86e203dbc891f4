//! Shared primitive types used across the entire engine.

/// Surrogate id of a persisted punishment row (64-bit sequence).
pub type PunishmentId = i64;

/// Surrogate id of a dimension row (victims, scopes, tracks).
pub type DimensionId = i64;

/// An instant, as whole seconds since the Unix epoch.
pub type Timestamp = i64;
