//! Partial-match filter helpers shared by the per-entity filter structs.
//!
//! Search filters are a conjunction of per-field predicates: a supplied
//! value must be a substring of the stored field's string form; an
//! omitted or empty value matches everything. Identifier matching is
//! hyphen-insensitive and case-insensitive so callers can paste either
//! the canonical or the compact UUID form. Results carry no ordering
//! contract.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Substring match. `None`/empty filter matches everything.
pub fn text_matches(filter: Option<&str>, value: &str) -> bool {
    match filter {
        None | Some("") => true,
        Some(f) => value.contains(f),
    }
}

/// Substring match on an optional stored value. A supplied filter never
/// matches an absent value.
pub fn opt_text_matches(filter: Option<&str>, value: Option<&str>) -> bool {
    match filter {
        None | Some("") => true,
        Some(f) => value.is_some_and(|v| v.contains(f)),
    }
}

/// Identifier match: compact lowercase forms on both sides.
pub fn id_matches(filter: Option<&str>, id: &Uuid) -> bool {
    match filter {
        None | Some("") => true,
        Some(f) => {
            let needle: String = f
                .chars()
                .filter(|c| *c != '-')
                .flat_map(char::to_lowercase)
                .collect();
            id.simple().to_string().contains(&needle)
        }
    }
}

/// Identifier match on an optional relation.
pub fn opt_id_matches(filter: Option<&str>, id: Option<&Uuid>) -> bool {
    match filter {
        None | Some("") => true,
        Some(_) => id.is_some_and(|v| id_matches(filter, v)),
    }
}

/// Decimal match: substring of the canonical decimal rendering.
pub fn decimal_matches(filter: Option<&str>, value: &Decimal) -> bool {
    text_matches(filter, &value.to_string())
}

/// Decimal match on an optional stored value.
pub fn opt_decimal_matches(filter: Option<&str>, value: Option<&Decimal>) -> bool {
    match filter {
        None | Some("") => true,
        Some(f) => value.is_some_and(|v| v.to_string().contains(f)),
    }
}

/// Equality match on a boolean flag.
pub fn bool_matches(filter: Option<bool>, value: bool) -> bool {
    filter.map_or(true, |f| f == value)
}

/// The string form timestamps are matched against.
pub fn date_stamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Timestamp match: substring of the `YYYY-MM-DD hh:mm:ss` rendering.
pub fn date_matches(filter: Option<&str>, value: &DateTime<Utc>) -> bool {
    text_matches(filter, &date_stamp(value))
}
