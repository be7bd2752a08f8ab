//! Canonical single-string encoding of snapshot entities
//!
//! Every compound entity (index, foreign key, constraint, policy, sequence)
//! has a compact token form. Tokens are stable, so two entities compare equal
//! exactly when their tokens do.

use std::collections::BTreeMap;

use crate::error::SerializerError;

pub trait Squash: Sized {
    /// Encode into the canonical token
    fn squash(&self) -> String;

    /// Decode a token produced by [`Squash::squash`]
    fn unsquash(token: &str) -> Result<Self, SerializerError>;
}

/// Squash every value of a map, keeping the keys
pub fn squash_map<T: Squash>(map: &BTreeMap<String, T>) -> BTreeMap<String, String> {
    map.iter().map(|(k, v)| (k.clone(), v.squash())).collect()
}

/// Decode every token of a map
pub fn unsquash_map<T: Squash>(
    map: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, T>, SerializerError> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), T::unsquash(v)?)))
        .collect()
}

/// Join column names for a token
pub(crate) fn join_columns(columns: &[String]) -> String {
    columns.join(",")
}

pub(crate) fn opt_to_field(v: Option<&str>) -> &str {
    v.unwrap_or("")
}
