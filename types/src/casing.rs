//! Column naming policy
//!
//! Maps the identifier a column is declared under to the name stored in the
//! database. An explicit column name always wins over the policy.

use heck::{ToLowerCamelCase, ToSnakeCase};

/// Naming transform applied to in-source column keys
///
/// # Examples
///
/// ```
/// use drizzle_types::Casing;
///
/// assert_eq!(Casing::SnakeCase.apply("authorId"), "author_id");
/// assert_eq!(Casing::CamelCase.apply("author_id"), "authorId");
/// assert_eq!(Casing::Preserve.apply("authorId"), "authorId");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Casing {
    #[cfg_attr(feature = "serde", serde(rename = "snake_case"))]
    SnakeCase,
    #[cfg_attr(feature = "serde", serde(rename = "camelCase"))]
    CamelCase,
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "preserve"))]
    Preserve,
}

impl Casing {
    /// Transform a column key according to this policy
    #[must_use]
    pub fn apply(&self, key: &str) -> String {
        match self {
            Casing::SnakeCase => key.to_snake_case(),
            Casing::CamelCase => key.to_lower_camel_case(),
            Casing::Preserve => key.to_string(),
        }
    }

    /// Resolve the storage name of a column: the explicit name if one was
    /// given, otherwise the cased key.
    #[must_use]
    pub fn column_name(&self, key: &str, explicit: Option<&str>) -> String {
        match explicit {
            Some(name) => name.to_string(),
            None => self.apply(key),
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "snake_case" | "snake" => Some(Casing::SnakeCase),
            "camelCase" | "camel" => Some(Casing::CamelCase),
            "preserve" => Some(Casing::Preserve),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_name_wins() {
        assert_eq!(
            Casing::SnakeCase.column_name("createdAt", Some("created")),
            "created"
        );
        assert_eq!(Casing::SnakeCase.column_name("createdAt", None), "created_at");
    }

    #[test]
    fn snake_case_is_idempotent() {
        assert_eq!(Casing::SnakeCase.apply("author_id"), "author_id");
        assert_eq!(Casing::CamelCase.apply("authorId"), "authorId");
    }

    #[test]
    fn parse_names() {
        assert_eq!(Casing::parse("camelCase"), Some(Casing::CamelCase));
        assert_eq!(Casing::parse("kebab"), None);
    }
}
