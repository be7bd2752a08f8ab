//! Dialect-tagged snapshot container and the pieces every dialect shares

use std::collections::BTreeMap;
use std::path::Path;

use drizzle_types::Dialect;
use serde::{Deserialize, Serialize};

use crate::error::SerializerError;
use crate::mysql::MySqlSnapshot;
use crate::postgres::PgSnapshot;
use crate::schema::{GeneratedMode, RelationKind};
use crate::sqlite::SqliteSnapshot;

/// Parent id of a snapshot that has no predecessor
pub const ORIGIN_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Declarative relation attached to a snapshot table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub field_name: String,
    pub relation_name: String,
    pub referenced_table_name: String,
}

/// Generated column expression
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Generated {
    #[serde(rename = "as")]
    pub expression: String,
    #[serde(rename = "type")]
    pub mode: GeneratedMode,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFlags {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_expression: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default_an_expression: bool,
}

/// Side table of facts that cannot be recovered from the SQL text alone.
///
/// `indexes` is keyed by table, then constraint name, then column text and
/// marks index or unique columns that are expressions. Expressions are
/// emitted verbatim; everything else is quoted as an identifier.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Internal {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub indexes: BTreeMap<String, BTreeMap<String, BTreeMap<String, ColumnFlags>>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tables: BTreeMap<String, BTreeMap<String, ColumnFlags>>,
}

impl Internal {
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty() && self.tables.is_empty()
    }

    pub fn mark_expression(&mut self, table: &str, constraint: &str, column: &str) {
        self.indexes
            .entry(table.to_string())
            .or_default()
            .entry(constraint.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default()
            .is_expression = true;
    }

    pub fn is_expression(&self, table: &str, constraint: &str, column: &str) -> bool {
        self.indexes
            .get(table)
            .and_then(|t| t.get(constraint))
            .and_then(|c| c.get(column))
            .is_some_and(|f| f.is_expression)
    }

    pub fn mark_default_expression(&mut self, table: &str, column: &str) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default()
            .is_default_an_expression = true;
    }

    pub fn is_default_expression(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .and_then(|t| t.get(column))
            .is_some_and(|f| f.is_default_an_expression)
    }

    /// The flags recorded for one table, or `None` when it has none
    pub fn for_table(&self, table: &str) -> Option<Internal> {
        let subset = Internal {
            indexes: self
                .indexes
                .get_key_value(table)
                .map(|(k, v)| (k.clone(), v.clone()))
                .into_iter()
                .collect(),
            tables: self
                .tables
                .get_key_value(table)
                .map(|(k, v)| (k.clone(), v.clone()))
                .into_iter()
                .collect(),
        };
        (!subset.is_empty()).then_some(subset)
    }

    /// Quote `column` with `quote` unless it was recorded as an expression
    pub fn render_column(
        &self,
        table: &str,
        constraint: &str,
        column: &str,
        quote: impl Fn(&str) -> String,
    ) -> String {
        if self.is_expression(table, constraint, column) {
            column.to_string()
        } else {
            quote(column)
        }
    }
}

/// A snapshot for any dialect
///
/// Serializes as the inner dialect snapshot; the `dialect` field inside
/// identifies the variant on the way back in.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Snapshot {
    Postgres(PgSnapshot),
    MySql(MySqlSnapshot),
    Sqlite(SqliteSnapshot),
}

impl Snapshot {
    pub fn dialect(&self) -> Dialect {
        match self {
            Snapshot::Postgres(_) => Dialect::PostgreSQL,
            Snapshot::MySql(_) => Dialect::MySQL,
            Snapshot::Sqlite(_) => Dialect::SQLite,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Snapshot::Postgres(s) => &s.version,
            Snapshot::MySql(s) => &s.version,
            Snapshot::Sqlite(s) => &s.version,
        }
    }

    pub fn as_postgres(&self) -> Option<&PgSnapshot> {
        match self {
            Snapshot::Postgres(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mysql(&self) -> Option<&MySqlSnapshot> {
        match self {
            Snapshot::MySql(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sqlite(&self) -> Option<&SqliteSnapshot> {
        match self {
            Snapshot::Sqlite(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a snapshot, refusing dialects or versions this crate does not
    /// write.
    pub fn from_json(json: &str) -> Result<Self, SerializerError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let dialect_name = value
            .get("dialect")
            .and_then(|d| d.as_str())
            .ok_or_else(|| SerializerError::decode("snapshot dialect", "missing"))?;
        let dialect = Dialect::parse(dialect_name)
            .ok_or_else(|| SerializerError::decode("snapshot dialect", dialect_name))?;
        let version = value
            .get("version")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SerializerError::decode("snapshot version", "missing"))?;
        if version != dialect.snapshot_version() {
            return Err(SerializerError::decode(
                "snapshot version",
                format!("{dialect} snapshot version {version}"),
            ));
        }

        Ok(match dialect {
            Dialect::PostgreSQL => Snapshot::Postgres(serde_json::from_value(value)?),
            Dialect::MySQL => Snapshot::MySql(serde_json::from_value(value)?),
            Dialect::SQLite => Snapshot::Sqlite(serde_json::from_value(value)?),
        })
    }

    pub fn to_json(&self) -> Result<String, SerializerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, SerializerError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn save(&self, path: &Path) -> Result<(), SerializerError> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl From<PgSnapshot> for Snapshot {
    fn from(s: PgSnapshot) -> Self {
        Snapshot::Postgres(s)
    }
}

impl From<MySqlSnapshot> for Snapshot {
    fn from(s: MySqlSnapshot) -> Self {
        Snapshot::MySql(s)
    }
}

impl From<SqliteSnapshot> for Snapshot {
    fn from(s: SqliteSnapshot) -> Self {
        Snapshot::Sqlite(s)
    }
}

pub(crate) fn new_snapshot_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_marks_expressions_per_constraint() {
        let mut internal = Internal::default();
        internal.mark_expression("users", "users_lower_idx", "lower(`email`)");
        assert!(internal.is_expression("users", "users_lower_idx", "lower(`email`)"));
        assert!(!internal.is_expression("users", "other_idx", "lower(`email`)"));
        assert_eq!(
            internal.render_column("users", "users_lower_idx", "email", |c| format!("`{c}`")),
            "`email`"
        );
        assert!(internal.for_table("users").is_some());
        assert_eq!(internal.for_table("posts"), None);
    }

    #[test]
    fn rejects_unknown_versions() {
        let json = r#"{"version":"99","dialect":"sqlite","tables":{}}"#;
        assert!(matches!(
            Snapshot::from_json(json),
            Err(SerializerError::Decode { .. })
        ));
    }

    #[test]
    fn rejects_unknown_dialects() {
        let json = r#"{"version":"1","dialect":"oracle"}"#;
        assert!(Snapshot::from_json(json).is_err());
    }
}
