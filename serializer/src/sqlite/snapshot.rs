//! SQLite snapshot types (version 6)

use std::collections::BTreeMap;

use drizzle_types::Dialect;
use serde::{Deserialize, Serialize};

use crate::snapshot::{Generated, Internal, ORIGIN_UUID, Relation, new_snapshot_id};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SqliteSnapshot {
    pub version: String,
    pub dialect: Dialect,
    pub id: String,
    pub prev_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub views: BTreeMap<String, View>,
    #[serde(default, skip_serializing_if = "Internal::is_empty")]
    pub internal: Internal,
}

impl Default for SqliteSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteSnapshot {
    pub fn new() -> Self {
        Self {
            version: Dialect::SQLite.snapshot_version().to_string(),
            dialect: Dialect::SQLite,
            id: new_snapshot_id(),
            prev_id: ORIGIN_UUID.to_string(),
            project_id: None,
            tables: BTreeMap::new(),
            views: BTreeMap::new(),
            internal: Internal::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    pub columns: BTreeMap<String, Column>,
    #[serde(default)]
    pub indexes: BTreeMap<String, Index>,
    #[serde(default)]
    pub foreign_keys: BTreeMap<String, ForeignKey>,
    #[serde(default)]
    pub composite_primary_keys: BTreeMap<String, PrimaryKey>,
    #[serde(default)]
    pub unique_constraints: BTreeMap<String, UniqueConstraint>,
    #[serde(default)]
    pub check_constraints: BTreeMap<String, CheckConstraint>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
            indexes: BTreeMap::new(),
            foreign_keys: BTreeMap::new(),
            composite_primary_keys: BTreeMap::new(),
            unique_constraints: BTreeMap::new(),
            check_constraints: BTreeMap::new(),
            relations: Vec::new(),
        }
    }

    /// Columns in declaration order
    pub fn ordered_columns(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.values().collect();
        columns.sort_by_key(|c| c.ordinal_position);
        columns
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    pub primary_key: bool,
    pub not_null: bool,
    #[serde(default)]
    pub autoincrement: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Expression is stored wrapped in parentheses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<Generated>,
    #[serde(default)]
    pub ordinal_position: usize,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            primary_key: false,
            not_null: false,
            autoincrement: false,
            default: None,
            generated: None,
            ordinal_position: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub name: String,
    /// Column names or SQL expressions; see `internal` for which is which
    pub columns: Vec<String>,
    pub is_unique: bool,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub name: String,
    pub table_from: String,
    pub columns_from: Vec<String>,
    pub table_to: String,
    pub columns_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PrimaryKey {
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CheckConstraint {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default)]
    pub is_existing: bool,
}

// =============================================================================
// Squashed form
// =============================================================================

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SquashedTable {
    pub name: String,
    pub columns: BTreeMap<String, Column>,
    pub indexes: BTreeMap<String, String>,
    pub foreign_keys: BTreeMap<String, String>,
    pub composite_primary_keys: BTreeMap<String, String>,
    pub unique_constraints: BTreeMap<String, String>,
    pub check_constraints: BTreeMap<String, String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SquashedSqliteSnapshot {
    pub tables: BTreeMap<String, SquashedTable>,
    pub views: BTreeMap<String, View>,
}
