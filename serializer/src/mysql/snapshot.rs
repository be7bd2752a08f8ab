//! MySQL snapshot types (version 5)

use std::collections::BTreeMap;

use drizzle_types::Dialect;
use serde::{Deserialize, Serialize};

use crate::snapshot::{Generated, Internal, ORIGIN_UUID, Relation, new_snapshot_id};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MySqlSnapshot {
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

impl Default for MySqlSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlSnapshot {
    pub fn new() -> Self {
        Self {
            version: Dialect::MySQL.snapshot_version().to_string(),
            dialect: Dialect::MySQL,
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
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
            description: None,
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
    /// `ON UPDATE CURRENT_TIMESTAMP`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<Generated>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
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
            on_update: None,
            generated: None,
            description: None,
            ordinal_position: 0,
        }
    }

    /// Values of an `enum('a','b')` type, if the column has one
    pub fn enum_values(&self) -> Option<Vec<String>> {
        let inner = self
            .sql_type
            .strip_prefix("enum(")
            .and_then(|rest| rest.strip_suffix(')'))?;
        Some(
            crate::utils::split_top_level(inner, ",")
                .into_iter()
                .map(|v| {
                    v.trim()
                        .trim_matches('\'')
                        .replace("''", "'")
                })
                .collect(),
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub name: String,
    /// Column names or SQL expressions; see `internal` for which is which
    pub columns: Vec<String>,
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<String>,
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
    pub name: String,
    pub columns: Vec<String>,
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
    pub algorithm: String,
    pub sql_security: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_check_option: Option<String>,
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

/// View with `algorithm;sqlSecurity;withCheckOption` folded into `meta`
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SquashedView {
    pub name: String,
    pub definition: Option<String>,
    pub is_existing: bool,
    pub meta: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SquashedMySqlSnapshot {
    pub tables: BTreeMap<String, SquashedTable>,
    pub views: BTreeMap<String, SquashedView>,
}
