//! PostgreSQL snapshot types (version 7)

use std::collections::BTreeMap;

use drizzle_types::Dialect;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{IdentityKind, PolicyAs, PolicyFor};
use crate::snapshot::{Generated, Internal, ORIGIN_UUID, Relation, new_snapshot_id};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PgSnapshot {
    pub version: String,
    pub dialect: Dialect,
    pub id: String,
    pub prev_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub enums: BTreeMap<String, Enum>,
    /// Namespaces other than `public`, name to name
    #[serde(default)]
    pub schemas: BTreeMap<String, String>,
    #[serde(default)]
    pub sequences: BTreeMap<String, Sequence>,
    #[serde(default)]
    pub roles: BTreeMap<String, Role>,
    /// Policies linked to tables that are not part of this snapshot
    #[serde(default)]
    pub policies: BTreeMap<String, Policy>,
    #[serde(default)]
    pub views: BTreeMap<String, View>,
    #[serde(default, skip_serializing_if = "Internal::is_empty")]
    pub internal: Internal,
}

impl Default for PgSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl PgSnapshot {
    pub fn new() -> Self {
        Self {
            version: Dialect::PostgreSQL.snapshot_version().to_string(),
            dialect: Dialect::PostgreSQL,
            id: new_snapshot_id(),
            prev_id: ORIGIN_UUID.to_string(),
            project_id: None,
            tables: BTreeMap::new(),
            enums: BTreeMap::new(),
            schemas: BTreeMap::new(),
            sequences: BTreeMap::new(),
            roles: BTreeMap::new(),
            policies: BTreeMap::new(),
            views: BTreeMap::new(),
            internal: Internal::default(),
        }
    }

    /// Map key of a table or other schema-qualified entity
    pub fn key(schema: &str, name: &str) -> String {
        let schema = if schema.is_empty() { "public" } else { schema };
        format!("{schema}.{name}")
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.views.is_empty() && self.enums.is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    /// Empty for the default `public` schema
    pub schema: String,
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
    pub policies: BTreeMap<String, Policy>,
    #[serde(rename = "isRLSEnabled", default)]
    pub is_rls_enabled: bool,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            columns: BTreeMap::new(),
            indexes: BTreeMap::new(),
            foreign_keys: BTreeMap::new(),
            composite_primary_keys: BTreeMap::new(),
            unique_constraints: BTreeMap::new(),
            check_constraints: BTreeMap::new(),
            policies: BTreeMap::new(),
            is_rls_enabled: false,
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

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_schema: Option<String>,
    pub primary_key: bool,
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub nulls_not_distinct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<Generated>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
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
            type_schema: None,
            primary_key: false,
            not_null: false,
            default: None,
            is_unique: false,
            unique_name: None,
            nulls_not_distinct: false,
            generated: None,
            identity: None,
            description: None,
            ordinal_position: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Backing sequence name
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IdentityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
    #[serde(default)]
    pub cycle: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IndexColumn {
    pub expression: String,
    pub is_expression: bool,
    pub asc: bool,
    pub nulls: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opclass: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub is_unique: bool,
    #[serde(default)]
    pub concurrently: bool,
    pub method: String,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub with: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub name: String,
    pub table_from: String,
    pub columns_from: Vec<String>,
    pub table_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_to: Option<String>,
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
#[serde(rename_all = "camelCase")]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub nulls_not_distinct: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CheckConstraint {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub name: String,
    #[serde(rename = "as")]
    pub as_: PolicyAs,
    #[serde(rename = "for")]
    pub for_: PolicyFor,
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_check: Option<String>,
    /// Qualified target table, set only on standalone policies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Enum {
    pub name: String,
    pub schema: String,
    pub values: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub name: String,
    pub schema: String,
    pub increment: String,
    pub min_value: String,
    pub max_value: String,
    pub start_with: String,
    pub cache: String,
    pub cycle: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    pub create_db: bool,
    pub create_role: bool,
    pub inherit: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    pub schema: String,
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default)]
    pub materialized: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, Value>,
    #[serde(default)]
    pub is_existing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_no_data: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tablespace: Option<String>,
}

// =============================================================================
// Squashed form
// =============================================================================

/// Table whose compound entities are replaced by their tokens
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SquashedTable {
    pub name: String,
    pub schema: String,
    /// Columns with `identity` moved into `identities`
    pub columns: BTreeMap<String, Column>,
    pub identities: BTreeMap<String, String>,
    pub indexes: BTreeMap<String, String>,
    pub foreign_keys: BTreeMap<String, String>,
    pub composite_primary_keys: BTreeMap<String, String>,
    pub unique_constraints: BTreeMap<String, String>,
    pub check_constraints: BTreeMap<String, String>,
    pub policies: BTreeMap<String, String>,
    #[serde(rename = "isRLSEnabled")]
    pub is_rls_enabled: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SquashedSequence {
    pub name: String,
    pub schema: String,
    pub values: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SquashedPgSnapshot {
    pub tables: BTreeMap<String, SquashedTable>,
    pub enums: BTreeMap<String, Enum>,
    pub schemas: BTreeMap<String, String>,
    pub sequences: BTreeMap<String, SquashedSequence>,
    pub roles: BTreeMap<String, Role>,
    pub policies: BTreeMap<String, String>,
    pub views: BTreeMap<String, View>,
}
