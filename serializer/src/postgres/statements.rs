//! PostgreSQL statement records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::{Column, Policy, Role, Sequence};
use crate::statements::StatementKind;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PgStatement {
    CreateSchema {
        name: String,
    },
    CreateRole {
        name: String,
        values: Role,
    },
    CreateTypeEnum {
        name: String,
        schema: String,
        values: Vec<String>,
    },
    CreateSequence {
        name: String,
        schema: String,
        values: Sequence,
    },
    CreateTable {
        table_name: String,
        schema: String,
        /// Columns in declaration order
        columns: Vec<Column>,
        /// Composite primary key tokens
        composite_pks: Vec<String>,
        composite_pk_name: String,
        unique_constraints: Vec<String>,
        check_constraints: Vec<String>,
        policies: Vec<String>,
        is_rls_enabled: bool,
    },
    EnableRls {
        table_name: String,
        schema: String,
    },
    CreateReference {
        table_name: String,
        schema: String,
        /// Foreign key token
        data: String,
    },
    CreateIndex {
        table_name: String,
        schema: String,
        /// Index token
        data: String,
    },
    CreateUniqueConstraint {
        table_name: String,
        schema: String,
        data: String,
    },
    CreateCompositePk {
        table_name: String,
        schema: String,
        data: String,
        constraint_name: String,
    },
    CreatePolicy {
        table_name: String,
        schema: String,
        data: Policy,
    },
    /// Policy on a table outside the snapshot; `table_name` is qualified
    CreateIndPolicy {
        table_name: String,
        data: Policy,
    },
    CreateView {
        name: String,
        schema: String,
        definition: String,
        materialized: bool,
        with: BTreeMap<String, Value>,
        using: Option<String>,
        tablespace: Option<String>,
        with_no_data: bool,
    },
}

impl PgStatement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::CreateSchema { .. } => StatementKind::CreateSchema,
            Self::CreateRole { .. } => StatementKind::CreateRole,
            Self::CreateTypeEnum { .. } => StatementKind::CreateTypeEnum,
            Self::CreateSequence { .. } => StatementKind::CreateSequence,
            Self::CreateTable { .. } => StatementKind::CreateTable,
            Self::EnableRls { .. } => StatementKind::EnableRls,
            Self::CreateReference { .. } => StatementKind::CreateReference,
            Self::CreateIndex { .. } => StatementKind::CreateIndex,
            Self::CreateUniqueConstraint { .. } => StatementKind::CreateUniqueConstraint,
            Self::CreateCompositePk { .. } => StatementKind::CreateCompositePk,
            Self::CreatePolicy { .. } => StatementKind::CreatePolicy,
            Self::CreateIndPolicy { .. } => StatementKind::CreateIndPolicy,
            Self::CreateView { .. } => StatementKind::CreateView,
        }
    }

    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table_name, .. }
            | Self::EnableRls { table_name, .. }
            | Self::CreateReference { table_name, .. }
            | Self::CreateIndex { table_name, .. }
            | Self::CreateUniqueConstraint { table_name, .. }
            | Self::CreateCompositePk { table_name, .. }
            | Self::CreatePolicy { table_name, .. }
            | Self::CreateIndPolicy { table_name, .. } => Some(table_name),
            _ => None,
        }
    }
}
