//! MySQL statement records

use serde::{Deserialize, Serialize};

use super::snapshot::Column;
use crate::snapshot::Internal;
use crate::statements::StatementKind;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MySqlStatement {
    CreateTable {
        table_name: String,
        /// Columns in declaration order
        columns: Vec<Column>,
        composite_pks: Vec<String>,
        composite_pk_name: String,
        unique_constraints: Vec<String>,
        check_constraints: Vec<String>,
        /// Expression flags of this table only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        internal: Option<Internal>,
    },
    CreateReference {
        table_name: String,
        data: String,
    },
    CreateIndex {
        table_name: String,
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        internal: Option<Internal>,
    },
    CreateUniqueConstraint {
        table_name: String,
        data: String,
    },
    CreateCompositePk {
        table_name: String,
        data: String,
        constraint_name: String,
    },
    CreateView {
        name: String,
        definition: String,
        algorithm: String,
        sql_security: String,
        with_check_option: Option<String>,
    },
}

impl MySqlStatement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::CreateTable { .. } => StatementKind::CreateTable,
            Self::CreateReference { .. } => StatementKind::CreateReference,
            Self::CreateIndex { .. } => StatementKind::CreateIndex,
            Self::CreateUniqueConstraint { .. } => StatementKind::CreateUniqueConstraint,
            Self::CreateCompositePk { .. } => StatementKind::CreateCompositePk,
            Self::CreateView { .. } => StatementKind::CreateView,
        }
    }

    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table_name, .. }
            | Self::CreateReference { table_name, .. }
            | Self::CreateIndex { table_name, .. }
            | Self::CreateUniqueConstraint { table_name, .. }
            | Self::CreateCompositePk { table_name, .. } => Some(table_name),
            Self::CreateView { .. } => None,
        }
    }
}
