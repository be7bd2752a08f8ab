//! SQLite statement records

use serde::{Deserialize, Serialize};

use super::snapshot::Column;
use crate::snapshot::Internal;
use crate::statements::StatementKind;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SqliteStatement {
    /// Foreign keys and composite keys are inlined
    CreateTable {
        table_name: String,
        /// Columns in declaration order
        columns: Vec<Column>,
        composite_pks: Vec<String>,
        references: Vec<String>,
        unique_constraints: Vec<String>,
        check_constraints: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        internal: Option<Internal>,
    },
    CreateIndex {
        table_name: String,
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        internal: Option<Internal>,
    },
    CreateView {
        name: String,
        definition: String,
    },
}

impl SqliteStatement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::CreateTable { .. } => StatementKind::CreateTable,
            Self::CreateIndex { .. } => StatementKind::CreateIndex,
            Self::CreateView { .. } => StatementKind::CreateView,
        }
    }

    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table_name, .. } | Self::CreateIndex { table_name, .. } => {
                Some(table_name)
            }
            Self::CreateView { .. } => None,
        }
    }
}
