//! Planned DDL statements for all dialects

use std::collections::{BTreeMap, HashSet};

use drizzle_types::Dialect;
use serde::{Deserialize, Serialize};

use crate::error::SerializerError;
use crate::mysql::MySqlStatement;
use crate::postgres::PgStatement;
use crate::snapshot::Snapshot;
use crate::sqlite::SqliteStatement;

/// Statement kind, independent of dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    CreateSchema,
    CreateRole,
    CreateTypeEnum,
    CreateSequence,
    CreateTable,
    CreateReference,
    CreateIndex,
    CreateUniqueConstraint,
    CreateCompositePk,
    CreatePolicy,
    CreateIndPolicy,
    EnableRls,
    CreateView,
}

impl StatementKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateSchema => "create_schema",
            Self::CreateRole => "create_role",
            Self::CreateTypeEnum => "create_type_enum",
            Self::CreateSequence => "create_sequence",
            Self::CreateTable => "create_table",
            Self::CreateReference => "create_reference",
            Self::CreateIndex => "create_index",
            Self::CreateUniqueConstraint => "create_unique_constraint",
            Self::CreateCompositePk => "create_composite_pk",
            Self::CreatePolicy => "create_policy",
            Self::CreateIndPolicy => "create_ind_policy",
            Self::EnableRls => "enable_rls",
            Self::CreateView => "create_view",
        }
    }
}

/// A planned statement for one of the supported dialects
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "dialect")]
pub enum Statement {
    #[serde(rename = "postgresql")]
    Postgres(PgStatement),
    #[serde(rename = "mysql")]
    MySql(MySqlStatement),
    #[serde(rename = "sqlite")]
    Sqlite(SqliteStatement),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Postgres(s) => s.kind(),
            Statement::MySql(s) => s.kind(),
            Statement::Sqlite(s) => s.kind(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Statement::Postgres(_) => Dialect::PostgreSQL,
            Statement::MySql(_) => Dialect::MySQL,
            Statement::Sqlite(_) => Dialect::SQLite,
        }
    }

    /// Table the statement creates or alters, if any
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Statement::Postgres(s) => s.table_name(),
            Statement::MySql(s) => s.table_name(),
            Statement::Sqlite(s) => s.table_name(),
        }
    }
}

impl From<PgStatement> for Statement {
    fn from(s: PgStatement) -> Self {
        Statement::Postgres(s)
    }
}

impl From<MySqlStatement> for Statement {
    fn from(s: MySqlStatement) -> Self {
        Statement::MySql(s)
    }
}

impl From<SqliteStatement> for Statement {
    fn from(s: SqliteStatement) -> Self {
        Statement::Sqlite(s)
    }
}

/// Options for statement planning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Emit unique constraints and composite primary keys as separate
    /// `ALTER TABLE` statements instead of inline (Postgres and MySQL)
    pub split_constraints: bool,
}

/// Table keys ordered so that referenced tables precede the tables that
/// reference them. Unrelated tables and cycles keep key order.
pub(crate) fn creation_order<'a, T>(
    tables: &'a BTreeMap<String, T>,
    references: impl Fn(&T) -> Vec<String>,
) -> Vec<&'a str> {
    fn visit<'a, T>(
        key: &str,
        tables: &'a BTreeMap<String, T>,
        references: &dyn Fn(&T) -> Vec<String>,
        seen: &mut HashSet<&'a str>,
        out: &mut Vec<&'a str>,
    ) {
        let Some((key, table)) = tables.get_key_value(key) else {
            return;
        };
        if !seen.insert(key.as_str()) {
            return;
        }
        for target in references(table) {
            visit(&target, tables, references, seen, out);
        }
        out.push(key.as_str());
    }

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(tables.len());
    for key in tables.keys() {
        visit(key, tables, &references, &mut seen, &mut out);
    }
    out
}

/// Plan the statements that create `snapshot` from scratch, in dependency
/// order.
pub fn plan(snapshot: &Snapshot, options: &PlanOptions) -> Result<Vec<Statement>, SerializerError> {
    let statements: Vec<Statement> = match snapshot {
        Snapshot::Postgres(s) => crate::postgres::planner::plan(s, options)?
            .into_iter()
            .map(Statement::from)
            .collect(),
        Snapshot::MySql(s) => crate::mysql::planner::plan(s, options)?
            .into_iter()
            .map(Statement::from)
            .collect(),
        Snapshot::Sqlite(s) => crate::sqlite::planner::plan(s)?
            .into_iter()
            .map(Statement::from)
            .collect(),
    };
    tracing::debug!(
        dialect = %snapshot.dialect(),
        count = statements.len(),
        "planned statements"
    );
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(edges: &[(&str, &[&str])]) -> Vec<String> {
        let tables: BTreeMap<String, Vec<String>> = edges
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect();
        creation_order(&tables, |deps| deps.clone())
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn referenced_tables_come_first() {
        assert_eq!(
            order(&[("posts", &["users"]), ("users", &[]), ("comments", &["posts", "users"])]),
            vec!["users", "posts", "comments"]
        );
    }

    #[test]
    fn cycles_and_unknown_targets_terminate() {
        assert_eq!(
            order(&[("a", &["b"]), ("b", &["a"]), ("c", &["c", "missing"])]),
            vec!["b", "a", "c"]
        );
    }
}
