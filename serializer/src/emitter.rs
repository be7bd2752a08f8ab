//! Statement to SQL dispatch
//!
//! Each `(statement kind, dialect)` pair maps to at most one convertor. The
//! pairs a dialect cannot express resolve to nothing and render no SQL.

use std::collections::HashSet;

use drizzle_types::Dialect;

use crate::error::SerializerError;
use crate::statements::{Statement, StatementKind};

/// Rendering rule for one statement kind in one dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convertor {
    Postgres(StatementKind),
    MySql(StatementKind),
    Sqlite(StatementKind),
}

impl Convertor {
    /// The rule for `kind` in `dialect`, if the dialect has one
    pub fn resolve(kind: StatementKind, dialect: Dialect) -> Option<Self> {
        use StatementKind as K;
        match (dialect, kind) {
            (Dialect::PostgreSQL, kind) => Some(Self::Postgres(kind)),

            (
                Dialect::MySQL,
                K::CreateTable
                | K::CreateReference
                | K::CreateIndex
                | K::CreateUniqueConstraint
                | K::CreateCompositePk
                | K::CreateView,
            ) => Some(Self::MySql(kind)),
            (
                Dialect::MySQL,
                K::CreateSchema
                | K::CreateRole
                | K::CreateTypeEnum
                | K::CreateSequence
                | K::CreatePolicy
                | K::CreateIndPolicy
                | K::EnableRls,
            ) => None,

            (Dialect::SQLite, K::CreateTable | K::CreateIndex | K::CreateView) => {
                Some(Self::Sqlite(kind))
            }
            (
                Dialect::SQLite,
                K::CreateSchema
                | K::CreateRole
                | K::CreateTypeEnum
                | K::CreateSequence
                | K::CreateReference
                | K::CreateUniqueConstraint
                | K::CreateCompositePk
                | K::CreatePolicy
                | K::CreateIndPolicy
                | K::EnableRls,
            ) => None,
        }
    }

    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Postgres(kind) | Self::MySql(kind) | Self::Sqlite(kind) => *kind,
        }
    }

    /// Render `statement`, which must be of this rule's kind and dialect
    pub fn convert(&self, statement: &Statement) -> Result<Vec<String>, SerializerError> {
        if statement.kind() != self.kind() {
            return Err(SerializerError::InvalidSchema(format!(
                "a {} convertor cannot render a {} statement",
                self.kind().as_str(),
                statement.kind().as_str()
            )));
        }
        match (self, statement) {
            (Self::Postgres(_), Statement::Postgres(s)) => crate::postgres::convertor::convert(s),
            (Self::MySql(_), Statement::MySql(s)) => crate::mysql::convertor::convert(s),
            (Self::Sqlite(_), Statement::Sqlite(s)) => crate::sqlite::convertor::convert(s),
            (_, other) => Err(SerializerError::UnsupportedDialect {
                dialect: other.dialect(),
                operation: "rendering with another dialect's convertor",
            }),
        }
    }
}

/// Render statements to SQL, one statement per line, dropping repeated lines
pub fn emit(statements: &[Statement]) -> Result<String, SerializerError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for statement in statements {
        let Some(convertor) = Convertor::resolve(statement.kind(), statement.dialect()) else {
            tracing::debug!(
                kind = statement.kind().as_str(),
                dialect = %statement.dialect(),
                "no convertor for statement"
            );
            continue;
        };
        for sql in convertor.convert(statement)? {
            if seen.insert(sql.clone()) {
                out.push(sql);
            }
        }
    }
    Ok(out.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteStatement;

    const ALL_KINDS: [StatementKind; 13] = [
        StatementKind::CreateSchema,
        StatementKind::CreateRole,
        StatementKind::CreateTypeEnum,
        StatementKind::CreateSequence,
        StatementKind::CreateTable,
        StatementKind::CreateReference,
        StatementKind::CreateIndex,
        StatementKind::CreateUniqueConstraint,
        StatementKind::CreateCompositePk,
        StatementKind::CreatePolicy,
        StatementKind::CreateIndPolicy,
        StatementKind::EnableRls,
        StatementKind::CreateView,
    ];

    #[test]
    fn postgres_renders_every_kind() {
        assert!(
            ALL_KINDS
                .iter()
                .all(|k| Convertor::resolve(*k, Dialect::PostgreSQL).is_some())
        );
    }

    #[test]
    fn sqlite_has_no_alter_rules() {
        let supported: Vec<_> = ALL_KINDS
            .iter()
            .filter(|k| Convertor::resolve(**k, Dialect::SQLite).is_some())
            .collect();
        assert_eq!(
            supported,
            vec![
                &StatementKind::CreateTable,
                &StatementKind::CreateIndex,
                &StatementKind::CreateView
            ]
        );
        assert_eq!(
            Convertor::resolve(StatementKind::CreateReference, Dialect::SQLite),
            None
        );
    }

    #[test]
    fn mysql_skips_postgres_only_kinds() {
        assert_eq!(
            Convertor::resolve(StatementKind::CreateTypeEnum, Dialect::MySQL),
            None
        );
        assert_eq!(
            Convertor::resolve(StatementKind::CreateReference, Dialect::MySQL),
            Some(Convertor::MySql(StatementKind::CreateReference))
        );
    }

    #[test]
    fn emit_drops_repeated_lines() {
        let view = Statement::Sqlite(SqliteStatement::CreateView {
            name: "v".into(),
            definition: "select 1".into(),
        });
        let sql = emit(&[view.clone(), view]).unwrap();
        assert_eq!(sql, "CREATE VIEW `v` AS select 1;");
    }

    #[test]
    fn convertor_rejects_other_kinds() {
        let view = Statement::Sqlite(SqliteStatement::CreateView {
            name: "v".into(),
            definition: "select 1".into(),
        });
        let table = Convertor::Sqlite(StatementKind::CreateTable);
        assert!(table.convert(&view).is_err());
    }
}
