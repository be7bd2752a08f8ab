//! Table definitions and table-level constraints

use std::collections::BTreeMap;

use serde_json::Value;

use super::column::{ColumnDef, ReferentialAction};
use super::entities::PolicyDef;
use super::Sql;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullsOrder {
    First,
    Last,
}

impl NullsOrder {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexTarget {
    /// Column referenced by key
    Column(String),
    Expression(Sql),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexColumnDef {
    pub target: IndexTarget,
    pub asc: bool,
    pub nulls: Option<NullsOrder>,
    pub opclass: Option<String>,
}

impl IndexColumnDef {
    pub fn column(key: impl Into<String>) -> Self {
        Self {
            target: IndexTarget::Column(key.into()),
            asc: true,
            nulls: None,
            opclass: None,
        }
    }

    pub fn expression(sql: impl Into<Sql>) -> Self {
        let sql = sql.into();
        // A fragment that is only a column reference indexes that column.
        let target = match sql.as_single_column() {
            Some(key) => IndexTarget::Column(key.to_string()),
            None => IndexTarget::Expression(sql),
        };
        Self {
            target,
            asc: true,
            nulls: None,
            opclass: None,
        }
    }

    #[must_use]
    pub fn desc(mut self) -> Self {
        self.asc = false;
        self
    }

    #[must_use]
    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    #[must_use]
    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    #[must_use]
    pub fn op(mut self, opclass: impl Into<String>) -> Self {
        self.opclass = Some(opclass.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexDef {
    pub name: Option<String>,
    pub columns: Vec<IndexColumnDef>,
    pub unique: bool,
    pub concurrently: bool,
    /// Postgres access method / MySQL `USING`
    pub method: Option<String>,
    pub where_clause: Option<Sql>,
    pub with: BTreeMap<String, Value>,
    pub algorithm: Option<String>,
    pub lock: Option<String>,
}

pub fn index(name: impl Into<String>) -> IndexDef {
    IndexDef {
        name: Some(name.into()),
        ..IndexDef::default()
    }
}

pub fn unique_index(name: impl Into<String>) -> IndexDef {
    IndexDef {
        name: Some(name.into()),
        unique: true,
        ..IndexDef::default()
    }
}

impl IndexDef {
    /// Index the given column keys in ascending order
    #[must_use]
    pub fn on<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .extend(keys.into_iter().map(|k| IndexColumnDef::column(k)));
        self
    }

    #[must_use]
    pub fn column(mut self, column: IndexColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn on_expression(mut self, sql: impl Into<Sql>) -> Self {
        self.columns.push(IndexColumnDef::expression(sql));
        self
    }

    #[must_use]
    pub fn concurrently(mut self) -> Self {
        self.concurrently = true;
        self
    }

    #[must_use]
    pub fn using(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn where_clause(mut self, sql: impl Into<Sql>) -> Self {
        self.where_clause = Some(sql.into());
        self
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    #[must_use]
    pub fn lock(mut self, lock: impl Into<String>) -> Self {
        self.lock = Some(lock.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub foreign_table: String,
    pub foreign_schema: Option<String>,
    pub foreign_columns: Vec<String>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

/// Table-level foreign key from `columns` to `foreign_table(foreign_columns)`.
/// Column lists hold declared keys.
pub fn foreign_key<I, S, J, T>(columns: I, foreign_table: impl Into<String>, foreign_columns: J) -> ForeignKeyDef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    J: IntoIterator<Item = T>,
    T: Into<String>,
{
    ForeignKeyDef {
        name: None,
        columns: columns.into_iter().map(Into::into).collect(),
        foreign_table: foreign_table.into(),
        foreign_schema: None,
        foreign_columns: foreign_columns.into_iter().map(Into::into).collect(),
        on_delete: None,
        on_update: None,
    }
}

impl ForeignKeyDef {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn foreign_schema(mut self, schema: impl Into<String>) -> Self {
        self.foreign_schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    #[must_use]
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKeyDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

pub fn primary_key<I, S>(columns: I) -> PrimaryKeyDef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    PrimaryKeyDef {
        name: None,
        columns: columns.into_iter().map(Into::into).collect(),
    }
}

impl PrimaryKeyDef {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniqueDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub nulls_not_distinct: bool,
}

pub fn unique<I, S>(columns: I) -> UniqueDef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    UniqueDef {
        name: None,
        columns: columns.into_iter().map(Into::into).collect(),
        nulls_not_distinct: false,
    }
}

impl UniqueDef {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn nulls_not_distinct(mut self) -> Self {
        self.nulls_not_distinct = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckDef {
    pub name: String,
    pub value: Sql,
}

/// A table as declared in a schema description
///
/// ```
/// use drizzle_serializer::schema::{column, table};
///
/// let users = table("users")
///     .column(column("id", "serial").primary_key())
///     .column(column("name", "text").not_null());
/// assert_eq!(users.columns.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableDef {
    pub name: String,
    pub schema: Option<String>,
    pub columns: Vec<ColumnDef>,
    pub indexes: Vec<IndexDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
    pub primary_keys: Vec<PrimaryKeyDef>,
    pub uniques: Vec<UniqueDef>,
    pub checks: Vec<CheckDef>,
    pub policies: Vec<PolicyDef>,
    pub rls_enabled: bool,
    pub comment: Option<String>,
}

pub fn table(name: impl Into<String>) -> TableDef {
    TableDef {
        name: name.into(),
        ..TableDef::default()
    }
}

impl TableDef {
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    #[must_use]
    pub fn primary_key(mut self, pk: PrimaryKeyDef) -> Self {
        self.primary_keys.push(pk);
        self
    }

    #[must_use]
    pub fn unique(mut self, unique: UniqueDef) -> Self {
        self.uniques.push(unique);
        self
    }

    #[must_use]
    pub fn check(mut self, name: impl Into<String>, value: impl Into<Sql>) -> Self {
        self.checks.push(CheckDef {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: PolicyDef) -> Self {
        self.policies.push(policy);
        self
    }

    #[must_use]
    pub fn enable_rls(mut self) -> Self {
        self.rls_enabled = true;
        self
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Find a column by its declared key
    pub fn find_column(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Canonical identity used for de-duplication: `schema.name`
    pub fn canonical_name(&self) -> String {
        format!("{}.{}", self.schema.as_deref().unwrap_or(""), self.name)
    }
}
