//! SQL fragments embedded in schema descriptions
//!
//! Column references inside a fragment are resolved through the casing policy
//! and quoted for the target dialect when the fragment is rendered.

use drizzle_types::{Casing, Dialect};
use serde_json::Value;

use super::TableDef;
use crate::utils::quote_literal;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlChunk {
    /// Verbatim SQL text
    Raw(String),
    /// Reference to a column by its in-source key
    Column(String),
    /// Inlined literal value
    Literal(Value),
}

/// A SQL expression assembled from chunks
///
/// # Examples
///
/// ```
/// use drizzle_serializer::schema::Sql;
/// use drizzle_types::{Casing, Dialect};
///
/// let check = Sql::column("status").push_raw(" <> ").push_literal("draft");
/// assert_eq!(
///     check.render(Dialect::PostgreSQL, Casing::Preserve),
///     "\"status\" <> 'draft'"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sql {
    chunks: Vec<SqlChunk>,
}

impl Sql {
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            chunks: vec![SqlChunk::Raw(text.into())],
        }
    }

    pub fn column(key: impl Into<String>) -> Self {
        Self {
            chunks: vec![SqlChunk::Column(key.into())],
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self {
            chunks: vec![SqlChunk::Literal(value.into())],
        }
    }

    #[must_use]
    pub fn push_raw(mut self, text: impl Into<String>) -> Self {
        self.chunks.push(SqlChunk::Raw(text.into()));
        self
    }

    #[must_use]
    pub fn push_column(mut self, key: impl Into<String>) -> Self {
        self.chunks.push(SqlChunk::Column(key.into()));
        self
    }

    #[must_use]
    pub fn push_literal(mut self, value: impl Into<Value>) -> Self {
        self.chunks.push(SqlChunk::Literal(value.into()));
        self
    }

    #[must_use]
    pub fn append(mut self, other: Sql) -> Self {
        self.chunks.extend(other.chunks);
        self
    }

    pub fn chunks(&self) -> &[SqlChunk] {
        &self.chunks
    }

    /// Returns `true` when the fragment is exactly one column reference.
    pub fn as_single_column(&self) -> Option<&str> {
        match self.chunks.as_slice() {
            [SqlChunk::Column(key)] => Some(key),
            _ => None,
        }
    }

    /// Render the fragment to SQL text
    pub fn render(&self, dialect: Dialect, casing: Casing) -> String {
        self.render_with(dialect, |key| casing.apply(key))
    }

    /// Render the fragment with column keys resolved against `table`.
    ///
    /// A key naming a column of `table` renders as that column's storage
    /// name, explicit `name(..)` included. Other keys fall back to casing.
    pub fn render_in(
        &self,
        dialect: Dialect,
        casing: Casing,
        table: Option<&TableDef>,
    ) -> String {
        self.render_with(dialect, |key| match table.and_then(|t| t.find_column(key)) {
            Some(column) => casing.column_name(&column.key, column.name.as_deref()),
            None => casing.apply(key),
        })
    }

    pub(crate) fn render_with(
        &self,
        dialect: Dialect,
        column_name: impl Fn(&str) -> String,
    ) -> String {
        let mut out = String::new();
        for chunk in &self.chunks {
            match chunk {
                SqlChunk::Raw(text) => out.push_str(text),
                SqlChunk::Column(key) => out.push_str(&dialect.quote(&column_name(key))),
                SqlChunk::Literal(value) => out.push_str(&render_literal(value)),
            }
        }
        out
    }
}

impl From<&str> for Sql {
    fn from(text: &str) -> Self {
        Sql::raw(text)
    }
}

impl From<String> for Sql {
    fn from(text: String) -> Self {
        Sql::raw(text)
    }
}

pub(crate) fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        other => quote_literal(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_follow_casing_and_dialect() {
        let sql = Sql::raw("lower(").push_column("userName").push_raw(")");
        assert_eq!(
            sql.render(Dialect::MySQL, Casing::SnakeCase),
            "lower(`user_name`)"
        );
        assert_eq!(
            sql.render(Dialect::PostgreSQL, Casing::Preserve),
            "lower(\"userName\")"
        );
    }

    #[test]
    fn columns_resolve_through_owning_table() {
        use crate::schema::{column, table};

        let events = table("events")
            .column(column("createdAt", "integer").name("created_on"))
            .column(column("kind", "text"));
        let sql = Sql::column("createdAt")
            .push_raw(" > 0 and ")
            .push_column("kind")
            .push_raw(" <> ")
            .push_column("otherKey");
        assert_eq!(
            sql.render_in(Dialect::PostgreSQL, Casing::SnakeCase, Some(&events)),
            "\"created_on\" > 0 and \"kind\" <> \"other_key\""
        );
        assert_eq!(
            sql.render_in(Dialect::MySQL, Casing::Preserve, None),
            "`createdAt` > 0 and `kind` <> `otherKey`"
        );
    }

    #[test]
    fn literals_are_inlined() {
        let sql = Sql::raw("x = ").push_literal("it's").push_raw(" or y = ").push_literal(3);
        assert_eq!(
            sql.render(Dialect::SQLite, Casing::Preserve),
            "x = 'it''s' or y = 3"
        );
    }
}
