//! Pieces shared by the per-dialect snapshot builders: options, default
//! naming and default-value formatting.

use drizzle_types::{Casing, Dialect};
use serde_json::Value;

use crate::schema::{ColumnDef, DefaultValue, SchemaObjectSet, Sql, TableDef};
use crate::utils::quote_literal;

/// Options controlling snapshot building
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOptions {
    pub casing: Casing,
    pub project_id: Option<String>,
}

impl BuildOptions {
    pub fn new(casing: Casing) -> Self {
        Self {
            casing,
            project_id: None,
        }
    }

    #[must_use]
    pub fn project_id(mut self, id: impl Into<String>) -> Self {
        self.project_id = Some(id.into());
        self
    }

    /// Storage name of a column
    pub fn column_name(&self, column: &ColumnDef) -> String {
        self.casing.column_name(&column.key, column.name.as_deref())
    }

    /// Storage name of the column declared under `key` in `table`
    pub fn key_name(&self, table: Option<&TableDef>, key: &str) -> String {
        match table.and_then(|t| t.find_column(key)) {
            Some(column) => self.column_name(column),
            None => self.casing.apply(key),
        }
    }

    /// Storage names of the columns a foreign key points at
    pub fn referenced_names(
        &self,
        set: &SchemaObjectSet,
        table: &str,
        schema: Option<&str>,
        keys: &[String],
    ) -> Vec<String> {
        let target = set.find_table(table, schema);
        keys.iter().map(|k| self.key_name(target, k)).collect()
    }
}

/// Render a fragment that is not bound to one table, such as a view body.
///
/// Each column key resolves through the first table declaring it.
pub fn render_unbound(
    sql: &Sql,
    dialect: Dialect,
    set: &SchemaObjectSet,
    options: &BuildOptions,
) -> String {
    sql.render_with(dialect, |key| {
        let owner = set.tables.iter().find(|t| t.find_column(key).is_some());
        options.key_name(owner, key)
    })
}

pub fn pk_name(table: &str, columns: &[String]) -> String {
    format!("{}_{}_pk", table, columns.join("_"))
}

pub fn unique_name(table: &str, columns: &[String]) -> String {
    format!("{}_{}_unique", table, columns.join("_"))
}

pub fn index_name(table: &str, columns: &[String]) -> String {
    format!("{}_{}_index", table, columns.join("_"))
}

pub fn fk_name(table_from: &str, columns_from: &[String], table_to: &str, columns_to: &[String]) -> String {
    format!(
        "{}_{}_{}_{}_fk",
        table_from,
        columns_from.join("_"),
        table_to,
        columns_to.join("_")
    )
}

/// Merge the column pairs of a same-named foreign key into an existing one.
///
/// Pairs are kept together so both lists stay the same length; a pair
/// already present is skipped.
pub fn merge_foreign_key_columns(
    from: &mut Vec<String>,
    to: &mut Vec<String>,
    incoming_from: &[String],
    incoming_to: &[String],
) {
    for (f, t) in incoming_from.iter().zip(incoming_to) {
        if !from.iter().zip(to.iter()).any(|(ef, et)| ef == f && et == t) {
            from.push(f.clone());
            to.push(t.clone());
        }
    }
}

/// Format a default value into the literal or expression text stored in the
/// snapshot.
pub fn format_default(
    value: &DefaultValue,
    sql_type: &str,
    dialect: Dialect,
    casing: Casing,
    table: Option<&TableDef>,
) -> String {
    let lowered = sql_type.to_ascii_lowercase();
    let formatted = match value {
        DefaultValue::Sql(sql) => return sql.render_in(dialect, casing, table),
        DefaultValue::String(s) => quote_literal(s),
        DefaultValue::Integer(i) => i.to_string(),
        DefaultValue::Float(f) => f.to_string(),
        DefaultValue::Bool(b) => b.to_string(),
        DefaultValue::Json(v) => match dialect {
            Dialect::PostgreSQL if lowered == "json" || lowered == "jsonb" => {
                format!("{}::{}", quote_literal(&v.to_string()), lowered)
            }
            Dialect::PostgreSQL if lowered.ends_with("[]") => match v {
                Value::Array(items) => quote_literal(&pg_array_literal(items)),
                other => quote_literal(&other.to_string()),
            },
            _ => quote_literal(&v.to_string()),
        },
        DefaultValue::Array(items) => match dialect {
            Dialect::PostgreSQL => quote_literal(&pg_array_literal(items)),
            _ => quote_literal(&Value::Array(items.clone()).to_string()),
        },
        DefaultValue::Date(date) => {
            if lowered == "date" {
                quote_literal(&date.format("%Y-%m-%d").to_string())
            } else {
                quote_literal(&date.format("%Y-%m-%d 00:00:00.000").to_string())
            }
        }
        DefaultValue::Timestamp(ts) => {
            if lowered == "date" {
                quote_literal(&ts.format("%Y-%m-%d").to_string())
            } else if dialect == Dialect::SQLite && lowered.starts_with("int") {
                ts.timestamp().to_string()
            } else if dialect == Dialect::MySQL || is_zoneless_timestamp(&lowered) {
                quote_literal(&ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            } else {
                quote_literal(&ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            }
        }
        DefaultValue::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            match dialect {
                Dialect::PostgreSQL => format!("'\\x{hex}'"),
                Dialect::MySQL | Dialect::SQLite => format!("X'{hex}'"),
            }
        }
    };

    let parenthesized = matches!(dialect, Dialect::MySQL | Dialect::SQLite)
        && ["json", "text", "blob"]
            .iter()
            .any(|t| lowered == *t || lowered.starts_with(&format!("{t}(")));
    if parenthesized {
        format!("({formatted})")
    } else {
        formatted
    }
}

/// `timestamp`, `timestamp(n)` and `timestamp without time zone`, but not
/// `timestamptz` or `... with time zone`
fn is_zoneless_timestamp(lowered: &str) -> bool {
    let Some(rest) = lowered.strip_prefix("timestamp") else {
        return false;
    };
    let rest = match rest.strip_prefix('(') {
        Some(precision) => match precision.split_once(')') {
            Some((_, tail)) => tail,
            None => return false,
        },
        None => rest,
    };
    let rest = rest.trim();
    rest.is_empty() || rest == "without time zone"
}

/// Postgres array literal body, e.g. `{1,2}` or `{"a","b"}`
pub fn pg_array_literal(items: &[Value]) -> String {
    let inner: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::Array(nested) => pg_array_literal(nested),
            Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Value::Null => "NULL".to_string(),
            Value::Object(_) => format!(
                "\"{}\"",
                item.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            ),
            other => other.to_string(),
        })
        .collect();
    format!("{{{}}}", inner.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn strings_are_quoted_and_escaped() {
        let v = DefaultValue::from("it's");
        assert_eq!(
            format_default(&v, "varchar(20)", Dialect::PostgreSQL, Casing::Preserve, None),
            "'it''s'"
        );
    }

    #[test]
    fn text_defaults_are_parenthesized_outside_postgres() {
        let v = DefaultValue::from("abc");
        assert_eq!(
            format_default(&v, "text", Dialect::MySQL, Casing::Preserve, None),
            "('abc')"
        );
        assert_eq!(
            format_default(&v, "text", Dialect::SQLite, Casing::Preserve, None),
            "('abc')"
        );
        assert_eq!(
            format_default(&v, "text", Dialect::PostgreSQL, Casing::Preserve, None),
            "'abc'"
        );
    }

    #[test]
    fn pg_json_defaults_are_cast() {
        let v = DefaultValue::Json(json!({"a": 1}));
        assert_eq!(
            format_default(&v, "jsonb", Dialect::PostgreSQL, Casing::Preserve, None),
            "'{\"a\":1}'::jsonb"
        );
    }

    #[test]
    fn dates_follow_column_subtype() {
        let d = DefaultValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(
            format_default(&d, "date", Dialect::PostgreSQL, Casing::Preserve, None),
            "'2024-01-02'"
        );
        let ts = DefaultValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        assert_eq!(
            format_default(&ts, "timestamp", Dialect::PostgreSQL, Casing::Preserve, None),
            "'2024-01-02 03:04:05.000'"
        );
        assert_eq!(
            format_default(&ts, "timestamp with time zone", Dialect::PostgreSQL, Casing::Preserve, None),
            "'2024-01-02T03:04:05.000Z'"
        );
        assert_eq!(
            format_default(&ts, "timestamp(3)", Dialect::PostgreSQL, Casing::Preserve, None),
            "'2024-01-02 03:04:05.000'"
        );
        assert_eq!(
            format_default(&ts, "timestamp without time zone", Dialect::PostgreSQL, Casing::Preserve, None),
            "'2024-01-02 03:04:05.000'"
        );
        assert_eq!(
            format_default(&ts, "datetime", Dialect::MySQL, Casing::Preserve, None),
            "'2024-01-02 03:04:05.000'"
        );
    }

    #[test]
    fn zoned_timestamps_keep_utc_offset() {
        let ts = DefaultValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        for sql_type in ["timestamptz", "timestamptz(3)", "timestamp(6) with time zone"] {
            assert_eq!(
                format_default(&ts, sql_type, Dialect::PostgreSQL, Casing::Preserve, None),
                "'2024-01-02T03:04:05.000Z'",
                "{sql_type}"
            );
        }
    }

    #[test]
    fn sql_defaults_resolve_explicit_column_names() {
        let t = crate::schema::table("t")
            .column(crate::schema::column("firstName", "text").name("given_name"));
        let v = DefaultValue::Sql(Sql::raw("upper(").push_column("firstName").push_raw(")"));
        assert_eq!(
            format_default(&v, "integer", Dialect::SQLite, Casing::Preserve, Some(&t)),
            "upper(`given_name`)"
        );
    }

    #[test]
    fn pg_arrays() {
        let v = DefaultValue::Array(vec![json!(1), json!(2)]);
        assert_eq!(
            format_default(&v, "integer[]", Dialect::PostgreSQL, Casing::Preserve, None),
            "'{1,2}'"
        );
        let v = DefaultValue::Array(vec![json!("a"), json!("b")]);
        assert_eq!(
            format_default(&v, "text[]", Dialect::PostgreSQL, Casing::Preserve, None),
            "'{\"a\",\"b\"}'"
        );
    }

    #[test]
    fn sql_defaults_are_rendered_verbatim() {
        let v = DefaultValue::Sql(Sql::raw("now()"));
        assert_eq!(
            format_default(&v, "timestamp", Dialect::PostgreSQL, Casing::Preserve, None),
            "now()"
        );
    }

    #[test]
    fn default_names() {
        let cols = vec!["a".to_string(), "b".to_string()];
        assert_eq!(pk_name("t", &cols), "t_a_b_pk");
        assert_eq!(unique_name("t", &cols), "t_a_b_unique");
        assert_eq!(index_name("t", &cols), "t_a_b_index");
        assert_eq!(fk_name("posts", &cols[..1], "users", &cols[1..]), "posts_a_users_b_fk");
    }

    #[test]
    fn foreign_key_merge_keeps_pairs_aligned() {
        let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let mut from = strings(&["a"]);
        let mut to = strings(&["x"]);
        merge_foreign_key_columns(&mut from, &mut to, &strings(&["b"]), &strings(&["x"]));
        merge_foreign_key_columns(&mut from, &mut to, &strings(&["a"]), &strings(&["x"]));
        assert_eq!(from, vec!["a", "b"]);
        assert_eq!(to, vec!["x", "x"]);
    }
}
