//! SQLite catalog introspection
//!
//! `sqlite_master` and the table-valued pragmas give most of the schema.
//! Facts SQLite keeps only in the original DDL (generated expressions,
//! AUTOINCREMENT, constraint names and checks) are parsed from the stored
//! `CREATE TABLE` text.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;
use serde_json::Value;

use super::snapshot::{
    CheckConstraint, Column, ForeignKey, Index, PrimaryKey, SqliteSnapshot, Table,
    UniqueConstraint, View,
};
use crate::builder::{fk_name, pk_name, unique_name};
use crate::catalog::{CatalogQuery, IntrospectOptions, fetch, flag, int, text};
use crate::error::SerializerError;
use crate::schema::{GeneratedMode, ReferentialAction};
use crate::snapshot::Generated;
use crate::utils::{balanced_parens, split_top_level, unquote_identifier};

#[derive(Debug, Deserialize)]
struct RawTable {
    name: String,
    #[serde(default, deserialize_with = "text")]
    sql: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawColumn {
    table: String,
    #[serde(deserialize_with = "int")]
    cid: i64,
    name: String,
    #[serde(default, deserialize_with = "text")]
    column_type: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    not_null: bool,
    #[serde(default, deserialize_with = "text")]
    default_value: Option<String>,
    #[serde(default, deserialize_with = "int")]
    pk: i64,
    #[serde(default, deserialize_with = "int")]
    hidden: i64,
}

#[derive(Debug, Deserialize)]
struct RawIndex {
    name: String,
    #[serde(default, deserialize_with = "flag")]
    unique: bool,
    #[serde(default, deserialize_with = "text")]
    origin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIndexColumn {
    #[serde(deserialize_with = "int")]
    seqno: i64,
    #[serde(default, deserialize_with = "text")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSql {
    #[serde(default, deserialize_with = "text")]
    sql: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawForeignKey {
    #[serde(deserialize_with = "int")]
    id: i64,
    #[serde(deserialize_with = "int")]
    seq: i64,
    table: String,
    from: String,
    #[serde(default, deserialize_with = "text")]
    to: Option<String>,
    #[serde(default, deserialize_with = "text")]
    on_update: Option<String>,
    #[serde(default, deserialize_with = "text")]
    on_delete: Option<String>,
}

/// Read every user table and view into a snapshot
pub fn introspect(
    db: &mut impl CatalogQuery,
    options: &IntrospectOptions,
) -> Result<SqliteSnapshot, SerializerError> {
    let mut snapshot = SqliteSnapshot::new();
    let mut table_sql: HashMap<String, String> = HashMap::new();

    for t in fetch::<RawTable>(db, queries::TABLES, &[])? {
        if !system_table_filter(&t.name) || !options.includes_table(&t.name) {
            continue;
        }
        if let Some(sql) = t.sql {
            table_sql.insert(t.name.clone(), sql);
        }
        snapshot.tables.insert(t.name.clone(), Table::new(t.name));
    }

    let raw_views = fetch::<RawTable>(db, queries::VIEWS, &[])?;
    let view_names: HashSet<&str> = raw_views.iter().map(|v| v.name.as_str()).collect();
    let parsed: HashMap<&str, TableDdl> = table_sql
        .iter()
        .map(|(name, sql)| (name.as_str(), parse_table_sql(sql)))
        .collect();

    let mut view_columns: BTreeMap<String, BTreeMap<String, Column>> = BTreeMap::new();
    let mut pk_columns: BTreeMap<String, Vec<(i64, String)>> = BTreeMap::new();

    for c in fetch::<RawColumn>(db, queries::COLUMNS, &[])? {
        // Hidden columns of virtual tables
        if c.hidden == 1 {
            continue;
        }
        let ddl = parsed.get(c.table.as_str());
        let mut column = Column::new(
            &c.name,
            c.column_type.as_deref().unwrap_or_default().to_ascii_lowercase(),
        );
        column.ordinal_position = usize::try_from(c.cid).unwrap_or_default();
        column.not_null = c.not_null;
        column.default = c.default_value.as_deref().map(normalize_default);
        column.autoincrement = ddl.is_some_and(|d| d.autoincrement.contains(&c.name));
        if matches!(c.hidden, 2 | 3) {
            column.generated = ddl.and_then(|d| d.generated.get(&c.name)).cloned();
        }

        if let Some(table) = snapshot.tables.get_mut(&c.table) {
            if c.pk > 0 {
                pk_columns
                    .entry(c.table.clone())
                    .or_default()
                    .push((c.pk, c.name.clone()));
            }
            table.columns.insert(column.name.clone(), column);
        } else if view_names.contains(c.table.as_str()) {
            view_columns
                .entry(c.table.clone())
                .or_default()
                .insert(column.name.clone(), column);
        }
    }

    for (table_name, mut columns) in pk_columns.clone() {
        let Some(table) = snapshot.tables.get_mut(&table_name) else {
            continue;
        };
        columns.sort_by_key(|(seq, _)| *seq);
        let names: Vec<String> = columns.into_iter().map(|(_, name)| name).collect();
        if let [single] = names.as_slice() {
            if let Some(column) = table.columns.get_mut(single) {
                column.primary_key = true;
                column.not_null = true;
            }
            continue;
        }
        for name in &names {
            if let Some(column) = table.columns.get_mut(name) {
                column.not_null = true;
            }
        }
        let name = pk_name(&table_name, &names);
        table.composite_primary_keys.insert(
            name.clone(),
            PrimaryKey {
                columns: names,
                name: Some(name),
            },
        );
    }

    let table_names: Vec<String> = snapshot.tables.keys().cloned().collect();
    for table_name in &table_names {
        let param = [Value::from(table_name.clone())];
        let indexes = fetch::<RawIndex>(db, queries::INDEX_LIST, &param)?;
        for raw in indexes {
            let origin = raw.origin.as_deref().unwrap_or("c");
            if origin == "pk" {
                continue;
            }
            let mut info =
                fetch::<RawIndexColumn>(db, queries::INDEX_INFO, &[Value::from(raw.name.clone())])?;
            info.sort_by_key(|c| c.seqno);

            if origin == "u" {
                let columns: Vec<String> = info.into_iter().filter_map(|c| c.name).collect();
                if columns.is_empty() {
                    continue;
                }
                let name = parsed
                    .get(table_name.as_str())
                    .and_then(|d| d.unique_names.get(&columns).cloned())
                    .unwrap_or_else(|| unique_name(table_name, &columns));
                if let Some(table) = snapshot.tables.get_mut(table_name) {
                    table
                        .unique_constraints
                        .insert(name.clone(), UniqueConstraint { name, columns });
                }
                continue;
            }

            let sql = fetch::<RawSql>(db, queries::INDEX_SQL, &[Value::from(raw.name.clone())])?
                .into_iter()
                .find_map(|r| r.sql);
            let (parts, where_clause) = match sql.as_deref() {
                Some(sql) => parse_index_sql(sql),
                None => (Vec::new(), None),
            };

            let mut columns = Vec::with_capacity(info.len());
            for (i, c) in info.into_iter().enumerate() {
                match c.name {
                    Some(name) => columns.push(name),
                    None => {
                        let expression = parts.get(i).cloned().ok_or_else(|| {
                            SerializerError::decode("sqlite index definition", raw.name.clone())
                        })?;
                        snapshot
                            .internal
                            .mark_expression(table_name, &raw.name, &expression);
                        columns.push(expression);
                    }
                }
            }

            if let Some(table) = snapshot.tables.get_mut(table_name) {
                table.indexes.insert(
                    raw.name.clone(),
                    Index {
                        name: raw.name,
                        columns,
                        is_unique: raw.unique,
                        where_clause,
                    },
                );
            }
        }

        let mut fks = fetch::<RawForeignKey>(db, queries::FOREIGN_KEYS, &param)?;
        fks.sort_by_key(|f| (f.id, f.seq));
        let mut grouped: BTreeMap<i64, Vec<RawForeignKey>> = BTreeMap::new();
        for fk in fks {
            grouped.entry(fk.id).or_default().push(fk);
        }
        for rows in grouped.into_values() {
            let Some(first) = rows.first() else {
                continue;
            };
            let table_to = first.table.clone();
            let on_update = rule(first.on_update.as_deref());
            let on_delete = rule(first.on_delete.as_deref());
            let columns_from: Vec<String> = rows.iter().map(|r| r.from.clone()).collect();
            // `to` is NULL when the reference targets the implicit primary key
            let columns_to: Vec<String> = if rows.iter().all(|r| r.to.is_some()) {
                rows.into_iter().filter_map(|r| r.to).collect()
            } else {
                let mut target = pk_columns.get(&table_to).cloned().unwrap_or_default();
                target.sort_by_key(|(seq, _)| *seq);
                target.into_iter().map(|(_, name)| name).collect()
            };
            let name = fk_name(table_name, &columns_from, &table_to, &columns_to);
            if let Some(table) = snapshot.tables.get_mut(table_name) {
                table.foreign_keys.insert(
                    name.clone(),
                    ForeignKey {
                        name,
                        table_from: table_name.clone(),
                        columns_from,
                        table_to,
                        columns_to,
                        on_update: Some(on_update),
                        on_delete: Some(on_delete),
                    },
                );
            }
        }

        if let (Some(table), Some(ddl)) = (
            snapshot.tables.get_mut(table_name),
            parsed.get(table_name.as_str()),
        ) {
            for check in &ddl.checks {
                table.check_constraints.insert(check.name.clone(), check.clone());
            }
        }
    }

    for v in raw_views {
        let sql = v.sql.unwrap_or_default();
        let definition = parse_view_sql(&sql)
            .ok_or_else(|| SerializerError::decode("sqlite view definition", sql.clone()))?;
        snapshot.views.insert(
            v.name.clone(),
            View {
                columns: view_columns.remove(&v.name).unwrap_or_default(),
                definition: Some(definition),
                is_existing: false,
                name: v.name,
            },
        );
    }

    tracing::debug!(
        tables = snapshot.tables.len(),
        views = snapshot.views.len(),
        "introspected sqlite catalog"
    );
    Ok(snapshot)
}

/// Excludes SQLite internals, platform bookkeeping and the migrations table
pub fn system_table_filter(name: &str) -> bool {
    !name.starts_with("sqlite_")
        && !name.starts_with("_cf_")
        && !name.starts_with("_litestream_")
        && !name.starts_with("libsql_")
        && !name.starts_with("d1_")
        && name != "__drizzle_migrations"
}

/// Bring a stored default into the form the builder produces
fn normalize_default(raw: &str) -> String {
    let raw = raw.trim();
    let upper = raw.to_ascii_uppercase();
    if raw.parse::<f64>().is_ok() || raw.starts_with('\'') || raw.starts_with('(') {
        raw.to_string()
    } else if upper.starts_with("X'") {
        raw.to_string()
    } else if matches!(
        upper.as_str(),
        "CURRENT_TIME" | "CURRENT_DATE" | "CURRENT_TIMESTAMP"
    ) {
        format!("({upper})")
    } else {
        format!("({raw})")
    }
}

fn rule(value: Option<&str>) -> String {
    value
        .and_then(ReferentialAction::parse)
        .unwrap_or_default()
        .as_str()
        .to_string()
}

/// Select text of a `CREATE VIEW ... AS select` statement
pub fn parse_view_sql(sql: &str) -> Option<String> {
    let upper = sql.to_ascii_uppercase();
    let at = upper.find(" AS ")?;
    let definition = sql[at + 4..].trim().trim_end_matches(';').trim();
    (!definition.is_empty()).then(|| definition.to_string())
}

/// Key parts and `WHERE` clause of a `CREATE INDEX` statement
fn parse_index_sql(sql: &str) -> (Vec<String>, Option<String>) {
    let upper = sql.to_ascii_uppercase();
    let Some(on) = upper.find(" ON ") else {
        return (Vec::new(), None);
    };
    let Some(open) = sql[on..].find('(').map(|i| i + on) else {
        return (Vec::new(), None);
    };
    let Some((inner, close)) = balanced_parens(sql, open) else {
        return (Vec::new(), None);
    };
    let parts = split_top_level(inner, ",")
        .into_iter()
        .map(|p| p.trim().to_string())
        .collect();
    let rest = &sql[close + 1..];
    let where_clause = rest
        .to_ascii_uppercase()
        .find("WHERE")
        .map(|at| rest[at + 5..].trim().trim_end_matches(';').trim().to_string())
        .filter(|w| !w.is_empty());
    (parts, where_clause)
}

/// Facts recovered from a stored `CREATE TABLE` statement
#[derive(Debug, Default, PartialEq)]
struct TableDdl {
    autoincrement: HashSet<String>,
    generated: HashMap<String, Generated>,
    /// Column list to explicit constraint name
    unique_names: HashMap<Vec<String>, String>,
    checks: Vec<CheckConstraint>,
}

fn parse_table_sql(sql: &str) -> TableDdl {
    let mut ddl = TableDdl::default();
    let Some(body) = sql.find('(').and_then(|open| balanced_parens(sql, open)) else {
        return ddl;
    };

    for item in split_top_level(body.0, ",") {
        let item = item.trim();
        let upper = item.to_ascii_uppercase();

        if let Some(rest) = strip_keyword(item, "CONSTRAINT") {
            let Some((name, tail)) = leading_identifier(rest) else {
                continue;
            };
            let tail_upper = tail.to_ascii_uppercase();
            if tail_upper.starts_with("UNIQUE") {
                if let Some(open) = tail.find('(') {
                    if let Some((cols, _)) = balanced_parens(tail, open) {
                        let columns = split_top_level(cols, ",")
                            .into_iter()
                            .map(|c| unquote_identifier(c).to_string())
                            .collect();
                        ddl.unique_names.insert(columns, name);
                    }
                }
            } else if tail_upper.starts_with("CHECK") {
                if let Some(open) = tail.find('(') {
                    if let Some((value, _)) = balanced_parens(tail, open) {
                        ddl.checks.push(CheckConstraint {
                            name,
                            value: value.trim().to_string(),
                        });
                    }
                }
            }
            continue;
        }
        let first_word = upper
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default();
        if matches!(first_word, "PRIMARY" | "UNIQUE" | "CHECK" | "FOREIGN") {
            continue;
        }

        let Some((column, rest)) = leading_identifier(item) else {
            continue;
        };
        let rest_upper = rest.to_ascii_uppercase();
        if rest_upper.contains("AUTOINCREMENT") {
            ddl.autoincrement.insert(column.clone());
        }
        if let Some(at) = rest_upper.find(" AS ").or_else(|| rest_upper.find(" AS(")) {
            let after = at + 3;
            if let Some(open) = rest[after..].find('(').map(|i| i + after) {
                if let Some((expression, close)) = balanced_parens(rest, open) {
                    let mode = if rest_upper[close..].contains("STORED") {
                        GeneratedMode::Stored
                    } else {
                        GeneratedMode::Virtual
                    };
                    ddl.generated.insert(
                        column,
                        Generated {
                            expression: format!("({})", expression.trim()),
                            mode,
                        },
                    );
                }
            }
        }
    }
    ddl
}

fn strip_keyword<'a>(item: &'a str, keyword: &str) -> Option<&'a str> {
    let head = item.get(..keyword.len())?;
    let rest = &item[keyword.len()..];
    (head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace))
        .then(|| rest.trim_start())
}

/// First identifier of `item`, unquoted, and the text after it
fn leading_identifier(item: &str) -> Option<(String, &str)> {
    let item = item.trim_start();
    for (open, close) in [('"', '"'), ('`', '`'), ('[', ']')] {
        if let Some(rest) = item.strip_prefix(open) {
            let end = rest.find(close)?;
            return Some((rest[..end].to_string(), rest[end + 1..].trim_start()));
        }
    }
    let end = item
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(item.len());
    if end == 0 {
        return None;
    }
    Some((item[..end].to_string(), item[end..].trim_start()))
}

/// Catalog queries; per-object queries take the table or index name as their
/// only parameter
pub mod queries {
    pub const TABLES: &str = r#"
        SELECT name, sql
        FROM sqlite_master
        WHERE type = 'table'
        ORDER BY name COLLATE NOCASE
    "#;

    pub const VIEWS: &str = r#"
        SELECT name, sql
        FROM sqlite_master
        WHERE type = 'view'
        ORDER BY name COLLATE NOCASE
    "#;

    pub const COLUMNS: &str = r#"
        SELECT
            m.name AS "table",
            p.cid AS cid,
            p.name AS name,
            p.type AS column_type,
            p."notnull" AS not_null,
            p.dflt_value AS default_value,
            p.pk AS pk,
            p.hidden AS hidden
        FROM sqlite_master AS m
            JOIN pragma_table_xinfo(m.name) AS p
        WHERE m.type IN ('table', 'view')
        ORDER BY m.name, p.cid
    "#;

    pub const INDEX_LIST: &str = "SELECT name, \"unique\", origin FROM pragma_index_list(?)";

    pub const INDEX_INFO: &str = "SELECT seqno, name FROM pragma_index_info(?)";

    pub const INDEX_SQL: &str =
        "SELECT sql FROM sqlite_master WHERE type = 'index' AND name = ?";

    pub const FOREIGN_KEYS: &str = r#"
        SELECT id, seq, "table", "from", "to", on_update, on_delete
        FROM pragma_foreign_key_list(?)
    "#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_tables_are_filtered() {
        assert!(!system_table_filter("sqlite_sequence"));
        assert!(!system_table_filter("__drizzle_migrations"));
        assert!(!system_table_filter("_cf_KV"));
        assert!(system_table_filter("users"));
    }

    #[test]
    fn view_definition_follows_as() {
        assert_eq!(
            parse_view_sql("CREATE VIEW `active` AS select * from `users` where `active` = 1;")
                .as_deref(),
            Some("select * from `users` where `active` = 1")
        );
        assert_eq!(parse_view_sql("CREATE VIEW broken"), None);
    }

    #[test]
    fn defaults_match_builder_formatting() {
        assert_eq!(normalize_default("42"), "42");
        assert_eq!(normalize_default("'abc'"), "'abc'");
        assert_eq!(normalize_default("CURRENT_TIMESTAMP"), "(CURRENT_TIMESTAMP)");
        assert_eq!(normalize_default("(unixepoch())"), "(unixepoch())");
        assert_eq!(normalize_default("true"), "(true)");
    }

    #[test]
    fn table_sql_yields_generated_autoincrement_and_constraints() {
        let ddl = parse_table_sql(
            "CREATE TABLE `orders` (\n\
             \t`id` integer PRIMARY KEY AUTOINCREMENT NOT NULL,\n\
             \t`qty` integer,\n\
             \t`double_qty` integer GENERATED ALWAYS AS ((`qty` * 2)) STORED,\n\
             \t`label` text GENERATED ALWAYS AS (upper(`name`)) VIRTUAL,\n\
             \tCONSTRAINT `orders_qty_label_key` UNIQUE(`qty`,`label`),\n\
             \tCONSTRAINT `qty_positive` CHECK(`qty` > 0 and `label` != 'a,b')\n\
             );",
        );
        assert!(ddl.autoincrement.contains("id"));
        assert_eq!(ddl.autoincrement.len(), 1);
        assert_eq!(
            ddl.generated["double_qty"],
            Generated {
                expression: "((`qty` * 2))".into(),
                mode: GeneratedMode::Stored,
            }
        );
        assert_eq!(ddl.generated["label"].mode, GeneratedMode::Virtual);
        assert_eq!(
            ddl.unique_names[&vec!["qty".to_string(), "label".to_string()]],
            "orders_qty_label_key"
        );
        assert_eq!(ddl.checks[0].name, "qty_positive");
        assert_eq!(ddl.checks[0].value, "`qty` > 0 and `label` != 'a,b'");
    }

    #[test]
    fn index_sql_splits_parts_and_where() {
        let (parts, where_clause) = parse_index_sql(
            "CREATE INDEX `users_lower_email_idx` ON `users` (lower(`email`), `name`) WHERE `deleted` = 0",
        );
        assert_eq!(parts, vec!["lower(`email`)", "`name`"]);
        assert_eq!(where_clause.as_deref(), Some("`deleted` = 0"));
    }

    #[test]
    fn introspects_through_a_catalog_closure() {
        use crate::catalog::Row;
        use drizzle_types::Dialect;
        use serde_json::json;

        fn row(v: Value) -> Row {
            match v {
                Value::Object(map) => map,
                _ => Row::new(),
            }
        }

        let mut db = |sql: &str, params: &[Value]| -> Result<Vec<Row>, SerializerError> {
            let rows = if sql == queries::TABLES {
                vec![json!({"name": "users", "sql": "CREATE TABLE `users` (`id` integer PRIMARY KEY AUTOINCREMENT NOT NULL, `email` text)"})]
            } else if sql == queries::COLUMNS {
                vec![
                    json!({"table": "users", "cid": 0, "name": "id", "column_type": "INTEGER", "not_null": 1, "default_value": null, "pk": 1, "hidden": 0}),
                    json!({"table": "users", "cid": 1, "name": "email", "column_type": "TEXT", "not_null": 0, "default_value": "'x'", "pk": 0, "hidden": 0}),
                ]
            } else if sql == queries::INDEX_LIST && params == [json!("users")] {
                vec![json!({"name": "sqlite_autoindex_users_1", "unique": 1, "origin": "u"})]
            } else if sql == queries::INDEX_INFO {
                vec![json!({"seqno": 0, "name": "email"})]
            } else {
                Vec::new()
            };
            Ok(rows.into_iter().map(row).collect())
        };

        let snapshot = introspect(&mut db, &IntrospectOptions::new(Dialect::SQLite)).unwrap();
        let users = &snapshot.tables["users"];
        assert!(users.columns["id"].primary_key);
        assert!(users.columns["id"].autoincrement);
        assert_eq!(users.columns["id"].sql_type, "integer");
        assert_eq!(users.columns["email"].default.as_deref(), Some("'x'"));
        assert_eq!(
            users.unique_constraints["users_email_unique"].columns,
            vec!["email"]
        );
    }
}
