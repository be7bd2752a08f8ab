//! MySQL catalog introspection
//!
//! Reads `information_schema` for one database and rebuilds the snapshot the
//! builder would have produced for the same schema.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::snapshot::{
    CheckConstraint, Column, ForeignKey, Index, MySqlSnapshot, PrimaryKey, Table,
    UniqueConstraint, View,
};
use crate::builder::pk_name;
use crate::catalog::{CatalogQuery, IntrospectOptions, fetch, flag, int, text};
use crate::error::SerializerError;
use crate::schema::{GeneratedMode, ReferentialAction};
use crate::snapshot::Generated;
use crate::utils::quote_literal;

#[derive(Debug, Deserialize)]
struct RawDatabase {
    #[serde(default, deserialize_with = "text")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    name: String,
    #[serde(default, deserialize_with = "text")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "text")]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawColumn {
    table: String,
    name: String,
    column_type: String,
    #[serde(default, deserialize_with = "flag")]
    is_nullable: bool,
    #[serde(default, deserialize_with = "text")]
    default_value: Option<String>,
    #[serde(default, deserialize_with = "text")]
    extra: Option<String>,
    #[serde(default, deserialize_with = "text")]
    comment: Option<String>,
    #[serde(default, deserialize_with = "text")]
    generation_expression: Option<String>,
    #[serde(default, deserialize_with = "int")]
    ordinal_position: i64,
}

#[derive(Debug, Deserialize)]
struct RawIndexColumn {
    table: String,
    name: String,
    #[serde(default, deserialize_with = "text")]
    column_name: Option<String>,
    #[serde(default, deserialize_with = "text")]
    expression: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    non_unique: bool,
    #[serde(default, deserialize_with = "text")]
    index_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawKeyColumn {
    table: String,
    name: String,
    column_name: String,
}

#[derive(Debug, Deserialize)]
struct RawForeignKey {
    table: String,
    name: String,
    column_name: String,
    referenced_table: String,
    referenced_column: String,
    #[serde(default, deserialize_with = "text")]
    update_rule: Option<String>,
    #[serde(default, deserialize_with = "text")]
    delete_rule: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCheck {
    table: String,
    name: String,
    clause: String,
}

#[derive(Debug, Deserialize)]
struct RawView {
    name: String,
    #[serde(default, deserialize_with = "text")]
    definition: Option<String>,
    #[serde(default, deserialize_with = "text")]
    check_option: Option<String>,
    #[serde(default, deserialize_with = "text")]
    security_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCreateView {
    #[serde(rename = "Create View", default, deserialize_with = "text")]
    create_view: Option<String>,
}

/// Read one database into a snapshot
///
/// The database is the first entry of `options.schemas`, or the connection's
/// current database when none is given.
pub fn introspect(
    db: &mut impl CatalogQuery,
    options: &IntrospectOptions,
) -> Result<MySqlSnapshot, SerializerError> {
    let database = match options.schemas.first() {
        Some(name) => name.clone(),
        None => fetch::<RawDatabase>(db, queries::CURRENT_DATABASE, &[])?
            .into_iter()
            .find_map(|d| d.name)
            .ok_or_else(|| {
                SerializerError::Config(
                    "no database selected; pass the database name as the introspection schema"
                        .to_string(),
                )
            })?,
    };
    let params = [Value::from(database.clone())];
    let mut snapshot = MySqlSnapshot::new();

    let mut view_names: HashSet<String> = HashSet::new();
    for t in fetch::<RawTable>(db, queries::TABLES, &params)? {
        if t.kind.as_deref() == Some("VIEW") {
            view_names.insert(t.name);
            continue;
        }
        if !options.includes_table(&t.name) {
            continue;
        }
        let mut table = Table::new(&t.name);
        table.description = t.comment.filter(|c| !c.is_empty());
        snapshot.tables.insert(t.name, table);
    }

    let index_rows = fetch::<RawIndexColumn>(db, queries::INDEXES, &params)?;
    let mut view_columns: BTreeMap<String, BTreeMap<String, Column>> = BTreeMap::new();
    let mut serial_columns: HashSet<(String, String)> = HashSet::new();

    for c in fetch::<RawColumn>(db, queries::COLUMNS, &params)? {
        let unique_indexes = index_rows
            .iter()
            .filter(|i| {
                i.table == c.table
                    && !i.non_unique
                    && i.column_name.as_deref() == Some(c.name.as_str())
            })
            .count();
        let column = process_column(&c, unique_indexes, &mut snapshot);
        if column.sql_type == "serial" {
            serial_columns.insert((c.table.clone(), column.name.clone()));
        }
        if let Some(table) = snapshot.tables.get_mut(&c.table) {
            table.columns.insert(column.name.clone(), column);
        } else if view_names.contains(&c.table) {
            view_columns
                .entry(c.table.clone())
                .or_default()
                .insert(column.name.clone(), column);
        }
    }

    for pk in group_key_columns(fetch::<RawKeyColumn>(db, queries::PRIMARY_KEYS, &params)?) {
        let Some(table) = snapshot.tables.get_mut(&pk.0) else {
            continue;
        };
        if let [single] = pk.2.as_slice() {
            if let Some(column) = table.columns.get_mut(single) {
                column.primary_key = true;
                column.not_null = true;
            }
            continue;
        }
        let name = pk_name(&pk.0, &pk.2);
        table.composite_primary_keys.insert(
            name.clone(),
            PrimaryKey {
                name,
                columns: pk.2,
            },
        );
    }

    for fk in fetch::<RawForeignKey>(db, queries::FOREIGN_KEYS, &params)? {
        let Some(table) = snapshot.tables.get_mut(&fk.table) else {
            continue;
        };
        let entry = table
            .foreign_keys
            .entry(fk.name.clone())
            .or_insert_with(|| ForeignKey {
                name: fk.name.clone(),
                table_from: fk.table.clone(),
                columns_from: Vec::new(),
                table_to: fk.referenced_table.clone(),
                columns_to: Vec::new(),
                on_update: Some(rule(fk.update_rule.as_deref())),
                on_delete: Some(rule(fk.delete_rule.as_deref())),
            });
        if !entry.columns_from.contains(&fk.column_name) {
            entry.columns_from.push(fk.column_name);
        }
        if !entry.columns_to.contains(&fk.referenced_column) {
            entry.columns_to.push(fk.referenced_column);
        }
    }

    for row in index_rows {
        let Some(table) = snapshot.tables.get_mut(&row.table) else {
            continue;
        };
        let (column, is_expression) = match (&row.column_name, &row.expression) {
            (Some(name), _) => (name.clone(), false),
            (None, Some(expr)) => (expr.clone(), true),
            (None, None) => continue,
        };
        // `serial` implies a unique key named after its column
        if !row.non_unique
            && row.name == column
            && serial_columns.contains(&(row.table.clone(), column.clone()))
        {
            continue;
        }
        if is_expression {
            snapshot.internal.mark_expression(&row.table, &row.name, &column);
        }
        if !row.non_unique {
            table
                .unique_constraints
                .entry(row.name.clone())
                .or_insert_with(|| UniqueConstraint {
                    name: row.name.clone(),
                    columns: Vec::new(),
                })
                .columns
                .push(column);
            continue;
        }
        // Implicit index backing a foreign key
        if table.foreign_keys.contains_key(&row.name) {
            continue;
        }
        table
            .indexes
            .entry(row.name.clone())
            .or_insert_with(|| Index {
                name: row.name.clone(),
                columns: Vec::new(),
                is_unique: false,
                using: row
                    .index_type
                    .as_deref()
                    .filter(|t| !t.eq_ignore_ascii_case("btree"))
                    .map(str::to_ascii_lowercase),
                algorithm: None,
                lock: None,
            })
            .columns
            .push(column);
    }

    for check in fetch::<RawCheck>(db, queries::CHECKS, &params)? {
        if let Some(table) = snapshot.tables.get_mut(&check.table) {
            table.check_constraints.insert(
                check.name.clone(),
                CheckConstraint {
                    name: check.name,
                    value: check.clause,
                },
            );
        }
    }

    for v in fetch::<RawView>(db, queries::VIEWS, &params)? {
        let show = format!("SHOW CREATE VIEW `{}`", v.name.replace('`', "``"));
        let algorithm = fetch::<RawCreateView>(db, &show, &[])?
            .into_iter()
            .find_map(|r| r.create_view)
            .and_then(|sql| view_algorithm(&sql))
            .unwrap_or_else(|| "undefined".to_string());
        let with_check_option = v
            .check_option
            .filter(|o| !o.eq_ignore_ascii_case("NONE"))
            .map(|o| o.to_ascii_lowercase());
        snapshot.views.insert(
            v.name.clone(),
            View {
                columns: view_columns.remove(&v.name).unwrap_or_default(),
                definition: v.definition,
                is_existing: false,
                algorithm,
                sql_security: v
                    .security_type
                    .map(|s| s.to_ascii_lowercase())
                    .unwrap_or_else(|| "definer".to_string()),
                with_check_option,
                name: v.name,
            },
        );
    }

    tracing::debug!(
        database = %database,
        tables = snapshot.tables.len(),
        views = snapshot.views.len(),
        "introspected mysql catalog"
    );
    Ok(snapshot)
}

fn process_column(c: &RawColumn, unique_indexes: usize, snapshot: &mut MySqlSnapshot) -> Column {
    let extra = c.extra.as_deref().unwrap_or_default().to_ascii_lowercase();
    let autoincrement = extra.contains("auto_increment");
    let not_null = !c.is_nullable;

    let mut sql_type = c.column_type.clone();
    if sql_type == "bigint unsigned" && not_null && autoincrement && unique_indexes == 1 {
        sql_type = "serial".to_string();
    } else if sql_type == "decimal(10,0)" {
        sql_type = "decimal".to_string();
    }

    let mut column = Column::new(&c.name, sql_type);
    column.not_null = not_null;
    column.autoincrement = autoincrement;
    column.ordinal_position = usize::try_from(c.ordinal_position.max(1) - 1).unwrap_or_default();
    column.on_update = extra.contains("on update current_timestamp").then_some(true);
    column.description = c.comment.clone().filter(|s| !s.is_empty());

    if let Some(expression) = c.generation_expression.as_deref().filter(|e| !e.is_empty()) {
        let mode = if extra.contains("stored generated") {
            GeneratedMode::Stored
        } else {
            GeneratedMode::Virtual
        };
        column.generated = Some(Generated {
            expression: expression.replace("\\'", "'"),
            mode,
        });
    }

    if let Some(default) = &c.default_value {
        if extra.contains("default_generated") {
            snapshot.internal.mark_default_expression(&c.table, &c.name);
            column.default = Some(format!("({})", strip_charset_introducer(default)));
        } else {
            column.default = Some(normalize_default(default, &column.sql_type));
        }
    }
    column
}

static NUMERIC_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[\d.]+(?:e-?\d+)?$").expect("numeric literal pattern is valid")
});

static CHARSET_INTRODUCER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_[A-Za-z0-9]+\\'((?:[^\\]|\\[^'])*)\\'").expect("charset introducer pattern is valid")
});

static VIEW_ALGORITHM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ALGORITHM\s*=\s*(\w+)").expect("view algorithm pattern is valid")
});

/// Literal defaults as the builder formats them
fn normalize_default(default: &str, sql_type: &str) -> String {
    let textual = ["decimal", "char", "varchar"]
        .iter()
        .any(|t| sql_type.starts_with(t));
    if NUMERIC_LITERAL.is_match(default) && !textual {
        default.to_string()
    } else {
        quote_literal(default)
    }
}

/// `_utf8mb4\'abc\'` to `'abc'`
fn strip_charset_introducer(expr: &str) -> String {
    CHARSET_INTRODUCER
        .replace_all(expr, |caps: &regex::Captures<'_>| format!("'{}'", &caps[1]))
        .into_owned()
}

fn view_algorithm(create_sql: &str) -> Option<String> {
    VIEW_ALGORITHM
        .captures(create_sql)
        .map(|c| c[1].to_ascii_lowercase())
}

fn rule(value: Option<&str>) -> String {
    value
        .and_then(ReferentialAction::parse)
        .unwrap_or_default()
        .as_str()
        .to_string()
}

/// Group key-column rows into `(table, constraint, columns)` keeping row order
fn group_key_columns(rows: Vec<RawKeyColumn>) -> Vec<(String, String, Vec<String>)> {
    let mut out: Vec<(String, String, Vec<String>)> = Vec::new();
    for row in rows {
        match out
            .iter_mut()
            .find(|(t, n, _)| *t == row.table && *n == row.name)
        {
            Some(entry) => entry.2.push(row.column_name),
            None => out.push((row.table, row.name, vec![row.column_name])),
        }
    }
    out
}

/// Catalog queries; every one takes the database name as its only parameter
pub mod queries {
    pub const CURRENT_DATABASE: &str = "SELECT DATABASE() AS name";

    pub const TABLES: &str = r#"
        SELECT table_name AS name, table_type AS kind, table_comment AS comment
        FROM information_schema.tables
        WHERE table_schema = ?
          AND table_name != '__drizzle_migrations'
        ORDER BY table_name
    "#;

    pub const COLUMNS: &str = r#"
        SELECT
            table_name AS `table`,
            column_name AS name,
            column_type AS column_type,
            is_nullable = 'YES' AS is_nullable,
            column_default AS default_value,
            extra AS extra,
            column_comment AS comment,
            generation_expression AS generation_expression,
            ordinal_position AS ordinal_position
        FROM information_schema.columns
        WHERE table_schema = ?
          AND table_name != '__drizzle_migrations'
        ORDER BY table_name, ordinal_position
    "#;

    pub const INDEXES: &str = r#"
        SELECT
            table_name AS `table`,
            index_name AS name,
            column_name AS column_name,
            expression AS expression,
            non_unique AS non_unique,
            index_type AS index_type
        FROM information_schema.statistics
        WHERE table_schema = ?
          AND index_name != 'PRIMARY'
        ORDER BY table_name, index_name, seq_in_index
    "#;

    pub const PRIMARY_KEYS: &str = r#"
        SELECT t.table_name AS `table`, t.constraint_name AS name, k.column_name AS column_name
        FROM information_schema.table_constraints t
        JOIN information_schema.key_column_usage k
          ON k.constraint_name = t.constraint_name
         AND k.table_schema = t.table_schema
         AND k.table_name = t.table_name
        WHERE t.constraint_type = 'PRIMARY KEY'
          AND t.table_schema = ?
        ORDER BY t.table_name, k.ordinal_position
    "#;

    pub const FOREIGN_KEYS: &str = r#"
        SELECT
            kcu.table_name AS `table`,
            kcu.constraint_name AS name,
            kcu.column_name AS column_name,
            kcu.referenced_table_name AS referenced_table,
            kcu.referenced_column_name AS referenced_column,
            rc.update_rule AS update_rule,
            rc.delete_rule AS delete_rule
        FROM information_schema.key_column_usage kcu
        JOIN information_schema.referential_constraints rc
          ON rc.constraint_name = kcu.constraint_name
         AND rc.constraint_schema = kcu.constraint_schema
        WHERE kcu.table_schema = ?
          AND kcu.referenced_table_name IS NOT NULL
        ORDER BY kcu.table_name, kcu.constraint_name, kcu.ordinal_position
    "#;

    pub const CHECKS: &str = r#"
        SELECT tc.table_name AS `table`, tc.constraint_name AS name, cc.check_clause AS clause
        FROM information_schema.table_constraints tc
        JOIN information_schema.check_constraints cc
          ON cc.constraint_name = tc.constraint_name
         AND cc.constraint_schema = tc.constraint_schema
        WHERE tc.constraint_schema = ?
          AND tc.constraint_type = 'CHECK'
    "#;

    pub const VIEWS: &str = r#"
        SELECT table_name AS name, view_definition AS definition, check_option AS check_option,
               security_type AS security_type
        FROM information_schema.views
        WHERE table_schema = ?
        ORDER BY table_name
    "#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_defaults_stay_bare_except_on_text_types() {
        assert_eq!(normalize_default("42", "int"), "42");
        assert_eq!(normalize_default("1.5", "double"), "1.5");
        assert_eq!(normalize_default("42", "varchar(10)"), "'42'");
        assert_eq!(normalize_default("10", "decimal(10,2)"), "'10'");
        assert_eq!(normalize_default("it's", "text"), "'it''s'");
    }

    #[test]
    fn charset_introducers_are_stripped() {
        assert_eq!(strip_charset_introducer(r"_utf8mb4\'abc\'"), "'abc'");
        assert_eq!(strip_charset_introducer("now()"), "now()");
    }

    #[test]
    fn view_algorithm_is_read_from_create_statement() {
        let sql = "CREATE ALGORITHM=MERGE DEFINER=`root`@`%` SQL SECURITY DEFINER VIEW `v` AS select 1";
        assert_eq!(view_algorithm(sql).as_deref(), Some("merge"));
    }

    #[test]
    fn referential_rules_are_lowercased() {
        assert_eq!(rule(Some("CASCADE")), "cascade");
        assert_eq!(rule(Some("NO ACTION")), "no action");
        assert_eq!(rule(None), "no action");
    }
}
