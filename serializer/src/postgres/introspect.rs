//! PostgreSQL catalog introspection
//!
//! Reads `pg_catalog` and `information_schema` through a [`CatalogQuery`] and
//! rebuilds the snapshot the builder would have produced for the same schema.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use drizzle_types::postgres::{is_system_namespace, is_system_role, serial_for};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::snapshot::{
    CheckConstraint, Column, Enum, ForeignKey, Identity, Index, IndexColumn, PgSnapshot, Policy,
    PrimaryKey, Role, Sequence, Table, UniqueConstraint, View,
};
use crate::catalog::{CatalogQuery, IntrospectOptions, fetch, flag, int, string_list, text};
use crate::error::SerializerError;
use crate::schema::{GeneratedMode, IdentityKind, PolicyAs, PolicyFor, ReferentialAction};
use crate::snapshot::Generated;
use crate::utils::{strip_outer_parens, unquote_identifier};

// =============================================================================
// Raw rows
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawSchema {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    schema: String,
    name: String,
    #[serde(default, deserialize_with = "flag")]
    is_rls_enabled: bool,
    #[serde(default, deserialize_with = "text")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawColumn {
    schema: String,
    table: String,
    name: String,
    column_type: String,
    #[serde(default, deserialize_with = "text")]
    type_schema: Option<String>,
    #[serde(default, deserialize_with = "text")]
    type_kind: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    not_null: bool,
    #[serde(default, deserialize_with = "text")]
    default_value: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    is_identity: bool,
    #[serde(default, deserialize_with = "text")]
    identity_type: Option<String>,
    #[serde(default, deserialize_with = "text")]
    identity_start: Option<String>,
    #[serde(default, deserialize_with = "text")]
    identity_increment: Option<String>,
    #[serde(default, deserialize_with = "text")]
    identity_maximum: Option<String>,
    #[serde(default, deserialize_with = "text")]
    identity_minimum: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    identity_cycle: bool,
    #[serde(default, deserialize_with = "flag")]
    is_generated: bool,
    #[serde(default, deserialize_with = "text")]
    generated_expression: Option<String>,
    #[serde(default, deserialize_with = "int")]
    ordinal_position: i64,
    #[serde(default, deserialize_with = "text")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEnum {
    schema: String,
    name: String,
    #[serde(default, deserialize_with = "string_list")]
    values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSequence {
    schema: String,
    name: String,
    #[serde(default, deserialize_with = "text")]
    start_value: Option<String>,
    #[serde(default, deserialize_with = "text")]
    min_value: Option<String>,
    #[serde(default, deserialize_with = "text")]
    max_value: Option<String>,
    #[serde(default, deserialize_with = "text")]
    increment: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    cycle: bool,
    #[serde(default, deserialize_with = "text")]
    cache_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConstraint {
    schema: String,
    table: String,
    name: String,
    #[serde(default, deserialize_with = "string_list")]
    columns: Vec<String>,
    #[serde(default, deserialize_with = "flag")]
    nulls_not_distinct: bool,
}

#[derive(Debug, Deserialize)]
struct RawForeignKey {
    schema: String,
    table: String,
    name: String,
    #[serde(default, deserialize_with = "string_list")]
    columns: Vec<String>,
    schema_to: String,
    table_to: String,
    #[serde(default, deserialize_with = "string_list")]
    columns_to: Vec<String>,
    #[serde(default)]
    on_update: String,
    #[serde(default)]
    on_delete: String,
}

#[derive(Debug, Deserialize)]
struct RawCheck {
    schema: String,
    table: String,
    name: String,
    expression: String,
}

#[derive(Debug, Deserialize)]
struct RawIndex {
    schema: String,
    table: String,
    name: String,
    #[serde(default, deserialize_with = "flag")]
    is_unique: bool,
    #[serde(default, deserialize_with = "flag")]
    is_primary: bool,
    method: String,
    #[serde(default, deserialize_with = "string_list")]
    columns: Vec<String>,
    #[serde(default, deserialize_with = "text")]
    where_clause: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawView {
    schema: String,
    name: String,
    #[serde(default, deserialize_with = "text")]
    definition: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    is_materialized: bool,
    #[serde(default, deserialize_with = "text")]
    tablespace: Option<String>,
    #[serde(default, deserialize_with = "text")]
    using: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPolicy {
    schema: String,
    table: String,
    name: String,
    #[serde(default)]
    as_clause: String,
    #[serde(default)]
    for_clause: String,
    #[serde(default, deserialize_with = "string_list")]
    to: Vec<String>,
    #[serde(default, deserialize_with = "text")]
    using: Option<String>,
    #[serde(default, deserialize_with = "text")]
    with_check: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRole {
    name: String,
    #[serde(default, deserialize_with = "flag")]
    create_db: bool,
    #[serde(default, deserialize_with = "flag")]
    create_role: bool,
    #[serde(default, deserialize_with = "flag")]
    inherit: bool,
}

// =============================================================================
// Introspection
// =============================================================================

/// Read the catalog into a snapshot
///
/// Only the schemas named in `options.schemas` are read. System namespaces
/// and system roles are always skipped.
pub fn introspect(
    db: &mut impl CatalogQuery,
    options: &IntrospectOptions,
) -> Result<PgSnapshot, SerializerError> {
    let schemas: Vec<String> = options
        .schemas
        .iter()
        .filter(|s| !is_system_namespace(s))
        .cloned()
        .collect();
    let params = [Value::from(schemas.clone())];
    let mut snapshot = PgSnapshot::new();

    for s in fetch::<RawSchema>(db, queries::SCHEMAS, &params)? {
        if s.name != "public" && !is_system_namespace(&s.name) {
            snapshot.schemas.insert(s.name.clone(), s.name);
        }
    }

    for t in fetch::<RawTable>(db, queries::TABLES, &params)? {
        if is_system_namespace(&t.schema) || !options.includes_table(&t.name) {
            continue;
        }
        let mut table = Table::new(&t.name, table_schema(&t.schema));
        table.is_rls_enabled = t.is_rls_enabled;
        table.description = t.description;
        snapshot.tables.insert(PgSnapshot::key(&t.schema, &t.name), table);
    }

    for e in fetch::<RawEnum>(db, queries::ENUMS, &params)? {
        snapshot.enums.insert(
            PgSnapshot::key(&e.schema, &e.name),
            Enum {
                name: e.name,
                schema: e.schema,
                values: e.values,
            },
        );
    }

    let raw_sequences = fetch::<RawSequence>(db, queries::SEQUENCES, &params)?;
    let cache_of = |schema: &str, name: &str| {
        raw_sequences
            .iter()
            .find(|s| s.schema == schema && s.name == name)
            .and_then(|s| s.cache_value.clone())
    };

    let mut owned_sequences: HashSet<(String, String)> = HashSet::new();
    for c in fetch::<RawColumn>(db, queries::COLUMNS, &params)? {
        let key = PgSnapshot::key(&c.schema, &c.table);
        let Some(table) = snapshot.tables.get_mut(&key) else {
            continue;
        };
        let (column, owned) = process_column(&c, &cache_of);
        if let Some(seq) = owned {
            owned_sequences.insert((c.schema.clone(), seq));
        }
        table.columns.insert(column.name.clone(), column);
    }

    for s in &raw_sequences {
        if owned_sequences.contains(&(s.schema.clone(), s.name.clone())) {
            continue;
        }
        snapshot
            .sequences
            .insert(PgSnapshot::key(&s.schema, &s.name), process_sequence(s));
    }

    let mut constraint_names: HashSet<(String, String)> = HashSet::new();

    for pk in fetch::<RawConstraint>(db, queries::PRIMARY_KEYS, &params)? {
        let key = PgSnapshot::key(&pk.schema, &pk.table);
        constraint_names.insert((key.clone(), pk.name.clone()));
        let Some(table) = snapshot.tables.get_mut(&key) else {
            continue;
        };
        if let [single] = pk.columns.as_slice() {
            if let Some(column) = table.columns.get_mut(single) {
                column.primary_key = true;
                column.not_null = true;
            }
            continue;
        }
        table.composite_primary_keys.insert(
            pk.name.clone(),
            PrimaryKey {
                name: pk.name,
                columns: pk.columns,
            },
        );
    }

    for u in fetch::<RawConstraint>(db, queries::UNIQUES, &params)? {
        let key = PgSnapshot::key(&u.schema, &u.table);
        constraint_names.insert((key.clone(), u.name.clone()));
        let Some(table) = snapshot.tables.get_mut(&key) else {
            continue;
        };
        if let [single] = u.columns.as_slice()
            && let Some(column) = table.columns.get_mut(single)
            && !column.is_unique
        {
            column.is_unique = true;
            column.unique_name = Some(u.name);
            column.nulls_not_distinct = u.nulls_not_distinct;
            continue;
        }
        table.unique_constraints.insert(
            u.name.clone(),
            UniqueConstraint {
                name: u.name,
                columns: u.columns,
                nulls_not_distinct: u.nulls_not_distinct,
            },
        );
    }

    for fk in fetch::<RawForeignKey>(db, queries::FOREIGN_KEYS, &params)? {
        let key = PgSnapshot::key(&fk.schema, &fk.table);
        let Some(table) = snapshot.tables.get_mut(&key) else {
            continue;
        };
        table.foreign_keys.insert(
            fk.name.clone(),
            ForeignKey {
                name: fk.name,
                table_from: fk.table,
                columns_from: fk.columns,
                table_to: fk.table_to,
                schema_to: Some(fk.schema_to),
                columns_to: fk.columns_to,
                on_update: Some(action_from_code(&fk.on_update).as_str().to_string()),
                on_delete: Some(action_from_code(&fk.on_delete).as_str().to_string()),
            },
        );
    }

    for check in fetch::<RawCheck>(db, queries::CHECKS, &params)? {
        let key = PgSnapshot::key(&check.schema, &check.table);
        let Some(table) = snapshot.tables.get_mut(&key) else {
            continue;
        };
        table.check_constraints.insert(
            check.name.clone(),
            CheckConstraint {
                name: check.name,
                value: strip_outer_parens(&check.expression).to_string(),
            },
        );
    }

    for idx in fetch::<RawIndex>(db, queries::INDEXES, &params)? {
        let key = PgSnapshot::key(&idx.schema, &idx.table);
        if idx.is_primary || constraint_names.contains(&(key.clone(), idx.name.clone())) {
            continue;
        }
        let Some(table) = snapshot.tables.get_mut(&key) else {
            continue;
        };
        let columns = parse_index_columns(&idx.columns);
        for c in columns.iter().filter(|c| c.is_expression) {
            snapshot.internal.mark_expression(&key, &idx.name, &c.expression);
        }
        table.indexes.insert(
            idx.name.clone(),
            Index {
                name: idx.name,
                columns,
                is_unique: idx.is_unique,
                concurrently: false,
                method: idx.method,
                where_clause: idx.where_clause,
                with: BTreeMap::new(),
            },
        );
    }

    for p in fetch::<RawPolicy>(db, queries::POLICIES, &params)? {
        let key = PgSnapshot::key(&p.schema, &p.table);
        let Some(table) = snapshot.tables.get_mut(&key) else {
            continue;
        };
        let mut to = p.to;
        to.sort();
        table.policies.insert(
            p.name.clone(),
            Policy {
                name: p.name,
                as_: PolicyAs::parse(&p.as_clause).unwrap_or(PolicyAs::Permissive),
                for_: PolicyFor::parse(&p.for_clause).unwrap_or(PolicyFor::All),
                to,
                using: p.using,
                with_check: p.with_check,
                on: None,
            },
        );
    }

    for v in fetch::<RawView>(db, queries::VIEWS, &params)? {
        if !options.includes_table(&v.name) {
            continue;
        }
        let definition = v
            .definition
            .map(|d| d.trim().trim_end_matches(';').trim().to_string());
        snapshot.views.insert(
            PgSnapshot::key(&v.schema, &v.name),
            View {
                name: v.name,
                schema: table_schema(&v.schema),
                columns: BTreeMap::new(),
                definition,
                materialized: v.is_materialized,
                with: BTreeMap::new(),
                is_existing: false,
                with_no_data: None,
                using: v.using.filter(|u| v.is_materialized && u != "heap"),
                tablespace: v.tablespace,
            },
        );
    }

    for r in fetch::<RawRole>(db, queries::ROLES, &[])? {
        if is_system_role(&r.name) || !options.includes_role(&r.name) {
            continue;
        }
        snapshot.roles.insert(
            r.name.clone(),
            Role {
                name: r.name,
                create_db: r.create_db,
                create_role: r.create_role,
                inherit: r.inherit,
            },
        );
    }

    tracing::debug!(
        tables = snapshot.tables.len(),
        enums = snapshot.enums.len(),
        views = snapshot.views.len(),
        "introspected postgres catalog"
    );
    Ok(snapshot)
}

fn table_schema(schema: &str) -> String {
    if schema == "public" {
        String::new()
    } else {
        schema.to_string()
    }
}

/// Build a column; also returns the sequence it owns when it is a serial
fn process_column(
    raw: &RawColumn,
    cache_of: &impl Fn(&str, &str) -> Option<String>,
) -> (Column, Option<String>) {
    let mut column = Column::new(&raw.name, normalize_type(&raw.column_type));
    column.not_null = raw.not_null;
    column.ordinal_position = usize::try_from(raw.ordinal_position.max(1) - 1).unwrap_or_default();
    column.description = raw.description.clone();

    if raw.type_kind.as_deref() == Some("e") {
        let (base, array) = match column.sql_type.strip_suffix("[]") {
            Some(base) => (base.to_string(), "[]"),
            None => (column.sql_type.clone(), ""),
        };
        let simple = base.rsplit('.').next().unwrap_or(&base);
        column.sql_type = format!("{}{array}", unquote_identifier(simple));
        column.type_schema = raw.type_schema.clone();
    }

    let mut owned = None;
    if let Some(default) = &raw.default_value {
        match (extract_nextval_sequence(default), serial_for(&column.sql_type)) {
            (Some(seq), Some(serial)) if is_serial_expression(default, &raw.schema) => {
                column.sql_type = serial.to_string();
                owned = Some(seq);
            }
            _ => column.default = Some(normalize_default(default, &column.sql_type)),
        }
    }

    if raw.is_generated {
        column.generated = raw.generated_expression.as_ref().map(|expr| Generated {
            expression: strip_outer_parens(expr).to_string(),
            mode: GeneratedMode::Stored,
        });
    }

    if raw.is_identity {
        let name = format!("{}_{}_seq", raw.table, raw.name);
        let kind = match raw.identity_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("always") => IdentityKind::Always,
            _ => IdentityKind::ByDefault,
        };
        column.identity = Some(Identity {
            cache: cache_of(&raw.schema, &name).or_else(|| Some("1".to_string())),
            name: name.clone(),
            kind,
            increment: raw.identity_increment.clone(),
            min_value: raw.identity_minimum.clone(),
            max_value: raw.identity_maximum.clone(),
            start_with: raw.identity_start.clone(),
            cycle: raw.identity_cycle,
        });
        owned = Some(name);
    }

    (column, owned)
}

fn process_sequence(raw: &RawSequence) -> Sequence {
    Sequence {
        name: raw.name.clone(),
        schema: raw.schema.clone(),
        increment: raw.increment.clone().unwrap_or_else(|| "1".to_string()),
        min_value: raw.min_value.clone().unwrap_or_default(),
        max_value: raw.max_value.clone().unwrap_or_default(),
        start_with: raw.start_value.clone().unwrap_or_default(),
        cache: raw.cache_value.clone().unwrap_or_else(|| "1".to_string()),
        cycle: raw.cycle,
    }
}

/// Long catalog type names to the spelling the builder uses
fn normalize_type(raw: &str) -> String {
    const RENAMES: &[(&str, &str)] = &[
        ("character varying", "varchar"),
        ("timestamp without time zone", "timestamp"),
        ("time without time zone", "time"),
        ("bit varying", "varbit"),
        ("character", "char"),
    ];
    let lowered = raw.trim();
    for (long, short) in RENAMES {
        if let Some(rest) = lowered.strip_prefix(long) {
            return format!("{short}{rest}");
        }
    }
    lowered.to_string()
}

static CAST_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^('(?:[^']|'')*')::[\w\s".\[\]()]+$"#).expect("cast literal pattern is valid")
});

/// Drop the type cast the catalog appends to literal defaults
fn normalize_default(default: &str, sql_type: &str) -> String {
    let default = default.trim();
    let Some(captures) = CAST_LITERAL.captures(default) else {
        return default.to_string();
    };
    let literal = &captures[1];
    if sql_type == "json" || sql_type == "jsonb" {
        return format!("{literal}::{sql_type}");
    }
    let inner = &literal[1..literal.len() - 1];
    let numeric = ["smallint", "integer", "bigint", "real", "double precision", "numeric", "decimal"]
        .iter()
        .any(|t| sql_type.starts_with(t));
    if numeric && inner.parse::<f64>().is_ok() {
        inner.to_string()
    } else {
        literal.to_string()
    }
}

/// `nextval('seq'::regclass)` on a sequence in the column's own schema
fn is_serial_expression(expr: &str, schema: &str) -> bool {
    let prefix = if schema == "public" {
        String::new()
    } else {
        format!("{schema}.")
    };
    (expr.starts_with(&format!("nextval('{prefix}"))
        || expr.starts_with(&format!("nextval('\"{prefix}")))
        && (expr.ends_with("_seq'::regclass)") || expr.ends_with("_seq\"'::regclass)"))
}

/// Sequence name of a `nextval(...)` default, without schema or quotes
fn extract_nextval_sequence(expr: &str) -> Option<String> {
    let inner = expr
        .strip_prefix("nextval('")?
        .strip_suffix("'::regclass)")?;
    let name = match inner.rfind('.') {
        Some(pos) => &inner[pos + 1..],
        None => inner,
    };
    let name = name.trim_matches('"');
    (!name.is_empty()).then(|| name.to_string())
}

/// `pg_constraint` action codes
fn action_from_code(code: &str) -> ReferentialAction {
    match code {
        "r" => ReferentialAction::Restrict,
        "c" => ReferentialAction::Cascade,
        "n" => ReferentialAction::SetNull,
        "d" => ReferentialAction::SetDefault,
        other => ReferentialAction::parse(other).unwrap_or_default(),
    }
}

/// Parse the per-column output of `pg_get_indexdef(oid, n, true)`
fn parse_index_columns(cols: &[String]) -> Vec<IndexColumn> {
    cols.iter()
        .map(|c| {
            let trimmed = c.trim();
            let upper = trimmed.to_uppercase();
            let asc = !upper.contains(" DESC");
            let nulls = if upper.contains(" NULLS FIRST") {
                "first"
            } else if upper.contains(" NULLS LAST") || asc {
                "last"
            } else {
                "first"
            };

            let mut core = trimmed;
            for token in [" ASC", " DESC", " NULLS FIRST", " NULLS LAST"] {
                if let Some(pos) = upper.find(token) {
                    core = &trimmed[..pos.min(core.len())];
                }
            }
            let core = core.trim();

            let bare = !core.contains('(') && !core.contains("::");
            let parts: Vec<&str> = core.split_whitespace().collect();
            let (expression, opclass) = match parts.as_slice() {
                [name, opclass] if bare => (unquote_identifier(name).to_string(), Some(opclass.to_string())),
                _ => (unquote_identifier(core).to_string(), None),
            };
            let is_expression = !bare || expression.contains(' ');

            IndexColumn {
                expression: if is_expression { core.to_string() } else { expression },
                is_expression,
                asc,
                nulls: nulls.to_string(),
                opclass,
            }
        })
        .collect()
}

/// Catalog queries. `$1` is the array of schema names to read.
pub mod queries {
    pub const SCHEMAS: &str = r#"
SELECT nspname AS name
FROM pg_namespace
WHERE nspname = ANY($1::text[])
ORDER BY nspname
"#;

    pub const TABLES: &str = r#"
SELECT
    n.nspname AS schema,
    c.relname AS name,
    c.relrowsecurity AS is_rls_enabled,
    obj_description(c.oid, 'pg_class') AS description
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE c.relkind IN ('r', 'p')
  AND n.nspname = ANY($1::text[])
ORDER BY n.nspname, c.relname
"#;

    pub const COLUMNS: &str = r#"
SELECT
    c.table_schema AS schema,
    c.table_name AS table,
    c.column_name AS name,
    format_type(a.atttypid, a.atttypmod) AS column_type,
    tn.nspname AS type_schema,
    CASE WHEN t.typcategory = 'A' THEN et.typtype ELSE t.typtype END AS type_kind,
    c.is_nullable = 'NO' AS not_null,
    c.column_default AS default_value,
    c.is_identity = 'YES' AS is_identity,
    c.identity_generation AS identity_type,
    c.identity_start,
    c.identity_increment,
    c.identity_maximum,
    c.identity_minimum,
    c.identity_cycle = 'YES' AS identity_cycle,
    c.is_generated = 'ALWAYS' AS is_generated,
    c.generation_expression AS generated_expression,
    c.ordinal_position,
    col_description(cls.oid, a.attnum) AS description
FROM information_schema.columns c
JOIN pg_namespace ns ON ns.nspname = c.table_schema
JOIN pg_class cls ON cls.relname = c.table_name AND cls.relnamespace = ns.oid
JOIN pg_attribute a ON a.attrelid = cls.oid AND a.attname = c.column_name
JOIN pg_type t ON t.oid = a.atttypid
LEFT JOIN pg_type et ON et.oid = t.typelem
JOIN pg_namespace tn ON tn.oid = COALESCE(NULLIF(et.typnamespace, 0), t.typnamespace)
WHERE c.table_schema = ANY($1::text[])
ORDER BY c.table_schema, c.table_name, c.ordinal_position
"#;

    pub const ENUMS: &str = r#"
SELECT
    n.nspname AS schema,
    t.typname AS name,
    array_agg(e.enumlabel ORDER BY e.enumsortorder) AS values
FROM pg_type t
JOIN pg_enum e ON t.oid = e.enumtypid
JOIN pg_namespace n ON n.oid = t.typnamespace
WHERE n.nspname = ANY($1::text[])
GROUP BY n.nspname, t.typname
ORDER BY n.nspname, t.typname
"#;

    pub const SEQUENCES: &str = r#"
SELECT
    schemaname AS schema,
    sequencename AS name,
    start_value::text AS start_value,
    min_value::text AS min_value,
    max_value::text AS max_value,
    increment_by::text AS increment,
    cycle,
    cache_size::text AS cache_value
FROM pg_sequences
WHERE schemaname = ANY($1::text[])
ORDER BY schemaname, sequencename
"#;

    pub const PRIMARY_KEYS: &str = r#"
SELECT
    ns.nspname AS schema,
    tbl.relname AS table,
    con.conname AS name,
    array_agg(att.attname ORDER BY s.ord) AS columns
FROM pg_constraint con
JOIN pg_class tbl ON tbl.oid = con.conrelid
JOIN pg_namespace ns ON ns.oid = tbl.relnamespace
JOIN unnest(con.conkey) WITH ORDINALITY AS s(attnum, ord) ON TRUE
JOIN pg_attribute att ON att.attrelid = tbl.oid AND att.attnum = s.attnum
WHERE con.contype = 'p'
  AND ns.nspname = ANY($1::text[])
GROUP BY ns.nspname, tbl.relname, con.conname
ORDER BY ns.nspname, tbl.relname, con.conname
"#;

    pub const UNIQUES: &str = r#"
SELECT
    ns.nspname AS schema,
    tbl.relname AS table,
    con.conname AS name,
    array_agg(att.attname ORDER BY s.ord) AS columns,
    COALESCE(idx.indnullsnotdistinct, FALSE) AS nulls_not_distinct
FROM pg_constraint con
JOIN pg_class tbl ON tbl.oid = con.conrelid
JOIN pg_namespace ns ON ns.oid = tbl.relnamespace
LEFT JOIN pg_index idx ON idx.indexrelid = con.conindid
JOIN unnest(con.conkey) WITH ORDINALITY AS s(attnum, ord) ON TRUE
JOIN pg_attribute att ON att.attrelid = tbl.oid AND att.attnum = s.attnum
WHERE con.contype = 'u'
  AND ns.nspname = ANY($1::text[])
GROUP BY ns.nspname, tbl.relname, con.conname, idx.indnullsnotdistinct
ORDER BY ns.nspname, tbl.relname, con.conname
"#;

    pub const FOREIGN_KEYS: &str = r#"
SELECT
    ns.nspname AS schema,
    tbl.relname AS table,
    con.conname AS name,
    array_agg(src.attname ORDER BY s.ord) AS columns,
    ns_to.nspname AS schema_to,
    tbl_to.relname AS table_to,
    array_agg(dst.attname ORDER BY s.ord) AS columns_to,
    con.confupdtype::text AS on_update,
    con.confdeltype::text AS on_delete
FROM pg_constraint con
JOIN pg_class tbl ON tbl.oid = con.conrelid
JOIN pg_namespace ns ON ns.oid = tbl.relnamespace
JOIN pg_class tbl_to ON tbl_to.oid = con.confrelid
JOIN pg_namespace ns_to ON ns_to.oid = tbl_to.relnamespace
JOIN unnest(con.conkey) WITH ORDINALITY AS s(attnum, ord) ON TRUE
JOIN pg_attribute src ON src.attrelid = tbl.oid AND src.attnum = s.attnum
JOIN unnest(con.confkey) WITH ORDINALITY AS r(attnum, ord) ON r.ord = s.ord
JOIN pg_attribute dst ON dst.attrelid = tbl_to.oid AND dst.attnum = r.attnum
WHERE con.contype = 'f'
  AND ns.nspname = ANY($1::text[])
GROUP BY ns.nspname, tbl.relname, con.conname, ns_to.nspname, tbl_to.relname, con.confupdtype, con.confdeltype
ORDER BY ns.nspname, tbl.relname, con.conname
"#;

    pub const CHECKS: &str = r#"
SELECT
    ns.nspname AS schema,
    tbl.relname AS table,
    con.conname AS name,
    pg_get_expr(con.conbin, con.conrelid) AS expression
FROM pg_constraint con
JOIN pg_class tbl ON tbl.oid = con.conrelid
JOIN pg_namespace ns ON ns.oid = tbl.relnamespace
WHERE con.contype = 'c'
  AND ns.nspname = ANY($1::text[])
ORDER BY ns.nspname, tbl.relname, con.conname
"#;

    pub const INDEXES: &str = r#"
SELECT
    ns.nspname AS schema,
    tbl.relname AS table,
    idx.relname AS name,
    ix.indisunique AS is_unique,
    ix.indisprimary AS is_primary,
    am.amname AS method,
    array_agg(pg_get_indexdef(ix.indexrelid, s.n, true) ORDER BY s.n) AS columns,
    pg_get_expr(ix.indpred, ix.indrelid) AS where_clause
FROM pg_index ix
JOIN pg_class idx ON idx.oid = ix.indexrelid
JOIN pg_class tbl ON tbl.oid = ix.indrelid
JOIN pg_namespace ns ON ns.oid = tbl.relnamespace
JOIN pg_am am ON am.oid = idx.relam
JOIN generate_series(1, ix.indnkeyatts) AS s(n) ON TRUE
WHERE ns.nspname = ANY($1::text[])
GROUP BY ns.nspname, tbl.relname, idx.relname, ix.indisunique, ix.indisprimary, am.amname, ix.indpred, ix.indrelid
ORDER BY ns.nspname, tbl.relname, idx.relname
"#;

    pub const VIEWS: &str = r#"
SELECT
    schemaname AS schema,
    viewname AS name,
    definition,
    FALSE AS is_materialized,
    NULL AS tablespace,
    NULL AS using
FROM pg_views
WHERE schemaname = ANY($1::text[])
UNION ALL
SELECT
    m.schemaname AS schema,
    m.matviewname AS name,
    m.definition,
    TRUE AS is_materialized,
    m.tablespace,
    am.amname AS using
FROM pg_matviews m
JOIN pg_namespace n ON n.nspname = m.schemaname
JOIN pg_class c ON c.relname = m.matviewname AND c.relnamespace = n.oid
LEFT JOIN pg_am am ON am.oid = c.relam
WHERE m.schemaname = ANY($1::text[])
ORDER BY schema, name
"#;

    pub const POLICIES: &str = r#"
SELECT
    schemaname AS schema,
    tablename AS table,
    policyname AS name,
    upper(permissive) AS as_clause,
    upper(cmd) AS for_clause,
    roles AS to,
    qual AS using,
    with_check
FROM pg_policies
WHERE schemaname = ANY($1::text[])
ORDER BY schemaname, tablename, policyname
"#;

    pub const ROLES: &str = r#"
SELECT
    rolname AS name,
    rolcreatedb AS create_db,
    rolcreaterole AS create_role,
    rolinherit AS inherit
FROM pg_roles
ORDER BY rolname
"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nextval_defaults() {
        assert_eq!(
            extract_nextval_sequence("nextval('users_id_seq'::regclass)").as_deref(),
            Some("users_id_seq")
        );
        assert_eq!(
            extract_nextval_sequence("nextval('\"auth\".\"users_id_seq\"'::regclass)").as_deref(),
            Some("users_id_seq")
        );
        assert!(is_serial_expression("nextval('users_id_seq'::regclass)", "public"));
        assert!(is_serial_expression("nextval('auth.users_id_seq'::regclass)", "auth"));
        assert!(!is_serial_expression("nextval('other'::regclass)", "public"));
    }

    #[test]
    fn default_casts_are_dropped() {
        assert_eq!(normalize_default("'abc'::character varying", "varchar(20)"), "'abc'");
        assert_eq!(normalize_default("'{}'::jsonb", "jsonb"), "'{}'::jsonb");
        assert_eq!(normalize_default("'-1'::integer", "integer"), "-1");
        assert_eq!(normalize_default("'it''s'::text", "text"), "'it''s'");
        assert_eq!(normalize_default("now()", "timestamp"), "now()");
    }

    #[test]
    fn long_type_names_are_shortened() {
        assert_eq!(normalize_type("character varying(256)"), "varchar(256)");
        assert_eq!(normalize_type("timestamp without time zone"), "timestamp");
        assert_eq!(normalize_type("timestamp with time zone"), "timestamp with time zone");
        assert_eq!(normalize_type("character(2)"), "char(2)");
    }

    #[test]
    fn index_columns() {
        let cols = parse_index_columns(&[
            "email".to_string(),
            "created_at DESC".to_string(),
            "lower((email)::text)".to_string(),
            "name text_pattern_ops".to_string(),
        ]);
        assert_eq!(cols[0].expression, "email");
        assert!(!cols[0].is_expression);
        assert_eq!(cols[0].nulls, "last");
        assert!(!cols[1].asc);
        assert_eq!(cols[1].nulls, "first");
        assert_eq!(cols[1].expression, "created_at");
        assert!(cols[2].is_expression);
        assert_eq!(cols[3].opclass.as_deref(), Some("text_pattern_ops"));
        assert_eq!(cols[3].expression, "name");
    }

    #[test]
    fn action_codes() {
        assert_eq!(action_from_code("c"), ReferentialAction::Cascade);
        assert_eq!(action_from_code("a"), ReferentialAction::NoAction);
        assert_eq!(action_from_code("n"), ReferentialAction::SetNull);
    }
}
