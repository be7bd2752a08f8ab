//! Schema objects to PostgreSQL snapshot

use std::collections::{BTreeMap, HashMap, HashSet};

use drizzle_types::Dialect;
use drizzle_types::postgres::{
    IdentityRange, SEQUENCE_MAX, SEQUENCE_MIN, SEQUENCE_NEGATIVE_MIN,
};

use super::snapshot::{
    CheckConstraint, Column, Enum, ForeignKey, Identity, Index, IndexColumn, PgSnapshot, Policy,
    PrimaryKey, Role, Sequence, Table, UniqueConstraint, View,
};
use crate::builder::{
    BuildOptions, fk_name, format_default, index_name, merge_foreign_key_columns, pk_name,
    render_unbound, unique_name,
};
use crate::error::SerializerError;
use crate::extract::resolve_relations;
use crate::schema::{
    ColumnDef, GeneratedMode, IndexTarget, NullsOrder, PolicyAs, PolicyDef, PolicyFor,
    SchemaObjectSet, SequenceOptions, TableDef, ViewDef,
};
use crate::snapshot::Generated;

const DIALECT: Dialect = Dialect::PostgreSQL;

/// Build a PostgreSQL snapshot from extracted schema objects
pub fn build_snapshot(
    set: &SchemaObjectSet,
    options: &BuildOptions,
) -> Result<PgSnapshot, SerializerError> {
    let mut snapshot = PgSnapshot::new();
    snapshot.project_id = options.project_id.clone();

    let relations = resolve_relations(set);
    let mut indexes_in_schema: HashMap<String, HashSet<String>> = HashMap::new();

    for def in &set.tables {
        let schema = normalize_schema(def.schema.as_deref());
        let key = PgSnapshot::key(&schema, &def.name);
        let mut table = build_table(set, def, &schema, options, &mut indexes_in_schema, &mut snapshot)?;
        table.relations = relations.get(&def.name).cloned().unwrap_or_default();
        snapshot.tables.insert(key, table);
    }

    for e in &set.enums {
        let schema = e.schema.clone().unwrap_or_else(|| "public".to_string());
        snapshot.enums.insert(
            PgSnapshot::key(&schema, &e.name),
            Enum {
                name: e.name.clone(),
                schema,
                values: e.values.clone(),
            },
        );
    }

    for ns in &set.namespaces {
        if ns.name != "public" {
            snapshot.schemas.insert(ns.name.clone(), ns.name.clone());
        }
    }

    for seq in &set.sequences {
        let schema = seq.schema.clone().unwrap_or_else(|| "public".to_string());
        let sequence = sequence_with_defaults(&seq.name, &schema, &seq.options);
        snapshot
            .sequences
            .insert(PgSnapshot::key(&schema, &seq.name), sequence);
    }

    for role in &set.roles {
        if role.existing {
            continue;
        }
        snapshot.roles.insert(
            role.name.clone(),
            Role {
                name: role.name.clone(),
                create_db: role.create_db.unwrap_or(false),
                create_role: role.create_role.unwrap_or(false),
                inherit: role.inherit.unwrap_or(true),
            },
        );
    }

    for def in &set.policies {
        attach_standalone_policy(set, def, options, &mut snapshot)?;
    }

    for def in set.all_views() {
        let schema = def.schema.clone().unwrap_or_else(|| "public".to_string());
        let key = PgSnapshot::key(&schema, &def.name);
        if snapshot.views.contains_key(&key) {
            return Err(SerializerError::collision(
                "view",
                &def.name,
                &schema,
                "a view with this name is already defined in the schema",
            ));
        }
        snapshot.views.insert(key, build_view(set, def, &schema, options));
    }

    tracing::debug!(
        tables = snapshot.tables.len(),
        enums = snapshot.enums.len(),
        views = snapshot.views.len(),
        "built postgres snapshot"
    );
    Ok(snapshot)
}

fn normalize_schema(schema: Option<&str>) -> String {
    match schema {
        None | Some("public") => String::new(),
        Some(s) => s.to_string(),
    }
}

fn build_column(
    table_name: &str,
    owner: Option<&TableDef>,
    def: &ColumnDef,
    position: usize,
    options: &BuildOptions,
) -> Column {
    let name = options.column_name(def);
    let mut column = Column::new(&name, &def.sql_type);
    column.ordinal_position = position;
    column.primary_key = def.primary_key;
    column.not_null = def.not_null;
    column.description = def.comment.clone();

    if let Some(enum_ref) = &def.enum_ref {
        column.sql_type = if def.sql_type.ends_with("[]") {
            def.sql_type.clone()
        } else {
            enum_ref.name.clone()
        };
        column.type_schema = Some(enum_ref.schema.clone().unwrap_or_else(|| "public".to_string()));
    }

    if let Some(default) = &def.default {
        column.default = Some(format_default(default, &def.sql_type, DIALECT, options.casing, owner));
    }

    if let Some(generated) = &def.generated {
        column.generated = Some(Generated {
            expression: generated.expression.render_in(DIALECT, options.casing, owner),
            mode: GeneratedMode::Stored,
        });
    }

    if let Some(identity) = &def.identity {
        let sequence_name = identity
            .sequence_name
            .clone()
            .unwrap_or_else(|| format!("{table_name}_{name}_seq"));
        column.identity = Some(identity_with_defaults(
            sequence_name,
            identity.kind,
            &def.sql_type,
            &identity.options,
        ));
    }

    if let Some(marker) = &def.unique {
        column.is_unique = true;
        column.unique_name = Some(
            marker
                .name
                .clone()
                .unwrap_or_else(|| unique_name(table_name, std::slice::from_ref(&name))),
        );
        column.nulls_not_distinct = marker.nulls_not_distinct;
    }

    column
}

fn identity_with_defaults(
    name: String,
    kind: crate::schema::IdentityKind,
    sql_type: &str,
    opts: &SequenceOptions,
) -> Identity {
    let range = IdentityRange::for_type(sql_type);
    let increment = opts.increment.unwrap_or(1);
    let descending = increment < 0;
    let min_value = opts
        .min_value
        .map(|v| v.to_string())
        .unwrap_or_else(|| if descending { range.min } else { "1" }.to_string());
    let max_value = opts
        .max_value
        .map(|v| v.to_string())
        .unwrap_or_else(|| if descending { "-1" } else { range.max }.to_string());
    let start_with = opts.start_with.map(|v| v.to_string()).unwrap_or_else(|| {
        if descending {
            max_value.clone()
        } else {
            min_value.clone()
        }
    });
    Identity {
        name,
        kind,
        increment: Some(increment.to_string()),
        min_value: Some(min_value),
        max_value: Some(max_value),
        start_with: Some(start_with),
        cache: Some(opts.cache.unwrap_or(1).to_string()),
        cycle: opts.cycle.unwrap_or(false),
    }
}

pub(crate) fn sequence_with_defaults(name: &str, schema: &str, opts: &SequenceOptions) -> Sequence {
    let increment = opts.increment.unwrap_or(1);
    let descending = increment < 0;
    let min_value = opts.min_value.map(|v| v.to_string()).unwrap_or_else(|| {
        if descending {
            SEQUENCE_NEGATIVE_MIN
        } else {
            SEQUENCE_MIN
        }
        .to_string()
    });
    let max_value = opts
        .max_value
        .map(|v| v.to_string())
        .unwrap_or_else(|| if descending { "-1" } else { SEQUENCE_MAX }.to_string());
    let start_with = opts.start_with.map(|v| v.to_string()).unwrap_or_else(|| {
        if descending {
            max_value.clone()
        } else {
            min_value.clone()
        }
    });
    Sequence {
        name: name.to_string(),
        schema: schema.to_string(),
        increment: increment.to_string(),
        min_value,
        max_value,
        start_with,
        cache: opts.cache.unwrap_or(1).to_string(),
        cycle: opts.cycle.unwrap_or(false),
    }
}

fn build_table(
    set: &SchemaObjectSet,
    def: &TableDef,
    schema: &str,
    options: &BuildOptions,
    indexes_in_schema: &mut HashMap<String, HashSet<String>>,
    snapshot: &mut PgSnapshot,
) -> Result<Table, SerializerError> {
    let table_name = def.name.as_str();
    let mut table = Table::new(table_name, schema);
    table.is_rls_enabled = def.rls_enabled;
    table.description = def.comment.clone();

    // Unique names seen so far, column markers and table constraints alike
    let mut unique_names: HashSet<String> = HashSet::new();

    for (position, col) in def.columns.iter().enumerate() {
        let column = build_column(table_name, Some(def), col, position, options);
        if let Some(unique) = &column.unique_name {
            if !unique_names.insert(unique.clone()) {
                return Err(SerializerError::collision(
                    "unique constraint",
                    unique,
                    table_name,
                    format!("column \"{}\" reuses an existing unique constraint name", column.name),
                ));
            }
        }
        table.columns.insert(column.name.clone(), column);
    }

    for pk in &def.primary_keys {
        let columns: Vec<String> = pk
            .columns
            .iter()
            .map(|k| options.key_name(Some(def), k))
            .collect();
        if columns.len() == 1 {
            if let Some(column) = table.columns.get_mut(&columns[0]) {
                column.primary_key = true;
                column.not_null = true;
            }
            continue;
        }
        for name in &columns {
            if let Some(column) = table.columns.get_mut(name) {
                column.not_null = true;
            }
        }
        let name = pk.name.clone().unwrap_or_else(|| pk_name(table_name, &columns));
        table
            .composite_primary_keys
            .insert(name.clone(), PrimaryKey { name, columns });
    }

    for unique in &def.uniques {
        let columns: Vec<String> = unique
            .columns
            .iter()
            .map(|k| options.key_name(Some(def), k))
            .collect();
        let name = unique
            .name
            .clone()
            .unwrap_or_else(|| unique_name(table_name, &columns));
        if !unique_names.insert(name.clone()) {
            return Err(SerializerError::collision(
                "unique constraint",
                &name,
                table_name,
                format!("columns {} reuse an existing unique constraint name", columns.join(",")),
            ));
        }
        table.unique_constraints.insert(
            name.clone(),
            UniqueConstraint {
                name,
                columns,
                nulls_not_distinct: unique.nulls_not_distinct,
            },
        );
    }

    for fk in collect_foreign_keys(set, def, options) {
        match table.foreign_keys.get_mut(&fk.name) {
            Some(existing) => merge_foreign_key_columns(
                &mut existing.columns_from,
                &mut existing.columns_to,
                &fk.columns_from,
                &fk.columns_to,
            ),
            None => {
                table.foreign_keys.insert(fk.name.clone(), fk);
            }
        }
    }

    let schema_key = if schema.is_empty() { "public" } else { schema };
    for idx in &def.indexes {
        let mut columns = Vec::with_capacity(idx.columns.len());
        for c in &idx.columns {
            let (expression, is_expression) = match &c.target {
                IndexTarget::Column(key) => (options.key_name(Some(def), key), false),
                IndexTarget::Expression(sql) => (sql.render_in(DIALECT, options.casing, Some(def)), true),
            };
            let nulls = c
                .nulls
                .unwrap_or(if c.asc { NullsOrder::Last } else { NullsOrder::First });
            columns.push(IndexColumn {
                expression,
                is_expression,
                asc: c.asc,
                nulls: nulls.as_str().to_string(),
                opclass: c.opclass.clone(),
            });
        }

        let name = match &idx.name {
            Some(name) => name.clone(),
            None if columns.iter().any(|c| c.is_expression) => {
                return Err(SerializerError::InvalidSchema(format!(
                    "an index on table \"{table_name}\" uses SQL expressions and needs an explicit name"
                )));
            }
            None => {
                let names: Vec<String> = columns.iter().map(|c| c.expression.clone()).collect();
                index_name(table_name, &names)
            }
        };

        if !indexes_in_schema
            .entry(schema_key.to_string())
            .or_default()
            .insert(name.clone())
        {
            return Err(SerializerError::collision(
                "index",
                &name,
                table_name,
                format!("an index with this name already exists in schema \"{schema_key}\""),
            ));
        }
        if unique_names.contains(&name) {
            return Err(SerializerError::collision(
                "index",
                &name,
                table_name,
                "the index name is already used by a unique constraint",
            ));
        }

        if columns.iter().any(|c| c.is_expression) {
            let key = PgSnapshot::key(schema, table_name);
            for c in columns.iter().filter(|c| c.is_expression) {
                snapshot.internal.mark_expression(&key, &name, &c.expression);
            }
        }

        table.indexes.insert(
            name.clone(),
            Index {
                name,
                columns,
                is_unique: idx.unique,
                concurrently: idx.concurrently,
                method: idx.method.clone().unwrap_or_else(|| "btree".to_string()),
                where_clause: idx
                    .where_clause
                    .as_ref()
                    .map(|w| w.render_in(DIALECT, options.casing, Some(def))),
                with: idx.with.clone(),
            },
        );
    }

    for check in &def.checks {
        if table.check_constraints.contains_key(&check.name) {
            return Err(SerializerError::collision(
                "check constraint",
                &check.name,
                table_name,
                "a check constraint with this name is already defined",
            ));
        }
        table.check_constraints.insert(
            check.name.clone(),
            CheckConstraint {
                name: check.name.clone(),
                value: check.value.render_in(DIALECT, options.casing, Some(def)),
            },
        );
    }

    for policy in &def.policies {
        if table.policies.contains_key(&policy.name) {
            return Err(SerializerError::collision(
                "policy",
                &policy.name,
                table_name,
                "a policy with this name is already defined on the table",
            ));
        }
        table
            .policies
            .insert(policy.name.clone(), build_policy(policy, Some(def), options));
    }

    Ok(table)
}

fn collect_foreign_keys(
    set: &SchemaObjectSet,
    def: &TableDef,
    options: &BuildOptions,
) -> Vec<ForeignKey> {
    let mut out = Vec::new();
    let mut push = |name: Option<&str>,
                    keys_from: &[String],
                    table_to: &str,
                    schema_to: Option<&str>,
                    keys_to: &[String],
                    on_update: &str,
                    on_delete: &str| {
        let columns_from: Vec<String> = keys_from
            .iter()
            .map(|k| options.key_name(Some(def), k))
            .collect();
        let columns_to = options.referenced_names(set, table_to, schema_to, keys_to);
        let target_schema = schema_to
            .map(str::to_string)
            .or_else(|| set.find_table(table_to, None).and_then(|t| t.schema.clone()))
            .unwrap_or_else(|| "public".to_string());
        out.push(ForeignKey {
            name: name
                .map(str::to_string)
                .unwrap_or_else(|| fk_name(&def.name, &columns_from, table_to, &columns_to)),
            table_from: def.name.clone(),
            columns_from,
            table_to: table_to.to_string(),
            schema_to: Some(target_schema),
            columns_to,
            on_update: Some(on_update.to_string()),
            on_delete: Some(on_delete.to_string()),
        });
    };

    for col in &def.columns {
        if let Some(r) = &col.references {
            push(
                None,
                std::slice::from_ref(&col.key),
                &r.table,
                r.schema.as_deref(),
                std::slice::from_ref(&r.column),
                r.on_update.unwrap_or_default().as_str(),
                r.on_delete.unwrap_or_default().as_str(),
            );
        }
    }
    for fk in &def.foreign_keys {
        push(
            fk.name.as_deref(),
            &fk.columns,
            &fk.foreign_table,
            fk.foreign_schema.as_deref(),
            &fk.foreign_columns,
            fk.on_update.unwrap_or_default().as_str(),
            fk.on_delete.unwrap_or_default().as_str(),
        );
    }
    out
}

fn build_policy(def: &PolicyDef, owner: Option<&TableDef>, options: &BuildOptions) -> Policy {
    let mut to = if def.to.is_empty() {
        vec!["public".to_string()]
    } else {
        def.to.clone()
    };
    to.sort();
    Policy {
        name: def.name.clone(),
        as_: def.as_.unwrap_or(PolicyAs::Permissive),
        for_: def.for_.unwrap_or(PolicyFor::All),
        to,
        using: def
            .using
            .as_ref()
            .map(|s| s.render_in(DIALECT, options.casing, owner)),
        with_check: def
            .with_check
            .as_ref()
            .map(|s| s.render_in(DIALECT, options.casing, owner)),
        on: None,
    }
}

fn attach_standalone_policy(
    set: &SchemaObjectSet,
    def: &PolicyDef,
    options: &BuildOptions,
    snapshot: &mut PgSnapshot,
) -> Result<(), SerializerError> {
    let Some(link) = &def.link else {
        tracing::warn!(
            policy = %def.name,
            "policy is not linked to a table and was skipped; use .link(table) or declare it inside the table"
        );
        return Ok(());
    };
    let schema = normalize_schema(link.schema.as_deref());
    let key = PgSnapshot::key(&schema, &link.name);
    let owner = set.find_table(&link.name, link.schema.as_deref());
    let mut policy = build_policy(def, owner, options);

    if snapshot.policies.contains_key(&def.name)
        || snapshot
            .tables
            .get(&key)
            .is_some_and(|t| t.policies.contains_key(&def.name))
    {
        return Err(SerializerError::collision(
            "policy",
            &def.name,
            &link.name,
            "a policy with this name is already defined",
        ));
    }

    match snapshot.tables.get_mut(&key) {
        Some(table) => {
            table.policies.insert(def.name.clone(), policy);
        }
        None => {
            let schema = if schema.is_empty() { "public" } else { schema.as_str() };
            policy.on = Some(format!("\"{}\".\"{}\"", schema, link.name));
            snapshot.policies.insert(def.name.clone(), policy);
        }
    }
    Ok(())
}

fn build_view(
    set: &SchemaObjectSet,
    def: &ViewDef,
    schema: &str,
    options: &BuildOptions,
) -> View {
    let columns: BTreeMap<String, Column> = def
        .columns
        .iter()
        .enumerate()
        .map(|(position, col)| {
            let column = build_column(&def.name, None, col, position, options);
            (column.name.clone(), column)
        })
        .collect();
    View {
        name: def.name.clone(),
        schema: schema.to_string(),
        columns,
        definition: if def.existing {
            None
        } else {
            def.definition
                .as_ref()
                .map(|d| render_unbound(d, DIALECT, set, options))
        },
        materialized: def.materialized,
        with: def.with.clone(),
        is_existing: def.existing,
        with_no_data: def.with_no_data.then_some(true),
        using: def.using.clone(),
        tablespace: def.tablespace.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        IdentityKind, column, index, policy, primary_key, role, sequence, table, unique, view,
    };
    use drizzle_types::Casing;

    fn build(set: SchemaObjectSet) -> Result<PgSnapshot, SerializerError> {
        build_snapshot(&set, &BuildOptions::default())
    }

    #[test]
    fn composite_primary_key_forces_not_null() {
        let set = SchemaObjectSet::new().table(
            table("members")
                .column(column("userId", "integer"))
                .column(column("teamId", "integer"))
                .primary_key(primary_key(["userId", "teamId"])),
        );
        let snapshot = build_snapshot(&set, &BuildOptions::new(Casing::SnakeCase)).unwrap();
        let members = &snapshot.tables["public.members"];
        assert!(members.columns["user_id"].not_null);
        assert!(members.columns["team_id"].not_null);
        assert!(members.composite_primary_keys.contains_key("members_user_id_team_id_pk"));
    }

    #[test]
    fn duplicate_unique_names_fail() {
        let set = SchemaObjectSet::new().table(
            table("users")
                .column(column("email", "text").unique_named("users_email_key"))
                .unique(unique(["email"]).name("users_email_key")),
        );
        assert!(matches!(
            build(set),
            Err(SerializerError::NamingCollision { kind: "unique constraint", .. })
        ));
    }

    #[test]
    fn unnamed_expression_index_is_rejected() {
        let set = SchemaObjectSet::new().table(
            table("users")
                .column(column("email", "text"))
                .index(crate::schema::IndexDef::default().on_expression("lower(email)")),
        );
        assert!(matches!(build(set), Err(SerializerError::InvalidSchema(_))));
    }

    #[test]
    fn index_names_are_unique_per_schema() {
        let set = SchemaObjectSet::new()
            .table(table("a").column(column("x", "int")).index(index("x_idx").on(["x"])))
            .table(table("b").column(column("x", "int")).index(index("x_idx").on(["x"])));
        assert!(matches!(
            build(set),
            Err(SerializerError::NamingCollision { kind: "index", .. })
        ));
    }

    #[test]
    fn identity_defaults_follow_type_and_direction() {
        let set = SchemaObjectSet::new().table(
            table("events")
                .column(column("id", "smallint").identity_always())
                .column(column("down", "integer").identity(
                    IdentityKind::ByDefault,
                    SequenceOptions::default().increment(-1),
                )),
        );
        let snapshot = build(set).unwrap();
        let events = &snapshot.tables["public.events"];
        let id = events.columns["id"].identity.as_ref().unwrap();
        assert_eq!(id.name, "events_id_seq");
        assert_eq!(id.max_value.as_deref(), Some("32767"));
        assert_eq!(id.start_with.as_deref(), Some("1"));
        let down = events.columns["down"].identity.as_ref().unwrap();
        assert_eq!(down.min_value.as_deref(), Some("-2147483648"));
        assert_eq!(down.max_value.as_deref(), Some("-1"));
        assert_eq!(down.start_with.as_deref(), Some("-1"));
    }

    #[test]
    fn standalone_policies_attach_or_float() {
        let docs = table("docs").column(column("id", "integer"));
        let other = table("external").schema("audit");
        let set = SchemaObjectSet::new()
            .table(docs.clone())
            .policy(policy("read_docs").link(&docs))
            .policy(policy("read_audit").to(["reader", "admin"]).link(&other))
            .policy(policy("dangling"));
        let snapshot = build(set).unwrap();
        assert!(snapshot.tables["public.docs"].policies.contains_key("read_docs"));
        let floating = &snapshot.policies["read_audit"];
        assert_eq!(floating.on.as_deref(), Some("\"audit\".\"external\""));
        assert_eq!(floating.to, vec!["admin", "reader"]);
        assert!(!snapshot.policies.contains_key("dangling"));
    }

    #[test]
    fn sequences_roles_and_views() {
        let set = SchemaObjectSet::new()
            .sequence(sequence("counter"))
            .role(role("admin").create_db())
            .role(role("postgres").existing())
            .view(view("active").as_sql("select 1"))
            .view(view("active").as_sql("select 2"));
        assert!(matches!(
            build(set.clone()),
            Err(SerializerError::NamingCollision { kind: "view", .. })
        ));

        let mut set = set;
        set.views.pop();
        let snapshot = build(set).unwrap();
        let counter = &snapshot.sequences["public.counter"];
        assert_eq!(counter.min_value, "1");
        assert_eq!(counter.max_value, "9223372036854775807");
        assert!(snapshot.roles["admin"].create_db);
        assert!(!snapshot.roles.contains_key("postgres"));
        assert_eq!(
            snapshot.views["public.active"].definition.as_deref(),
            Some("select 1")
        );
    }
}
