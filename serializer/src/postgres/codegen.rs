//! PostgreSQL snapshot to schema source

use serde_json::Value;

use super::snapshot::{Column, Index, PgSnapshot, Policy, Sequence, Table, View};
use crate::codegen::{
    FkEdge, GeneratedSource, PRELUDE_IMPORT, foreign_key_call, ident, lit, lit_list,
    relations_source,
};
use crate::error::SerializerError;
use crate::schema::IdentityKind;

pub fn generate(snapshot: &PgSnapshot) -> Result<GeneratedSource, SerializerError> {
    let mut code = String::new();
    code.push_str(PRELUDE_IMPORT);
    code.push('\n');
    let mut exports: Vec<(String, String)> = Vec::new();

    for name in snapshot.schemas.values() {
        let f = format!("{}_schema", ident(name));
        code.push_str(&format!(
            "\npub fn {f}() -> NamespaceDef {{\n    namespace({})\n}}\n",
            lit(name)
        ));
        exports.push((name.clone(), f));
    }

    for e in snapshot.enums.values() {
        let f = enum_fn(&e.name);
        code.push_str(&format!(
            "\npub fn {f}() -> EnumDef {{\n    pg_enum({}, {}){}\n}}\n",
            lit(&e.name),
            lit_list(&e.values),
            schema_call(&e.schema)
        ));
        exports.push((e.name.clone(), f));
    }

    for seq in snapshot.sequences.values() {
        let f = format!("{}_sequence", ident(&seq.name));
        code.push_str(&format!(
            "\npub fn {f}() -> SequenceDef {{\n    sequence({}){}\n        .options({})\n}}\n",
            lit(&seq.name),
            schema_call(&seq.schema),
            sequence_options(seq)
        ));
        exports.push((seq.name.clone(), f));
    }

    for role in snapshot.roles.values() {
        let f = format!("{}_role", ident(&role.name));
        let mut chain = format!("role({})", lit(&role.name));
        if role.create_db {
            chain.push_str(".create_db()");
        }
        if role.create_role {
            chain.push_str(".create_role()");
        }
        if !role.inherit {
            chain.push_str(".no_inherit()");
        }
        code.push_str(&format!("\npub fn {f}() -> RoleDef {{\n    {chain}\n}}\n"));
        exports.push((role.name.clone(), f));
    }

    let mut edges = Vec::new();
    for table in snapshot.tables.values() {
        let f = ident(&table.name);
        code.push_str(&table_fn(&f, table, snapshot));
        exports.push((table.name.clone(), f));
        for fk in table.foreign_keys.values() {
            edges.push(FkEdge {
                table_from: fk.table_from.clone(),
                columns_from: fk.columns_from.clone(),
                table_to: fk.table_to.clone(),
                columns_to: fk.columns_to.clone(),
            });
        }
    }

    for policy in snapshot.policies.values() {
        let f = format!("{}_policy", ident(&policy.name));
        let on = policy.on.clone().unwrap_or_default();
        code.push_str(&format!(
            "\n/// Policy on {on}\npub fn {f}() -> PolicyDef {{\n    {}\n}}\n",
            policy_chain(policy)
        ));
    }

    for v in snapshot.views.values() {
        let f = format!("{}_view", ident(&v.name));
        code.push_str(&view_fn(&f, v));
        exports.push((v.name.clone(), f));
    }

    code.push_str("\npub fn module() -> SchemaModule {\n    SchemaModule::new(\"schema.rs\")");
    for (name, f) in &exports {
        code.push_str(&format!("\n        .export({}, {f}())", lit(name)));
    }
    code.push_str("\n}\n");

    Ok(GeneratedSource {
        schema: code,
        relations: relations_source(&edges),
    })
}

fn enum_fn(name: &str) -> String {
    format!("{}_enum", ident(name))
}

fn schema_call(schema: &str) -> String {
    if schema.is_empty() || schema == "public" {
        String::new()
    } else {
        format!(".schema({})", lit(schema))
    }
}

fn sequence_options(seq: &Sequence) -> String {
    option_chain(
        Some(&seq.increment),
        Some(&seq.min_value),
        Some(&seq.max_value),
        Some(&seq.start_with),
        Some(&seq.cache),
        seq.cycle,
    )
}

fn option_chain(
    increment: Option<&String>,
    min: Option<&String>,
    max: Option<&String>,
    start: Option<&String>,
    cache: Option<&String>,
    cycle: bool,
) -> String {
    let mut chain = "SequenceOptions::default()".to_string();
    for (method, value) in [
        ("increment", increment),
        ("min_value", min),
        ("max_value", max),
        ("start_with", start),
        ("cache", cache),
    ] {
        if let Some(v) = value.and_then(|v| v.parse::<i64>().ok()) {
            chain.push_str(&format!(".{method}({v})"));
        }
    }
    if cycle {
        chain.push_str(".cycle(true)");
    }
    chain
}

fn table_fn(f: &str, table: &Table, snapshot: &PgSnapshot) -> String {
    let mut chain = format!("table({}){}", lit(&table.name), schema_call(&table.schema));

    for column in table.ordered_columns() {
        chain.push_str(&format!(
            "\n        .column({})",
            column_expr(&table.name, column, snapshot)
        ));
    }
    for pk in table.composite_primary_keys.values() {
        chain.push_str(&format!(
            "\n        .primary_key(primary_key({}).name({}))",
            lit_list(&pk.columns),
            lit(&pk.name)
        ));
    }
    for unique in table.unique_constraints.values() {
        let nnd = if unique.nulls_not_distinct {
            ".nulls_not_distinct()"
        } else {
            ""
        };
        chain.push_str(&format!(
            "\n        .unique(unique({}).name({}){nnd})",
            lit_list(&unique.columns),
            lit(&unique.name)
        ));
    }
    for fk in table.foreign_keys.values() {
        chain.push_str(&foreign_key_call(
            &fk.name,
            &fk.columns_from,
            &fk.table_to,
            fk.schema_to.as_deref(),
            &fk.columns_to,
            fk.on_update.as_deref(),
            fk.on_delete.as_deref(),
        ));
    }
    for index in table.indexes.values() {
        chain.push_str(&format!("\n        .index({})", index_expr(index)));
    }
    for check in table.check_constraints.values() {
        chain.push_str(&format!(
            "\n        .check({}, {})",
            lit(&check.name),
            lit(&check.value)
        ));
    }
    for policy in table.policies.values() {
        chain.push_str(&format!("\n        .policy({})", policy_chain(policy)));
    }
    if table.is_rls_enabled {
        chain.push_str("\n        .enable_rls()");
    }
    if let Some(description) = &table.description {
        chain.push_str(&format!("\n        .comment({})", lit(description)));
    }

    format!("\npub fn {f}() -> TableDef {{\n    {chain}\n}}\n")
}

fn column_expr(table: &str, column: &Column, snapshot: &PgSnapshot) -> String {
    let enum_type = column.type_schema.as_ref().and_then(|schema| {
        snapshot
            .enums
            .get(&PgSnapshot::key(schema, &column.sql_type))
            .map(|e| e.name.clone())
    });
    let mut expr = match enum_type {
        Some(name) => format!("enum_column({}, &{}())", lit(&column.name), enum_fn(&name)),
        None => format!("column({}, {})", lit(&column.name), lit(&column.sql_type)),
    };

    if column.primary_key {
        expr.push_str(".primary_key()");
    } else if column.not_null {
        expr.push_str(".not_null()");
    }
    if let Some(default) = &column.default {
        expr.push_str(&format!(".default_sql({})", lit(default)));
    }
    if column.is_unique {
        match &column.unique_name {
            Some(name) => expr.push_str(&format!(".unique_named({})", lit(name))),
            None => expr.push_str(".unique()"),
        }
        if column.nulls_not_distinct {
            expr.push_str(".nulls_not_distinct()");
        }
    }
    if let Some(generated) = &column.generated {
        expr.push_str(&format!(".generated_stored({})", lit(&generated.expression)));
    }
    if let Some(identity) = &column.identity {
        let kind = match identity.kind {
            IdentityKind::Always => "IdentityKind::Always",
            IdentityKind::ByDefault => "IdentityKind::ByDefault",
        };
        expr.push_str(&format!(
            ".identity({kind}, {})",
            option_chain(
                identity.increment.as_ref(),
                identity.min_value.as_ref(),
                identity.max_value.as_ref(),
                identity.start_with.as_ref(),
                identity.cache.as_ref(),
                identity.cycle,
            )
        ));
        if identity.name != format!("{table}_{}_seq", column.name) {
            expr.push_str(&format!(".identity_sequence_name({})", lit(&identity.name)));
        }
    }
    if let Some(description) = &column.description {
        expr.push_str(&format!(".comment({})", lit(description)));
    }
    expr
}

fn index_expr(index: &Index) -> String {
    let ctor = if index.is_unique { "unique_index" } else { "index" };
    let mut expr = format!("{ctor}({})", lit(&index.name));

    let plain = index.columns.iter().all(|c| {
        !c.is_expression && c.asc && c.nulls == "last" && c.opclass.is_none()
    });
    if plain {
        let names: Vec<String> = index.columns.iter().map(|c| c.expression.clone()).collect();
        expr.push_str(&format!(".on({})", lit_list(&names)));
    } else {
        for c in &index.columns {
            let mut col = if c.is_expression {
                format!("IndexColumnDef::expression({})", lit(&c.expression))
            } else {
                format!("IndexColumnDef::column({})", lit(&c.expression))
            };
            if !c.asc {
                col.push_str(".desc()");
            }
            match (c.asc, c.nulls.as_str()) {
                (true, "first") => col.push_str(".nulls_first()"),
                (false, "last") => col.push_str(".nulls_last()"),
                _ => {}
            }
            if let Some(op) = &c.opclass {
                col.push_str(&format!(".op({})", lit(op)));
            }
            expr.push_str(&format!(".column({col})"));
        }
    }

    if index.concurrently {
        expr.push_str(".concurrently()");
    }
    if index.method != "btree" {
        expr.push_str(&format!(".using({})", lit(&index.method)));
    }
    if let Some(w) = &index.where_clause {
        expr.push_str(&format!(".where_clause({})", lit(w)));
    }
    for (key, value) in &index.with {
        if let Some(v) = value_expr(value) {
            expr.push_str(&format!(".with({}, {v})", lit(key)));
        }
    }
    expr
}

fn policy_chain(policy: &Policy) -> String {
    let mut chain = format!(
        "policy({}).as_(PolicyAs::{:?}).for_(PolicyFor::{:?}).to({})",
        lit(&policy.name),
        policy.as_,
        policy.for_,
        lit_list(&policy.to)
    );
    if let Some(using) = &policy.using {
        chain.push_str(&format!(".using({})", lit(using)));
    }
    if let Some(check) = &policy.with_check {
        chain.push_str(&format!(".with_check({})", lit(check)));
    }
    chain
}

fn view_fn(f: &str, v: &View) -> String {
    let ctor = if v.materialized {
        "materialized_view"
    } else {
        "view"
    };
    let mut chain = format!("{ctor}({}){}", lit(&v.name), schema_call(&v.schema));
    if v.is_existing {
        chain.push_str(".existing()");
    } else if let Some(definition) = &v.definition {
        chain.push_str(&format!("\n        .as_sql({})", lit(definition)));
    }
    for (key, value) in &v.with {
        if let Some(val) = value_expr(value) {
            chain.push_str(&format!(".with({}, {val})", lit(key)));
        }
    }
    if let Some(using) = &v.using {
        chain.push_str(&format!(".using({})", lit(using)));
    }
    if let Some(tablespace) = &v.tablespace {
        chain.push_str(&format!(".tablespace({})", lit(tablespace)));
    }
    if v.with_no_data == Some(true) {
        chain.push_str(".with_no_data()");
    }
    format!("\npub fn {f}() -> ViewDef {{\n    {chain}\n}}\n")
}

fn value_expr(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(lit(s)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) if n.is_i64() => Some(format!("{n}i64")),
        Value::Number(n) => Some(format!("{n}f64")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::snapshot::{ForeignKey, IndexColumn};

    fn users_and_posts() -> PgSnapshot {
        let mut snapshot = PgSnapshot::new();
        let mut users = Table::new("users", "");
        let mut id = Column::new("id", "serial");
        id.primary_key = true;
        id.not_null = true;
        users.columns.insert("id".into(), id);
        let mut email = Column::new("email", "varchar(256)");
        email.ordinal_position = 1;
        email.is_unique = true;
        email.unique_name = Some("users_email_unique".into());
        users.columns.insert("email".into(), email);
        users.indexes.insert(
            "users_email_lower_idx".into(),
            Index {
                name: "users_email_lower_idx".into(),
                columns: vec![IndexColumn {
                    expression: "lower(\"email\")".into(),
                    is_expression: true,
                    asc: true,
                    nulls: "last".into(),
                    opclass: None,
                }],
                is_unique: false,
                concurrently: false,
                method: "btree".into(),
                where_clause: None,
                with: Default::default(),
            },
        );
        snapshot.tables.insert("public.users".into(), users);

        let mut posts = Table::new("posts", "");
        posts
            .columns
            .insert("author_id".into(), Column::new("author_id", "integer"));
        posts.foreign_keys.insert(
            "posts_author_id_users_id_fk".into(),
            ForeignKey {
                name: "posts_author_id_users_id_fk".into(),
                table_from: "posts".into(),
                columns_from: vec!["author_id".into()],
                table_to: "users".into(),
                schema_to: Some("public".into()),
                columns_to: vec!["id".into()],
                on_update: Some("no action".into()),
                on_delete: Some("cascade".into()),
            },
        );
        snapshot.tables.insert("public.posts".into(), posts);
        snapshot
    }

    #[test]
    fn renders_tables_with_dsl_calls() {
        let source = generate(&users_and_posts()).unwrap();
        assert!(source.schema.starts_with(PRELUDE_IMPORT));
        assert!(source.schema.contains("pub fn users() -> TableDef"));
        assert!(source.schema.contains(
            ".column(column(\"email\", \"varchar(256)\").unique_named(\"users_email_unique\"))"
        ));
        assert!(source.schema.contains("IndexColumnDef::expression(\"lower(\\\"email\\\")\")"));
        assert!(source.schema.contains(".on_delete(ReferentialAction::Cascade)"));
        assert!(!source.schema.contains("on_update("));
        assert!(source.schema.contains(".export(\"users\", users())"));
    }

    #[test]
    fn renders_relations_from_foreign_keys() {
        let source = generate(&users_and_posts()).unwrap();
        assert!(source.relations.contains("pub fn posts_relations() -> RelationsDef"));
        assert!(source.relations.contains(".many(\"posts\", \"posts\")"));
    }
}
