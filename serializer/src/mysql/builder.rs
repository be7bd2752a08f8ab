//! Schema objects to MySQL snapshot

use std::collections::HashSet;

use drizzle_types::Dialect;

use super::snapshot::{
    CheckConstraint, Column, ForeignKey, Index, MySqlSnapshot, PrimaryKey, Table,
    UniqueConstraint, View,
};
use crate::builder::{
    BuildOptions, fk_name, format_default, index_name, merge_foreign_key_columns, pk_name,
    render_unbound, unique_name,
};
use crate::error::SerializerError;
use crate::extract::resolve_relations;
use crate::schema::{ColumnDef, DefaultValue, IndexTarget, SchemaObjectSet, TableDef, ViewDef};
use crate::snapshot::{Generated, Internal};
use crate::utils::quote_literal;

const DIALECT: Dialect = Dialect::MySQL;

pub fn build_snapshot(
    set: &SchemaObjectSet,
    options: &BuildOptions,
) -> Result<MySqlSnapshot, SerializerError> {
    let mut snapshot = MySqlSnapshot::new();
    snapshot.project_id = options.project_id.clone();
    let relations = resolve_relations(set);

    for def in &set.tables {
        let mut table = build_table(set, def, options, &mut snapshot.internal)?;
        table.relations = relations.get(&def.name).cloned().unwrap_or_default();
        snapshot.tables.insert(def.name.clone(), table);
    }

    for def in set.all_views() {
        if snapshot.views.contains_key(&def.name) {
            return Err(SerializerError::collision(
                "view",
                &def.name,
                &def.name,
                "a view with this name is already defined",
            ));
        }
        let view = build_view(set, def, options, &mut snapshot.internal);
        snapshot.views.insert(def.name.clone(), view);
    }

    tracing::debug!(
        tables = snapshot.tables.len(),
        views = snapshot.views.len(),
        "built mysql snapshot"
    );
    Ok(snapshot)
}

/// `enum('a','b')`
fn enum_type(values: &[String]) -> String {
    let values: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
    format!("enum({})", values.join(","))
}

fn build_column(
    table_name: &str,
    owner: Option<&TableDef>,
    def: &ColumnDef,
    position: usize,
    options: &BuildOptions,
    internal: &mut Internal,
) -> Column {
    let name = options.column_name(def);
    let sql_type = if !def.enum_values.is_empty() && def.sql_type.eq_ignore_ascii_case("enum") {
        enum_type(&def.enum_values)
    } else {
        def.sql_type.clone()
    };
    let mut column = Column::new(&name, sql_type);
    column.ordinal_position = position;
    column.primary_key = def.primary_key;
    column.not_null = def.not_null;
    column.autoincrement = def.autoincrement;
    column.on_update = def.on_update_now.then_some(true);
    column.description = def.comment.clone();

    if let Some(default) = &def.default {
        if matches!(default, DefaultValue::Sql(_)) {
            internal.mark_default_expression(table_name, &name);
        }
        column.default = Some(format_default(default, &def.sql_type, DIALECT, options.casing, owner));
    }
    if let Some(generated) = &def.generated {
        column.generated = Some(Generated {
            expression: generated.expression.render_in(DIALECT, options.casing, owner),
            mode: generated.mode,
        });
    }
    column
}

fn build_table(
    set: &SchemaObjectSet,
    def: &TableDef,
    options: &BuildOptions,
    internal: &mut Internal,
) -> Result<Table, SerializerError> {
    let table_name = def.name.as_str();
    let mut table = Table::new(table_name);
    table.description = def.comment.clone();

    for (position, col) in def.columns.iter().enumerate() {
        let column = build_column(table_name, Some(def), col, position, options, internal);
        if let Some(marker) = &col.unique {
            let name = marker
                .name
                .clone()
                .unwrap_or_else(|| unique_name(table_name, std::slice::from_ref(&column.name)));
            if table.unique_constraints.contains_key(&name) {
                return Err(SerializerError::collision(
                    "unique constraint",
                    &name,
                    table_name,
                    format!("column \"{}\" reuses an existing unique constraint name", column.name),
                ));
            }
            table.unique_constraints.insert(
                name.clone(),
                UniqueConstraint {
                    name,
                    columns: vec![column.name.clone()],
                },
            );
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
        if table.unique_constraints.contains_key(&name) {
            return Err(SerializerError::collision(
                "unique constraint",
                &name,
                table_name,
                format!("columns {} reuse an existing unique constraint name", columns.join(",")),
            ));
        }
        table
            .unique_constraints
            .insert(name.clone(), UniqueConstraint { name, columns });
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

    let mut index_names: HashSet<String> = HashSet::new();
    for idx in &def.indexes {
        let mut columns = Vec::with_capacity(idx.columns.len());
        let mut expressions = Vec::new();
        for c in &idx.columns {
            match &c.target {
                IndexTarget::Column(key) => columns.push(options.key_name(Some(def), key)),
                IndexTarget::Expression(sql) => {
                    let text = sql.render_in(DIALECT, options.casing, Some(def));
                    expressions.push(text.clone());
                    columns.push(text);
                }
            }
        }

        let name = match &idx.name {
            Some(name) => name.clone(),
            None if !expressions.is_empty() => {
                return Err(SerializerError::InvalidSchema(format!(
                    "an index on table \"{table_name}\" uses SQL expressions and needs an explicit name"
                )));
            }
            None => index_name(table_name, &columns),
        };

        if !index_names.insert(name.clone()) {
            return Err(SerializerError::collision(
                "index",
                &name,
                table_name,
                "an index with this name is already defined on the table",
            ));
        }
        if table.unique_constraints.contains_key(&name) {
            return Err(SerializerError::collision(
                "index",
                &name,
                table_name,
                "the index name is already used by a unique constraint",
            ));
        }
        if !idx.unique && table.foreign_keys.contains_key(&name) {
            return Err(SerializerError::collision(
                "index",
                &name,
                table_name,
                "the index name is already used by a foreign key, which implies an index of the same name",
            ));
        }

        for expression in &expressions {
            internal.mark_expression(table_name, &name, expression);
        }

        table.indexes.insert(
            name.clone(),
            Index {
                name,
                columns,
                is_unique: idx.unique,
                using: idx.method.clone(),
                algorithm: idx.algorithm.clone(),
                lock: idx.lock.clone(),
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
                    keys_to: &[String],
                    on_update: &str,
                    on_delete: &str| {
        let columns_from: Vec<String> = keys_from
            .iter()
            .map(|k| options.key_name(Some(def), k))
            .collect();
        let columns_to = options.referenced_names(set, table_to, None, keys_to);
        out.push(ForeignKey {
            name: name
                .map(str::to_string)
                .unwrap_or_else(|| fk_name(&def.name, &columns_from, table_to, &columns_to)),
            table_from: def.name.clone(),
            columns_from,
            table_to: table_to.to_string(),
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
            &fk.foreign_columns,
            fk.on_update.unwrap_or_default().as_str(),
            fk.on_delete.unwrap_or_default().as_str(),
        );
    }
    out
}

fn build_view(
    set: &SchemaObjectSet,
    def: &ViewDef,
    options: &BuildOptions,
    internal: &mut Internal,
) -> View {
    let columns = def
        .columns
        .iter()
        .enumerate()
        .map(|(position, col)| {
            let column = build_column(&def.name, None, col, position, options, internal);
            (column.name.clone(), column)
        })
        .collect();
    View {
        name: def.name.clone(),
        columns,
        definition: if def.existing {
            None
        } else {
            def.definition
                .as_ref()
                .map(|d| render_unbound(d, DIALECT, set, options))
        },
        is_existing: def.existing,
        algorithm: def
            .algorithm
            .clone()
            .unwrap_or_else(|| "undefined".to_string()),
        sql_security: def
            .sql_security
            .clone()
            .unwrap_or_else(|| "definer".to_string()),
        with_check_option: def.with_check_option.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Sql, column, foreign_key, index, mysql_enum, table, view};

    fn build(set: SchemaObjectSet) -> Result<MySqlSnapshot, SerializerError> {
        build_snapshot(&set, &BuildOptions::default())
    }

    #[test]
    fn enums_render_as_value_lists() {
        let set = SchemaObjectSet::new()
            .table(table("moods").column(mysql_enum("mood", ["happy", "it's ok"]).not_null()));
        let snapshot = build(set).unwrap();
        let mood = &snapshot.tables["moods"].columns["mood"];
        assert_eq!(mood.sql_type, "enum('happy','it''s ok')");
        assert_eq!(
            mood.enum_values(),
            Some(vec!["happy".to_string(), "it's ok".to_string()])
        );
    }

    #[test]
    fn column_uniques_become_constraints() {
        let set = SchemaObjectSet::new()
            .table(table("users").column(column("email", "varchar(255)").unique()));
        let snapshot = build(set).unwrap();
        let users = &snapshot.tables["users"];
        assert_eq!(
            users.unique_constraints["users_email_unique"].columns,
            vec!["email"]
        );
    }

    #[test]
    fn fragments_resolve_explicit_column_names() {
        let set = SchemaObjectSet::new()
            .table(
                table("orders")
                    .column(column("totalCents", "int").name("total_cents"))
                    .column(
                        column("totalUnits", "int")
                            .generated_stored(Sql::column("totalCents").push_raw(" / 100")),
                    )
                    .check("total_positive", Sql::column("totalCents").push_raw(" >= 0"))
                    .index(
                        index("orders_total_idx")
                            .on_expression(Sql::raw("(").push_column("totalCents").push_raw(" * 2)")),
                    ),
            )
            .view(view("big_orders").as_sql(
                Sql::raw("select * from `orders` where ")
                    .push_column("totalCents")
                    .push_raw(" > 10000"),
            ));
        let snapshot = build(set).unwrap();
        let orders = &snapshot.tables["orders"];

        assert_eq!(orders.check_constraints["total_positive"].value, "`total_cents` >= 0");
        assert_eq!(
            orders.columns["totalUnits"].generated.as_ref().unwrap().expression,
            "`total_cents` / 100"
        );
        assert_eq!(orders.indexes["orders_total_idx"].columns, vec!["(`total_cents` * 2)"]);
        assert_eq!(
            snapshot.views["big_orders"].definition.as_deref(),
            Some("select * from `orders` where `total_cents` > 10000")
        );
    }

    #[test]
    fn same_named_foreign_keys_merge_pairwise() {
        let set = SchemaObjectSet::new()
            .table(
                table("accounts")
                    .column(column("id", "int"))
                    .column(column("alt_id", "int")),
            )
            .table(
                table("transfers")
                    .column(column("a", "int"))
                    .column(column("b", "int"))
                    .foreign_key(foreign_key(["a"], "accounts", ["id"]).name("transfers_fk"))
                    .foreign_key(foreign_key(["b"], "accounts", ["id"]).name("transfers_fk")),
            );
        let snapshot = build(set).unwrap();
        let fk = &snapshot.tables["transfers"].foreign_keys["transfers_fk"];

        assert_eq!(fk.columns_from, vec!["a", "b"]);
        assert_eq!(fk.columns_to, vec!["id", "id"]);
    }

    #[test]
    fn index_named_like_a_foreign_key_collides() {
        let set = SchemaObjectSet::new()
            .table(table("users").column(column("id", "int").primary_key()))
            .table(
                table("posts")
                    .column(column("author_id", "int"))
                    .foreign_key(foreign_key(["author_id"], "users", ["id"]).name("posts_author_fk"))
                    .index(index("posts_author_fk").on(["author_id"])),
            );
        assert!(matches!(
            build(set),
            Err(SerializerError::NamingCollision { kind: "index", .. })
        ));
    }

    #[test]
    fn expressions_are_recorded_in_internal() {
        let set = SchemaObjectSet::new().table(
            table("users")
                .column(column("email", "varchar(255)"))
                .column(column("created_at", "timestamp").default_sql("(now())"))
                .index(index("users_lower_email_idx").on_expression("lower(`email`)")),
        );
        let snapshot = build(set).unwrap();
        assert!(snapshot
            .internal
            .is_expression("users", "users_lower_email_idx", "lower(`email`)"));
        assert!(snapshot.internal.is_default_expression("users", "created_at"));
        assert!(!snapshot.internal.is_default_expression("users", "email"));
    }

    #[test]
    fn view_options_have_defaults() {
        let set = SchemaObjectSet::new()
            .view(view("active").as_sql(Sql::raw("select 1")))
            .view(view("merged").as_sql("select 2").algorithm("merge"));
        let snapshot = build(set).unwrap();
        assert_eq!(snapshot.views["active"].algorithm, "undefined");
        assert_eq!(snapshot.views["active"].sql_security, "definer");
        assert_eq!(snapshot.views["merged"].algorithm, "merge");
    }
}
