//! Schema objects to SQLite snapshot

use std::collections::HashSet;

use drizzle_types::Dialect;

use super::snapshot::{
    CheckConstraint, Column, ForeignKey, Index, PrimaryKey, SqliteSnapshot, Table,
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
use crate::utils::parenthesize;

const DIALECT: Dialect = Dialect::SQLite;

pub fn build_snapshot(
    set: &SchemaObjectSet,
    options: &BuildOptions,
) -> Result<SqliteSnapshot, SerializerError> {
    let mut snapshot = SqliteSnapshot::new();
    snapshot.project_id = options.project_id.clone();
    let relations = resolve_relations(set);

    // Index names share one namespace per database file
    let mut index_names: HashSet<String> = HashSet::new();
    for def in &set.tables {
        let mut table = build_table(set, def, options, &mut index_names, &mut snapshot.internal)?;
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
        snapshot
            .views
            .insert(def.name.clone(), build_view(set, def, options));
    }

    tracing::debug!(
        tables = snapshot.tables.len(),
        views = snapshot.views.len(),
        "built sqlite snapshot"
    );
    Ok(snapshot)
}

fn build_column(
    owner: Option<&TableDef>,
    def: &ColumnDef,
    position: usize,
    options: &BuildOptions,
) -> Column {
    // Enum columns are plain text in SQLite
    let sql_type = if def.sql_type.eq_ignore_ascii_case("enum") {
        "text".to_string()
    } else {
        def.sql_type.clone()
    };
    let mut column = Column::new(options.column_name(def), sql_type);
    column.ordinal_position = position;
    column.primary_key = def.primary_key;
    column.not_null = def.not_null;
    column.autoincrement = def.autoincrement;

    if let Some(default) = &def.default {
        let formatted = format_default(default, &column.sql_type, DIALECT, options.casing, owner);
        column.default = Some(match default {
            DefaultValue::Sql(_) => parenthesize(&formatted),
            _ => formatted,
        });
    }
    if let Some(generated) = &def.generated {
        column.generated = Some(Generated {
            expression: parenthesize(&generated.expression.render_in(DIALECT, options.casing, owner)),
            mode: generated.mode,
        });
    }
    column
}

fn build_table(
    set: &SchemaObjectSet,
    def: &TableDef,
    options: &BuildOptions,
    index_names: &mut HashSet<String>,
    internal: &mut Internal,
) -> Result<Table, SerializerError> {
    let table_name = def.name.as_str();
    let mut table = Table::new(table_name);

    for (position, col) in def.columns.iter().enumerate() {
        let column = build_column(Some(def), col, position, options);
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
        if let [single] = columns.as_slice() {
            if let Some(column) = table.columns.get_mut(single) {
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
        table.composite_primary_keys.insert(
            name.clone(),
            PrimaryKey {
                columns,
                name: Some(name),
            },
        );
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
                "an index with this name is already defined in the database",
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

        for expression in &expressions {
            internal.mark_expression(table_name, &name, expression);
        }

        table.indexes.insert(
            name.clone(),
            Index {
                name,
                columns,
                is_unique: idx.unique,
                where_clause: idx
                    .where_clause
                    .as_ref()
                    .map(|w| w.render_in(DIALECT, options.casing, Some(def))),
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
    let mut references: Vec<(Option<&str>, Vec<String>, &str, Vec<String>, &str, &str)> =
        Vec::new();
    for col in &def.columns {
        if let Some(r) = &col.references {
            references.push((
                None,
                vec![col.key.clone()],
                r.table.as_str(),
                vec![r.column.clone()],
                r.on_update.unwrap_or_default().as_str(),
                r.on_delete.unwrap_or_default().as_str(),
            ));
        }
    }
    for fk in &def.foreign_keys {
        references.push((
            fk.name.as_deref(),
            fk.columns.clone(),
            fk.foreign_table.as_str(),
            fk.foreign_columns.clone(),
            fk.on_update.unwrap_or_default().as_str(),
            fk.on_delete.unwrap_or_default().as_str(),
        ));
    }

    references
        .into_iter()
        .map(|(name, keys_from, table_to, keys_to, on_update, on_delete)| {
            let columns_from: Vec<String> = keys_from
                .iter()
                .map(|k| options.key_name(Some(def), k))
                .collect();
            let columns_to = options.referenced_names(set, table_to, None, &keys_to);
            ForeignKey {
                name: name
                    .map(str::to_string)
                    .unwrap_or_else(|| fk_name(&def.name, &columns_from, table_to, &columns_to)),
                table_from: def.name.clone(),
                columns_from,
                table_to: table_to.to_string(),
                columns_to,
                on_update: Some(on_update.to_string()),
                on_delete: Some(on_delete.to_string()),
            }
        })
        .collect()
}

fn build_view(set: &SchemaObjectSet, def: &ViewDef, options: &BuildOptions) -> View {
    View {
        name: def.name.clone(),
        columns: def
            .columns
            .iter()
            .enumerate()
            .map(|(position, col)| {
                let column = build_column(None, col, position, options);
                (column.name.clone(), column)
            })
            .collect(),
        definition: if def.existing {
            None
        } else {
            def.definition
                .as_ref()
                .map(|d| render_unbound(d, DIALECT, set, options))
        },
        is_existing: def.existing,
    }
}
