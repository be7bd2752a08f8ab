//! MySQL snapshot to schema source

use super::snapshot::{Column, Index, MySqlSnapshot, Table, View};
use crate::codegen::{
    FkEdge, GeneratedSource, PRELUDE_IMPORT, foreign_key_call, ident, lit, lit_list,
    relations_source,
};
use crate::error::SerializerError;
use crate::schema::GeneratedMode;

pub fn generate(snapshot: &MySqlSnapshot) -> Result<GeneratedSource, SerializerError> {
    let mut code = String::new();
    code.push_str(PRELUDE_IMPORT);
    code.push('\n');
    let mut exports: Vec<(String, String)> = Vec::new();
    let mut edges = Vec::new();

    for table in snapshot.tables.values() {
        let f = ident(&table.name);
        code.push_str(&table_fn(&f, table, snapshot));
        exports.push((table.name.clone(), f));
        edges.extend(table.foreign_keys.values().map(|fk| FkEdge {
            table_from: fk.table_from.clone(),
            columns_from: fk.columns_from.clone(),
            table_to: fk.table_to.clone(),
            columns_to: fk.columns_to.clone(),
        }));
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

fn table_fn(f: &str, table: &Table, snapshot: &MySqlSnapshot) -> String {
    let mut chain = format!("table({})", lit(&table.name));

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
        chain.push_str(&format!(
            "\n        .unique(unique({}).name({}))",
            lit_list(&unique.columns),
            lit(&unique.name)
        ));
    }
    for fk in table.foreign_keys.values() {
        chain.push_str(&foreign_key_call(
            &fk.name,
            &fk.columns_from,
            &fk.table_to,
            None,
            &fk.columns_to,
            fk.on_update.as_deref(),
            fk.on_delete.as_deref(),
        ));
    }
    for index in table.indexes.values() {
        chain.push_str(&format!(
            "\n        .index({})",
            index_expr(&table.name, index, snapshot)
        ));
    }
    for check in table.check_constraints.values() {
        chain.push_str(&format!(
            "\n        .check({}, {})",
            lit(&check.name),
            lit(&check.value)
        ));
    }
    if let Some(description) = &table.description {
        chain.push_str(&format!("\n        .comment({})", lit(description)));
    }

    format!("\npub fn {f}() -> TableDef {{\n    {chain}\n}}\n")
}

fn column_expr(table: &str, column: &Column, snapshot: &MySqlSnapshot) -> String {
    let mut expr = match column.enum_values() {
        Some(values) => format!("mysql_enum({}, {})", lit(&column.name), lit_list(&values)),
        None => format!("column({}, {})", lit(&column.name), lit(&column.sql_type)),
    };

    if column.primary_key {
        expr.push_str(".primary_key()");
    } else if column.not_null {
        expr.push_str(".not_null()");
    }
    if column.autoincrement {
        expr.push_str(".autoincrement()");
    }
    if let Some(default) = &column.default {
        let default = if snapshot.internal.is_default_expression(table, &column.name) {
            crate::utils::strip_outer_parens(default)
        } else {
            default.as_str()
        };
        expr.push_str(&format!(".default_sql({})", lit(default)));
    }
    if column.on_update == Some(true) {
        expr.push_str(".on_update_now()");
    }
    if let Some(generated) = &column.generated {
        let method = match generated.mode {
            GeneratedMode::Stored => "generated_stored",
            GeneratedMode::Virtual => "generated_virtual",
        };
        expr.push_str(&format!(".{method}({})", lit(&generated.expression)));
    }
    if let Some(description) = &column.description {
        expr.push_str(&format!(".comment({})", lit(description)));
    }
    expr
}

fn index_expr(table: &str, index: &Index, snapshot: &MySqlSnapshot) -> String {
    let ctor = if index.is_unique { "unique_index" } else { "index" };
    let mut expr = format!("{ctor}({})", lit(&index.name));

    let is_expression =
        |c: &String| snapshot.internal.is_expression(table, &index.name, c);
    if index.columns.iter().any(is_expression) {
        for c in &index.columns {
            if is_expression(c) {
                expr.push_str(&format!(".on_expression({})", lit(c)));
            } else {
                expr.push_str(&format!(".column(IndexColumnDef::column({}))", lit(c)));
            }
        }
    } else {
        expr.push_str(&format!(".on({})", lit_list(&index.columns)));
    }

    if let Some(using) = &index.using {
        expr.push_str(&format!(".using({})", lit(using)));
    }
    if let Some(algorithm) = &index.algorithm {
        expr.push_str(&format!(".algorithm({})", lit(algorithm)));
    }
    if let Some(lock) = &index.lock {
        expr.push_str(&format!(".lock({})", lit(lock)));
    }
    expr
}

fn view_fn(f: &str, v: &View) -> String {
    let mut chain = format!("view({})", lit(&v.name));
    if v.is_existing {
        chain.push_str(".existing()");
    } else if let Some(definition) = &v.definition {
        chain.push_str(&format!("\n        .as_sql({})", lit(definition)));
    }
    if v.algorithm != "undefined" {
        chain.push_str(&format!(".algorithm({})", lit(&v.algorithm)));
    }
    if v.sql_security != "definer" {
        chain.push_str(&format!(".sql_security({})", lit(&v.sql_security)));
    }
    if let Some(option) = &v.with_check_option {
        chain.push_str(&format!(".with_check_option({})", lit(option)));
    }
    format!("\npub fn {f}() -> ViewDef {{\n    {chain}\n}}\n")
}
