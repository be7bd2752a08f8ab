//! SQLite snapshot to schema source

use drizzle_types::sqlite::SQLTypeCategory;

use super::snapshot::{Column, Index, SqliteSnapshot, Table, View};
use crate::codegen::{
    FkEdge, GeneratedSource, PRELUDE_IMPORT, foreign_key_call, ident, lit, lit_list,
    relations_source,
};
use crate::error::SerializerError;
use crate::schema::GeneratedMode;
use crate::utils::strip_outer_parens;

pub fn generate(snapshot: &SqliteSnapshot) -> Result<GeneratedSource, SerializerError> {
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

fn table_fn(f: &str, table: &Table, snapshot: &SqliteSnapshot) -> String {
    let mut chain = format!("table({})", lit(&table.name));

    for column in table.ordered_columns() {
        chain.push_str(&format!("\n        .column({})", column_expr(column)));
    }
    for pk in table.composite_primary_keys.values() {
        let mut call = format!("primary_key({})", lit_list(&pk.columns));
        if let Some(name) = &pk.name {
            call.push_str(&format!(".name({})", lit(name)));
        }
        chain.push_str(&format!("\n        .primary_key({call})"));
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

    format!("\npub fn {f}() -> TableDef {{\n    {chain}\n}}\n")
}

fn column_expr(column: &Column) -> String {
    let mut expr = format!(
        "column({}, {})",
        lit(&column.name),
        lit(&SQLTypeCategory::canonical_type(&column.sql_type))
    );
    if column.primary_key {
        expr.push_str(".primary_key()");
    } else if column.not_null {
        expr.push_str(".not_null()");
    }
    if column.autoincrement {
        expr.push_str(".autoincrement()");
    }
    if let Some(default) = &column.default {
        expr.push_str(&default_call(default));
    }
    if let Some(generated) = &column.generated {
        let method = match generated.mode {
            GeneratedMode::Stored => "generated_stored",
            GeneratedMode::Virtual => "generated_virtual",
        };
        expr.push_str(&format!(
            ".{method}({})",
            lit(strip_outer_parens(&generated.expression))
        ));
    }
    expr
}

/// Literal defaults go through typed values so the builder formats them back
/// to the same text; anything else stays raw SQL
fn default_call(default: &str) -> String {
    if default.starts_with('(') {
        return format!(".default_sql({})", lit(strip_outer_parens(default)));
    }
    if let Ok(v) = default.parse::<i64>() {
        return format!(".default({v}i64)");
    }
    if default.contains('.') {
        if let Ok(v) = default.parse::<f64>() {
            return format!(".default({v:?}f64)");
        }
    }
    if let Some(inner) = default
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .filter(|inner| !inner.replace("''", "").contains('\''))
    {
        return format!(".default({})", lit(&inner.replace("''", "'")));
    }
    format!(".default_sql({})", lit(default))
}

fn index_expr(table: &str, index: &Index, snapshot: &SqliteSnapshot) -> String {
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
    if let Some(w) = &index.where_clause {
        expr.push_str(&format!(".where_clause({})", lit(w)));
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
    format!("\npub fn {f}() -> ViewDef {{\n    {chain}\n}}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Generated;
    use crate::sqlite::snapshot::ForeignKey;

    fn shop() -> SqliteSnapshot {
        let mut snapshot = SqliteSnapshot::new();
        let mut users = Table::new("users");
        let mut id = Column::new("id", "integer");
        id.primary_key = true;
        id.not_null = true;
        id.autoincrement = true;
        users.columns.insert("id".into(), id);
        let mut name = Column::new("name", "varchar(32)");
        name.ordinal_position = 1;
        name.default = Some("'it''s'".into());
        users.columns.insert("name".into(), name);
        let mut created = Column::new("created_at", "datetime");
        created.ordinal_position = 2;
        created.default = Some("(CURRENT_TIMESTAMP)".into());
        users.columns.insert("created_at".into(), created);
        let mut score = Column::new("score", "double");
        score.ordinal_position = 3;
        score.generated = Some(Generated {
            expression: "(`id` * 2)".into(),
            mode: GeneratedMode::Virtual,
        });
        users.columns.insert("score".into(), score);
        snapshot.tables.insert("users".into(), users);

        let mut orders = Table::new("orders");
        let mut user_id = Column::new("user_id", "integer");
        user_id.default = Some("0".into());
        orders.columns.insert("user_id".into(), user_id);
        orders.foreign_keys.insert(
            "orders_user_id_users_id_fk".into(),
            ForeignKey {
                name: "orders_user_id_users_id_fk".into(),
                table_from: "orders".into(),
                columns_from: vec!["user_id".into()],
                table_to: "users".into(),
                columns_to: vec!["id".into()],
                on_update: Some("no action".into()),
                on_delete: Some("cascade".into()),
            },
        );
        snapshot.tables.insert("orders".into(), orders);
        snapshot
    }

    #[test]
    fn types_collapse_to_affinities() {
        let source = generate(&shop()).unwrap();
        assert!(source.schema.contains("column(\"name\", \"text(32)\")"));
        assert!(source.schema.contains("column(\"created_at\", \"numeric\")"));
        assert!(source.schema.contains("column(\"score\", \"real\")"));
        assert!(
            source
                .schema
                .contains("column(\"id\", \"integer\").primary_key().autoincrement()")
        );
    }

    #[test]
    fn defaults_use_typed_values_where_possible() {
        assert_eq!(default_call("42"), ".default(42i64)");
        assert_eq!(default_call("1.5"), ".default(1.5f64)");
        assert_eq!(default_call("'it''s'"), ".default(\"it's\")");
        assert_eq!(
            default_call("(CURRENT_TIMESTAMP)"),
            ".default_sql(\"CURRENT_TIMESTAMP\")"
        );
        let source = generate(&shop()).unwrap();
        assert!(source.schema.contains(".generated_virtual(\"`id` * 2\")"));
    }

    #[test]
    fn relations_follow_foreign_keys() {
        let source = generate(&shop()).unwrap();
        assert!(source.schema.contains(".on_delete(ReferentialAction::Cascade)"));
        assert!(source.relations.contains("pub fn orders_relations() -> RelationsDef"));
        assert!(source.relations.contains(".one(\"users\", \"users\", [\"user_id\"], [\"id\"])"));
    }
}
