//! MySQL introspection against a scripted catalog
//!
//! The catalog is a closure that answers each `information_schema` query with
//! canned rows, so no server is needed.

use drizzle_serializer::catalog::Row;
use drizzle_serializer::mysql::introspect::queries;
use drizzle_serializer::{
    Dialect, IntrospectOptions, PlanOptions, SerializerError, import_from_database,
    snapshot_to_source, snapshot_to_sql,
};
use serde_json::{Value, json};

fn rows(values: Value) -> Vec<Row> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

fn catalog(sql: &str, params: &[Value]) -> Result<Vec<Row>, SerializerError> {
    if sql != queries::CURRENT_DATABASE && !sql.starts_with("SHOW CREATE VIEW") {
        assert_eq!(params, &[json!("shop")]);
    }
    let answer = if sql == queries::CURRENT_DATABASE {
        json!([{ "name": "shop" }])
    } else if sql == queries::TABLES {
        json!([
            { "name": "orders", "kind": "BASE TABLE", "comment": "" },
            { "name": "users", "kind": "BASE TABLE", "comment": "registered users" },
            { "name": "big_orders", "kind": "VIEW", "comment": "VIEW" }
        ])
    } else if sql == queries::COLUMNS {
        json!([
            { "table": "orders", "name": "id", "column_type": "int", "is_nullable": 0,
              "default_value": null, "extra": "auto_increment", "ordinal_position": 1 },
            { "table": "orders", "name": "user_id", "column_type": "bigint unsigned", "is_nullable": 1,
              "default_value": null, "extra": "", "ordinal_position": 2 },
            { "table": "orders", "name": "total", "column_type": "decimal(10,0)", "is_nullable": 1,
              "default_value": "0", "extra": "", "ordinal_position": 3 },
            { "table": "users", "name": "id", "column_type": "bigint unsigned", "is_nullable": 0,
              "default_value": null, "extra": "auto_increment", "ordinal_position": 1 },
            { "table": "users", "name": "email", "column_type": "varchar(255)", "is_nullable": 0,
              "default_value": null, "extra": "", "ordinal_position": 2 },
            { "table": "users", "name": "created_at", "column_type": "timestamp", "is_nullable": 1,
              "default_value": "CURRENT_TIMESTAMP", "extra": "DEFAULT_GENERATED on update CURRENT_TIMESTAMP",
              "ordinal_position": 3 },
            { "table": "big_orders", "name": "id", "column_type": "int", "is_nullable": 0,
              "default_value": null, "extra": "", "ordinal_position": 1 }
        ])
    } else if sql == queries::INDEXES {
        json!([
            { "table": "orders", "name": "orders_user_id_users_id_fk", "column_name": "user_id",
              "non_unique": 1, "index_type": "BTREE" },
            { "table": "orders", "name": "orders_total_idx", "column_name": "total",
              "non_unique": 1, "index_type": "BTREE" },
            { "table": "users", "name": "id", "column_name": "id", "non_unique": 0, "index_type": "BTREE" },
            { "table": "users", "name": "users_email_unique", "column_name": "email",
              "non_unique": 0, "index_type": "BTREE" }
        ])
    } else if sql == queries::PRIMARY_KEYS {
        json!([
            { "table": "orders", "name": "PRIMARY", "column_name": "id" },
            { "table": "users", "name": "PRIMARY", "column_name": "id" }
        ])
    } else if sql == queries::FOREIGN_KEYS {
        json!([
            { "table": "orders", "name": "orders_user_id_users_id_fk", "column_name": "user_id",
              "referenced_table": "users", "referenced_column": "id",
              "update_rule": "NO ACTION", "delete_rule": "CASCADE" }
        ])
    } else if sql == queries::CHECKS {
        json!([
            { "table": "orders", "name": "total_positive", "clause": "(`total` >= 0)" }
        ])
    } else if sql == queries::VIEWS {
        json!([
            { "name": "big_orders", "definition": "select `id` from `orders` where `total` > 100",
              "check_option": "NONE", "security_type": "INVOKER" }
        ])
    } else if sql.starts_with("SHOW CREATE VIEW") {
        json!([{ "Create View": "CREATE ALGORITHM=MERGE SQL SECURITY INVOKER VIEW `big_orders` AS select 1" }])
    } else {
        panic!("unexpected query: {sql}");
    };
    Ok(rows(answer))
}

#[test]
fn test_introspect_reads_tables_and_views() {
    let options = IntrospectOptions::new(Dialect::MySQL);
    let snapshot = import_from_database(&mut catalog, &options).unwrap();
    let mysql = snapshot.as_mysql().unwrap();

    let users = &mysql.tables["users"];
    assert_eq!(users.description.as_deref(), Some("registered users"));
    assert_eq!(users.columns["id"].sql_type, "serial");
    assert!(users.columns["id"].primary_key);
    assert!(users.unique_constraints.contains_key("users_email_unique"));
    assert!(!users.unique_constraints.contains_key("id"));
    assert_eq!(
        users.columns["created_at"].default.as_deref(),
        Some("(CURRENT_TIMESTAMP)")
    );
    assert_eq!(users.columns["created_at"].on_update, Some(true));
    assert!(mysql.internal.is_default_expression("users", "created_at"));

    let orders = &mysql.tables["orders"];
    assert_eq!(orders.columns["user_id"].sql_type, "bigint unsigned");
    assert_eq!(orders.columns["total"].sql_type, "decimal");
    assert_eq!(orders.columns["total"].default.as_deref(), Some("'0'"));
    assert!(orders.indexes.contains_key("orders_total_idx"));
    assert!(!orders.indexes.contains_key("orders_user_id_users_id_fk"));
    let fk = &orders.foreign_keys["orders_user_id_users_id_fk"];
    assert_eq!(fk.on_delete.as_deref(), Some("cascade"));
    assert_eq!(fk.on_update.as_deref(), Some("no action"));
    assert_eq!(orders.check_constraints["total_positive"].value, "(`total` >= 0)");

    let view = &mysql.views["big_orders"];
    assert_eq!(view.algorithm, "merge");
    assert_eq!(view.sql_security, "invoker");
    assert_eq!(view.with_check_option, None);
    assert!(view.columns.contains_key("id"));
}

#[test]
fn test_table_filter_applies() {
    let options = IntrospectOptions::new(Dialect::MySQL)
        .schemas(["shop"])
        .tables(["users"]);
    let snapshot = import_from_database(&mut catalog, &options).unwrap();
    let mysql = snapshot.as_mysql().unwrap();

    assert!(mysql.tables.contains_key("users"));
    assert!(!mysql.tables.contains_key("orders"));
}

#[test]
fn test_introspected_snapshot_emits_and_generates() {
    let options = IntrospectOptions::new(Dialect::MySQL);
    let snapshot = import_from_database(&mut catalog, &options).unwrap();

    let sql = snapshot_to_sql(&snapshot, &PlanOptions::default()).unwrap();
    assert!(sql.contains("CREATE TABLE `users`"));
    assert!(sql.contains("FOREIGN KEY"));
    assert!(sql.contains("CREATE INDEX `orders_total_idx`"));

    let source = snapshot_to_source(&snapshot).unwrap();
    assert!(source.schema.contains("column(\"id\", \"serial\")"));
    assert!(source.relations.contains("relations(\"orders\")"));
}

#[test]
fn test_missing_database_is_a_config_error() {
    let mut empty = |sql: &str, _: &[Value]| -> Result<Vec<Row>, SerializerError> {
        assert_eq!(sql, queries::CURRENT_DATABASE);
        Ok(rows(json!([{ "name": null }])))
    };
    let err = import_from_database(&mut empty, &IntrospectOptions::new(Dialect::MySQL)).unwrap_err();
    assert!(matches!(err, SerializerError::Config(_)));
}
