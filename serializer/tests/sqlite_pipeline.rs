//! SQLite pipeline tests
//!
//! SQLite has no `ALTER TABLE ... ADD CONSTRAINT`, so foreign keys and
//! composite keys must land inside `CREATE TABLE`.

use drizzle_serializer::schema::{
    ReferentialAction, SchemaModule, Sql, column, foreign_key, index, primary_key, table, view,
};
use drizzle_serializer::{
    BuildOptions, Dialect, PlanOptions, Snapshot, objects_to_snapshot, snapshot_to_sql,
};

fn build(module: SchemaModule) -> Snapshot {
    objects_to_snapshot(&[module], Dialect::SQLite, &BuildOptions::default()).unwrap()
}

fn schema() -> SchemaModule {
    let users = table("users")
        .column(column("id", "integer").primary_key().autoincrement())
        .column(column("name", "text").not_null().default("anon"));

    let posts = table("posts")
        .column(column("id", "integer").primary_key())
        .column(
            column("author_id", "integer")
                .references("users", "id")
                .on_delete(ReferentialAction::Cascade),
        )
        .column(column("slug", "text"))
        .index(index("posts_slug_idx").on(["slug"]).where_clause("slug IS NOT NULL"));

    SchemaModule::new("src/schema.rs")
        .export("users", users)
        .export("posts", posts)
        .export(
            "recent",
            view("recent_posts").as_sql("select * from posts order by id desc"),
        )
}

// =============================================================================
// CREATE TABLE
// =============================================================================

#[test]
fn test_foreign_keys_are_inline() {
    let sql = snapshot_to_sql(&build(schema()), &PlanOptions::default()).unwrap();

    assert!(sql.contains(
        "\tFOREIGN KEY (`author_id`) REFERENCES `users`(`id`) ON UPDATE no action ON DELETE cascade"
    ));
    assert!(!sql.contains("ALTER TABLE"));
}

#[test]
fn test_column_tokens() {
    let sql = snapshot_to_sql(&build(schema()), &PlanOptions::default()).unwrap();

    assert!(sql.contains("\t`id` integer PRIMARY KEY AUTOINCREMENT NOT NULL,"));
    assert!(sql.contains("\t`name` text DEFAULT ('anon') NOT NULL"));
}

#[test]
fn test_fragments_use_explicit_column_names() {
    let events = table("events")
        .column(column("createdAt", "integer").name("created_on"))
        .column(
            column("createdDay", "integer")
                .generated_virtual(Sql::column("createdAt").push_raw(" / 86400")),
        )
        .check("created_positive", Sql::column("createdAt").push_raw(" > 0"))
        .index(
            index("events_created_idx")
                .on_expression(Sql::raw("abs(").push_column("createdAt").push_raw(")"))
                .where_clause(Sql::column("createdAt").push_raw(" IS NOT NULL")),
        );
    let snapshot = build(SchemaModule::new("src/schema.rs").export("events", events));
    let table = &snapshot.as_sqlite().unwrap().tables["events"];

    assert_eq!(table.check_constraints["created_positive"].value, "`created_on` > 0");
    assert_eq!(
        table.columns["createdDay"].generated.as_ref().unwrap().expression,
        "(`created_on` / 86400)"
    );
    let index = &table.indexes["events_created_idx"];
    assert_eq!(index.columns, vec!["abs(`created_on`)"]);
    assert_eq!(index.where_clause.as_deref(), Some("`created_on` IS NOT NULL"));

    let sql = snapshot_to_sql(&snapshot, &PlanOptions::default()).unwrap();
    assert!(!sql.contains("`createdAt`"));
}

#[test]
fn test_statement_order() {
    let sql = snapshot_to_sql(&build(schema()), &PlanOptions::default()).unwrap();

    let tables = sql.rfind("CREATE TABLE").unwrap();
    let index = sql
        .find("CREATE INDEX `posts_slug_idx` ON `posts` (`slug`) WHERE slug IS NOT NULL;")
        .unwrap();
    let view = sql
        .find("CREATE VIEW `recent_posts` AS select * from posts order by id desc;")
        .unwrap();
    assert!(tables < index);
    assert!(index < view);
}

#[test]
fn test_composite_primary_key() {
    let links = table("links")
        .column(column("a", "integer"))
        .column(column("b", "integer"))
        .primary_key(primary_key(["a", "b"]))
        .foreign_key(foreign_key(["a"], "nodes", ["id"]).name("links_a_fk"));
    let nodes = table("nodes").column(column("id", "integer").primary_key());
    let module = SchemaModule::new("src/schema.rs")
        .export("links", links)
        .export("nodes", nodes);
    let sql = snapshot_to_sql(&build(module), &PlanOptions::default()).unwrap();

    assert!(sql.contains("\t`a` integer NOT NULL,"));
    assert!(sql.contains("\tPRIMARY KEY(`a`, `b`)"));
    assert!(sql.contains("\tFOREIGN KEY (`a`) REFERENCES `nodes`(`id`)"));
}

#[test]
fn test_existing_views_are_skipped() {
    let module = SchemaModule::new("src/schema.rs")
        .export("t", table("t").column(column("id", "integer")))
        .export("v", view("legacy").existing());
    let snapshot = build(module);
    assert!(snapshot.as_sqlite().unwrap().views["legacy"].is_existing);

    let sql = snapshot_to_sql(&snapshot, &PlanOptions::default()).unwrap();
    assert!(!sql.contains("CREATE VIEW"));
}

// =============================================================================
// Round trip through the embedded engine
// =============================================================================

#[cfg(feature = "rusqlite")]
#[test]
fn test_dump_round_trip() {
    let original = build(schema());
    let sql = snapshot_to_sql(&original, &PlanOptions::default()).unwrap();

    let imported = drizzle_serializer::sql_dump_to_snapshot(Dialect::SQLite, &sql).unwrap();
    let imported = imported.as_sqlite().unwrap();
    let original = original.as_sqlite().unwrap();

    assert_eq!(
        imported.tables.keys().collect::<Vec<_>>(),
        original.tables.keys().collect::<Vec<_>>()
    );
    let users = &imported.tables["users"];
    assert!(users.columns["id"].primary_key);
    assert!(users.columns["id"].autoincrement);
    assert_eq!(users.columns["name"].default.as_deref(), Some("'anon'"));

    let posts = &imported.tables["posts"];
    let fk = posts.foreign_keys.values().next().unwrap();
    assert_eq!(fk.table_to, "users");
    assert_eq!(fk.on_delete.as_deref(), Some("cascade"));
    let idx = &posts.indexes["posts_slug_idx"];
    assert_eq!(idx.columns, vec!["slug"]);
    assert_eq!(idx.where_clause.as_deref(), Some("slug IS NOT NULL"));

    assert!(imported.views.contains_key("recent_posts"));
}

#[cfg(feature = "rusqlite")]
#[test]
fn test_introspect_then_regenerate_source() {
    let sql = snapshot_to_sql(&build(schema()), &PlanOptions::default()).unwrap();
    let imported = drizzle_serializer::sql_dump_to_snapshot(Dialect::SQLite, &sql).unwrap();
    let source = drizzle_serializer::snapshot_to_source(&imported).unwrap();

    assert!(source.schema.starts_with("use drizzle_kit::prelude::*;"));
    assert!(source.schema.contains("table(\"users\")"));
    assert!(source.relations.contains("relations(\"posts\")"));
}
