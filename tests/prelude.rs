//! Schema files written against `drizzle_kit::prelude`

use drizzle_kit::prelude::*;

fn users() -> TableDef {
    table("users")
        .column(column("id", "integer").primary_key())
        .column(column("email", "text").not_null().unique())
}

fn posts() -> TableDef {
    table("posts")
        .column(column("id", "integer").primary_key())
        .column(
            column("author_id", "integer")
                .not_null()
                .references("users", "id")
                .on_delete(ReferentialAction::Cascade),
        )
}

fn posts_relations() -> RelationsDef {
    relations("posts").one("author", "users", ["author_id"], ["id"])
}

fn module() -> SchemaModule {
    SchemaModule::new("src/schema.rs")
        .export("users", users())
        .export("posts", posts())
        .export("postsRelations", posts_relations())
}

#[test]
fn test_every_dialect_builds_from_one_module() {
    for dialect in [Dialect::PostgreSQL, Dialect::MySQL, Dialect::SQLite] {
        let snapshot =
            drizzle_kit::objects_to_snapshot(&[module()], dialect, &BuildOptions::default())
                .unwrap();
        let sql = drizzle_kit::snapshot_to_sql(&snapshot, &PlanOptions::default()).unwrap();

        assert_eq!(snapshot.dialect(), dialect);
        assert!(sql.contains("CREATE TABLE"), "{dialect}: {sql}");
        assert!(sql.contains("FOREIGN KEY"), "{dialect}: {sql}");
    }
}

#[test]
fn test_declared_relations_are_recorded() {
    let snapshot =
        drizzle_kit::objects_to_snapshot(&[module()], Dialect::SQLite, &BuildOptions::default())
            .unwrap();
    let posts = &snapshot.as_sqlite().unwrap().tables["posts"];

    assert_eq!(posts.relations.len(), 1);
    assert_eq!(posts.relations[0].field_name, "author");
    assert_eq!(posts.relations[0].referenced_table_name, "users");
}

#[test]
fn test_config_options_flow_through() {
    let config = SnapshotConfig::from_toml_str(
        "dialect = \"postgresql\"\nsplitConstraints = true\n",
    )
    .unwrap();
    let members = table("members")
        .column(column("a", "integer"))
        .column(column("b", "integer"))
        .primary_key(primary_key(["a", "b"]));
    let module = SchemaModule::new("src/schema.rs").export("members", members);

    let snapshot =
        drizzle_kit::objects_to_snapshot(&[module], config.dialect, &config.build_options())
            .unwrap();
    let sql = drizzle_kit::snapshot_to_sql(&snapshot, &config.plan_options()).unwrap();

    assert!(sql.contains("ADD CONSTRAINT \"members_a_b_pk\" PRIMARY KEY(\"a\",\"b\");"));
}
