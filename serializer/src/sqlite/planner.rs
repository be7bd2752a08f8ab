//! Ordered statement planning for SQLite snapshots
//!
//! SQLite cannot add constraints to an existing table, so keys and references
//! travel inside `CREATE TABLE`.

use super::snapshot::SqliteSnapshot;
use super::squasher::squash_snapshot;
use super::statements::SqliteStatement;
use crate::error::SerializerError;
use crate::statements::creation_order;

pub fn plan(snapshot: &SqliteSnapshot) -> Result<Vec<SqliteStatement>, SerializerError> {
    let squashed = squash_snapshot(snapshot);
    let mut out = Vec::new();

    let order = creation_order(&snapshot.tables, |t| {
        t.foreign_keys.values().map(|fk| fk.table_to.clone()).collect()
    });
    for key in order {
        let Some(table) = squashed.tables.get(key) else {
            continue;
        };
        let mut columns: Vec<_> = table.columns.values().cloned().collect();
        columns.sort_by_key(|c| c.ordinal_position);

        out.push(SqliteStatement::CreateTable {
            table_name: table.name.clone(),
            columns,
            composite_pks: table.composite_primary_keys.values().cloned().collect(),
            references: table.foreign_keys.values().cloned().collect(),
            unique_constraints: table.unique_constraints.values().cloned().collect(),
            check_constraints: table.check_constraints.values().cloned().collect(),
            internal: snapshot.internal.for_table(&table.name),
        });
    }

    for table in squashed.tables.values() {
        for index in table.indexes.values() {
            out.push(SqliteStatement::CreateIndex {
                table_name: table.name.clone(),
                data: index.clone(),
                internal: snapshot.internal.for_table(&table.name),
            });
        }
    }

    for view in squashed.views.values().filter(|v| !v.is_existing) {
        let definition = view.definition.clone().ok_or_else(|| {
            SerializerError::InvalidSchema(format!(
                "view \"{}\" has no definition and is not marked as existing",
                view.name
            ))
        })?;
        out.push(SqliteStatement::CreateView {
            name: view.name.clone(),
            definition,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::snapshot::{Column, ForeignKey, Index, Table, View};

    fn snapshot() -> SqliteSnapshot {
        let mut snapshot = SqliteSnapshot::new();
        let mut users = Table::new("users");
        users.columns.insert("id".into(), Column::new("id", "integer"));
        users.indexes.insert(
            "users_id_idx".into(),
            Index {
                name: "users_id_idx".into(),
                columns: vec!["id".into()],
                is_unique: false,
                where_clause: None,
            },
        );
        snapshot.tables.insert("users".into(), users);

        let mut posts = Table::new("posts");
        posts
            .columns
            .insert("author".into(), Column::new("author", "integer"));
        posts.foreign_keys.insert(
            "posts_author_users_id_fk".into(),
            ForeignKey {
                name: "posts_author_users_id_fk".into(),
                table_from: "posts".into(),
                columns_from: vec!["author".into()],
                table_to: "users".into(),
                columns_to: vec!["id".into()],
                on_update: None,
                on_delete: Some("cascade".into()),
            },
        );
        snapshot.tables.insert("posts".into(), posts);
        snapshot
    }

    #[test]
    fn references_are_carried_by_create_table() {
        let statements = plan(&snapshot()).unwrap();
        let kinds: Vec<_> = statements.iter().map(|s| s.kind().as_str()).collect();
        assert_eq!(kinds, vec!["create_table", "create_table", "create_index"]);
        assert_eq!(statements[0].table_name(), Some("users"));
        let SqliteStatement::CreateTable { references, .. } = &statements[1] else {
            panic!("expected posts after users");
        };
        assert_eq!(references.len(), 1);
    }

    #[test]
    fn views_without_definition_are_rejected() {
        let mut snapshot = snapshot();
        snapshot.views.insert(
            "v".into(),
            View {
                name: "v".into(),
                columns: Default::default(),
                definition: None,
                is_existing: false,
            },
        );
        assert!(matches!(
            plan(&snapshot),
            Err(SerializerError::InvalidSchema(_))
        ));
    }

    #[test]
    fn existing_views_are_skipped() {
        let mut snapshot = snapshot();
        snapshot.views.insert(
            "v".into(),
            View {
                name: "v".into(),
                columns: Default::default(),
                definition: None,
                is_existing: true,
            },
        );
        assert!(
            plan(&snapshot)
                .unwrap()
                .iter()
                .all(|s| !matches!(s, SqliteStatement::CreateView { .. }))
        );
    }
}
