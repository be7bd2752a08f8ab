//! Ordered statement planning for MySQL snapshots

use super::snapshot::{MySqlSnapshot, PrimaryKey};
use super::squasher::{squash_snapshot, unsquash_view_meta};
use super::statements::MySqlStatement;
use crate::error::SerializerError;
use crate::squash::Squash;
use crate::statements::{PlanOptions, creation_order};

pub fn plan(
    snapshot: &MySqlSnapshot,
    options: &PlanOptions,
) -> Result<Vec<MySqlStatement>, SerializerError> {
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

        let composite_pks: Vec<String> = table.composite_primary_keys.values().cloned().collect();
        let composite_pk_name = match composite_pks.first() {
            Some(token) => {
                let decoded = PrimaryKey::unsquash(token)?;
                snapshot
                    .tables
                    .get(key)
                    .and_then(|t| t.composite_primary_keys.get(&decoded.name))
                    .map(|pk| pk.name.clone())
                    .unwrap_or(decoded.name)
            }
            None => String::new(),
        };

        let (inline_pks, inline_uniques) = if options.split_constraints {
            (Vec::new(), Vec::new())
        } else {
            (
                composite_pks,
                table.unique_constraints.values().cloned().collect(),
            )
        };

        out.push(MySqlStatement::CreateTable {
            table_name: table.name.clone(),
            columns,
            composite_pks: inline_pks,
            composite_pk_name,
            unique_constraints: inline_uniques,
            check_constraints: table.check_constraints.values().cloned().collect(),
            internal: snapshot.internal.for_table(&table.name),
        });
    }

    for table in squashed.tables.values() {
        for fk in table.foreign_keys.values() {
            out.push(MySqlStatement::CreateReference {
                table_name: table.name.clone(),
                data: fk.clone(),
            });
        }
    }

    for table in squashed.tables.values() {
        for index in table.indexes.values() {
            out.push(MySqlStatement::CreateIndex {
                table_name: table.name.clone(),
                data: index.clone(),
                internal: snapshot.internal.for_table(&table.name),
            });
        }
    }

    if options.split_constraints {
        for table in squashed.tables.values() {
            for unique in table.unique_constraints.values() {
                out.push(MySqlStatement::CreateUniqueConstraint {
                    table_name: table.name.clone(),
                    data: unique.clone(),
                });
            }
            for pk in table.composite_primary_keys.values() {
                out.push(MySqlStatement::CreateCompositePk {
                    table_name: table.name.clone(),
                    data: pk.clone(),
                    constraint_name: PrimaryKey::unsquash(pk)?.name,
                });
            }
        }
    }

    for view in squashed.views.values().filter(|v| !v.is_existing) {
        let definition = view.definition.clone().ok_or_else(|| {
            SerializerError::InvalidSchema(format!(
                "view \"{}\" has no definition and is not marked as existing",
                view.name
            ))
        })?;
        let (algorithm, sql_security, with_check_option) = unsquash_view_meta(&view.meta)?;
        out.push(MySqlStatement::CreateView {
            name: view.name.clone(),
            definition,
            algorithm,
            sql_security,
            with_check_option,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mysql::snapshot::{Column, ForeignKey, Table, UniqueConstraint};

    fn snapshot() -> MySqlSnapshot {
        let mut snapshot = MySqlSnapshot::new();
        let mut users = Table::new("users");
        users.columns.insert("id".into(), Column::new("id", "int"));
        users.unique_constraints.insert(
            "users_email_unique".into(),
            UniqueConstraint {
                name: "users_email_unique".into(),
                columns: vec!["email".into()],
            },
        );
        snapshot.tables.insert("users".into(), users);
        let mut posts = Table::new("posts");
        posts.foreign_keys.insert(
            "posts_author_id_users_id_fk".into(),
            ForeignKey {
                name: "posts_author_id_users_id_fk".into(),
                table_from: "posts".into(),
                columns_from: vec!["author_id".into()],
                table_to: "users".into(),
                columns_to: vec!["id".into()],
                on_update: None,
                on_delete: None,
            },
        );
        snapshot.tables.insert("posts".into(), posts);
        snapshot
    }

    #[test]
    fn tables_precede_references() {
        let statements = plan(&snapshot(), &PlanOptions::default()).unwrap();
        let kinds: Vec<_> = statements.iter().map(|s| s.kind().as_str()).collect();
        assert_eq!(kinds, vec!["create_table", "create_table", "create_reference"]);
    }

    #[test]
    fn split_constraints_move_uniques_out() {
        let options = PlanOptions {
            split_constraints: true,
        };
        let statements = plan(&snapshot(), &options).unwrap();
        assert!(matches!(
            statements.last(),
            Some(MySqlStatement::CreateUniqueConstraint { .. })
        ));
        for s in &statements {
            if let MySqlStatement::CreateTable {
                unique_constraints, ..
            } = s
            {
                assert!(unique_constraints.is_empty());
            }
        }
    }
}
