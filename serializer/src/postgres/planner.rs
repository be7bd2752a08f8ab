//! Ordered statement planning for PostgreSQL snapshots

use super::snapshot::{Column, Identity, PgSnapshot, Policy, PrimaryKey};
use super::squasher::{squash_snapshot, unsquash_sequence};
use super::statements::PgStatement;
use crate::error::SerializerError;
use crate::squash::Squash;
use crate::statements::{PlanOptions, creation_order};

/// Plan the statements creating `snapshot` from scratch
pub fn plan(snapshot: &PgSnapshot, options: &PlanOptions) -> Result<Vec<PgStatement>, SerializerError> {
    let squashed = squash_snapshot(snapshot);
    let mut out = Vec::new();

    for name in squashed.schemas.values() {
        out.push(PgStatement::CreateSchema { name: name.clone() });
    }

    for role in squashed.roles.values() {
        out.push(PgStatement::CreateRole {
            name: role.name.clone(),
            values: role.clone(),
        });
    }

    for e in squashed.enums.values() {
        out.push(PgStatement::CreateTypeEnum {
            name: e.name.clone(),
            schema: e.schema.clone(),
            values: e.values.clone(),
        });
    }

    for seq in squashed.sequences.values() {
        out.push(PgStatement::CreateSequence {
            name: seq.name.clone(),
            schema: seq.schema.clone(),
            values: unsquash_sequence(&seq.name, &seq.schema, &seq.values)?,
        });
    }

    let order = creation_order(&snapshot.tables, |t| {
        t.foreign_keys
            .values()
            .map(|fk| PgSnapshot::key(fk.schema_to.as_deref().unwrap_or_default(), &fk.table_to))
            .collect()
    });
    for key in order {
        let Some(table) = squashed.tables.get(key) else {
            continue;
        };
        let mut columns: Vec<Column> = Vec::with_capacity(table.columns.len());
        for (name, column) in &table.columns {
            let mut column = column.clone();
            if let Some(token) = table.identities.get(name) {
                column.identity = Some(Identity::unsquash(token)?);
            }
            columns.push(column);
        }
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

        out.push(PgStatement::CreateTable {
            table_name: table.name.clone(),
            schema: table.schema.clone(),
            columns,
            composite_pks: inline_pks,
            composite_pk_name,
            unique_constraints: inline_uniques,
            check_constraints: table.check_constraints.values().cloned().collect(),
            policies: table.policies.keys().cloned().collect(),
            is_rls_enabled: table.is_rls_enabled,
        });

        if table.is_rls_enabled || !table.policies.is_empty() {
            out.push(PgStatement::EnableRls {
                table_name: table.name.clone(),
                schema: table.schema.clone(),
            });
        }
    }

    for table in squashed.tables.values() {
        for fk in table.foreign_keys.values() {
            out.push(PgStatement::CreateReference {
                table_name: table.name.clone(),
                schema: table.schema.clone(),
                data: fk.clone(),
            });
        }
    }

    for table in squashed.tables.values() {
        for index in table.indexes.values() {
            out.push(PgStatement::CreateIndex {
                table_name: table.name.clone(),
                schema: table.schema.clone(),
                data: index.clone(),
            });
        }
    }

    if options.split_constraints {
        for (key, table) in &squashed.tables {
            for unique in table.unique_constraints.values() {
                out.push(PgStatement::CreateUniqueConstraint {
                    table_name: table.name.clone(),
                    schema: table.schema.clone(),
                    data: unique.clone(),
                });
            }
            for pk in table.composite_primary_keys.values() {
                let decoded = PrimaryKey::unsquash(pk)?;
                let constraint_name = snapshot
                    .tables
                    .get(key)
                    .and_then(|t| t.composite_primary_keys.get(&decoded.name))
                    .map(|p| p.name.clone())
                    .unwrap_or(decoded.name);
                out.push(PgStatement::CreateCompositePk {
                    table_name: table.name.clone(),
                    schema: table.schema.clone(),
                    data: pk.clone(),
                    constraint_name,
                });
            }
        }
    }

    for table in squashed.tables.values() {
        for policy in table.policies.values() {
            out.push(PgStatement::CreatePolicy {
                table_name: table.name.clone(),
                schema: table.schema.clone(),
                data: Policy::unsquash(policy)?,
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
        out.push(PgStatement::CreateView {
            name: view.name.clone(),
            schema: view.schema.clone(),
            definition,
            materialized: view.materialized,
            with: view.with.clone(),
            using: view.using.clone(),
            tablespace: view.tablespace.clone(),
            with_no_data: view.with_no_data.unwrap_or(false),
        });
    }

    for token in squashed.policies.values() {
        let policy = Policy::unsquash(token)?;
        let on = policy.on.clone().ok_or_else(|| {
            SerializerError::decode("standalone policy target", token.clone())
        })?;
        let (schema, table_name) = split_qualified(&on);
        out.push(PgStatement::EnableRls {
            table_name,
            schema,
        });
        out.push(PgStatement::CreateIndPolicy {
            table_name: on,
            data: policy,
        });
    }

    Ok(out)
}

/// Split `"schema"."table"` into its unquoted parts
fn split_qualified(on: &str) -> (String, String) {
    match on.split_once("\".\"") {
        Some((schema, table)) => (
            schema.trim_start_matches('"').to_string(),
            table.trim_end_matches('"').to_string(),
        ),
        None => (String::new(), on.trim_matches('"').to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_qualified_policy_targets() {
        assert_eq!(
            split_qualified("\"auth\".\"users\""),
            ("auth".to_string(), "users".to_string())
        );
        assert_eq!(split_qualified("\"users\""), (String::new(), "users".to_string()));
    }
}
