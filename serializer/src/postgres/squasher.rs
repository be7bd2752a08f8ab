//! PostgreSQL token layouts

use std::collections::BTreeMap;

use serde_json::Value;

use super::snapshot::{
    CheckConstraint, ForeignKey, Identity, Index, IndexColumn, PgSnapshot, Policy, PrimaryKey,
    Sequence, SquashedPgSnapshot, SquashedSequence, SquashedTable, UniqueConstraint,
};
use crate::error::SerializerError;
use crate::schema::{IdentityKind, PolicyAs, PolicyFor};
use crate::squash::{Squash, join_columns, opt_to_field, squash_map};
use crate::utils::{field, opt_field, parse_bool, split_fields, split_list, split_top_level};

impl Squash for Index {
    fn squash(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                format!(
                    "{}--{}--{}--{}--{}",
                    c.expression,
                    c.is_expression,
                    c.asc,
                    c.nulls,
                    opt_to_field(c.opclass.as_deref())
                )
            })
            .collect::<Vec<_>>()
            .join(",,");
        let with: serde_json::Map<String, Value> = self
            .with
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        format!(
            "{};{};{};{};{};{};{}",
            self.name,
            columns,
            self.is_unique,
            self.concurrently,
            self.method,
            opt_to_field(self.where_clause.as_deref()),
            Value::Object(with)
        )
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "postgres index";
        let parts = split_fields(token, ";", 7);
        let columns_field = field(&parts, 1, WHAT, token)?;
        let columns = if columns_field.is_empty() {
            Vec::new()
        } else {
            split_top_level(columns_field, ",,")
                .into_iter()
                .map(|c| {
                    let f = split_fields(c, "--", 5);
                    Ok(IndexColumn {
                        expression: field(&f, 0, WHAT, c)?.to_string(),
                        is_expression: parse_bool(field(&f, 1, WHAT, c)?, WHAT)?,
                        asc: parse_bool(field(&f, 2, WHAT, c)?, WHAT)?,
                        nulls: field(&f, 3, WHAT, c)?.to_string(),
                        opclass: opt_field(field(&f, 4, WHAT, c)?),
                    })
                })
                .collect::<Result<Vec<_>, SerializerError>>()?
        };
        let with_json = field(&parts, 6, WHAT, token)?;
        let with: BTreeMap<String, Value> = if with_json.is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(with_json)
                .map_err(|_| SerializerError::decode(WHAT, token))?
        };
        Ok(Index {
            name: field(&parts, 0, WHAT, token)?.to_string(),
            columns,
            is_unique: parse_bool(field(&parts, 2, WHAT, token)?, WHAT)?,
            concurrently: parse_bool(field(&parts, 3, WHAT, token)?, WHAT)?,
            method: field(&parts, 4, WHAT, token)?.to_string(),
            where_clause: opt_field(field(&parts, 5, WHAT, token)?),
            with,
        })
    }
}

impl Squash for ForeignKey {
    fn squash(&self) -> String {
        format!(
            "{};{};{};{};{};{};{};{}",
            self.name,
            self.table_from,
            join_columns(&self.columns_from),
            self.table_to,
            join_columns(&self.columns_to),
            opt_to_field(self.on_update.as_deref()),
            opt_to_field(self.on_delete.as_deref()),
            opt_to_field(self.schema_to.as_deref()),
        )
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "postgres foreign key";
        let parts = split_fields(token, ";", 8);
        Ok(ForeignKey {
            name: field(&parts, 0, WHAT, token)?.to_string(),
            table_from: field(&parts, 1, WHAT, token)?.to_string(),
            columns_from: split_list(field(&parts, 2, WHAT, token)?),
            table_to: field(&parts, 3, WHAT, token)?.to_string(),
            columns_to: split_list(field(&parts, 4, WHAT, token)?),
            on_update: opt_field(field(&parts, 5, WHAT, token)?),
            on_delete: opt_field(field(&parts, 6, WHAT, token)?),
            schema_to: opt_field(parts.get(7).copied().unwrap_or("")),
        })
    }
}

impl Squash for PrimaryKey {
    fn squash(&self) -> String {
        format!("{};{}", join_columns(&self.columns), self.name)
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "postgres primary key";
        let parts = split_fields(token, ";", 2);
        Ok(PrimaryKey {
            columns: split_list(field(&parts, 0, WHAT, token)?),
            name: field(&parts, 1, WHAT, token)?.to_string(),
        })
    }
}

impl Squash for UniqueConstraint {
    fn squash(&self) -> String {
        format!(
            "{};{};{}",
            self.name,
            join_columns(&self.columns),
            self.nulls_not_distinct
        )
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "postgres unique constraint";
        let parts = split_fields(token, ";", 3);
        Ok(UniqueConstraint {
            name: field(&parts, 0, WHAT, token)?.to_string(),
            columns: split_list(field(&parts, 1, WHAT, token)?),
            nulls_not_distinct: parse_bool(parts.get(2).copied().unwrap_or(""), WHAT)?,
        })
    }
}

impl Squash for CheckConstraint {
    fn squash(&self) -> String {
        format!("{};{}", self.name, self.value)
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        let (name, value) = token
            .split_once(';')
            .ok_or_else(|| SerializerError::decode("postgres check constraint", token))?;
        Ok(CheckConstraint {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

impl Squash for Policy {
    fn squash(&self) -> String {
        format!(
            "{}--{}--{}--{}--{}--{}--{}",
            self.name,
            self.as_.as_str(),
            self.for_.as_str(),
            self.to.join(","),
            opt_to_field(self.using.as_deref()),
            opt_to_field(self.with_check.as_deref()),
            opt_to_field(self.on.as_deref()),
        )
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "postgres policy";
        let parts = split_fields(token, "--", 7);
        let as_ = field(&parts, 1, WHAT, token)?;
        let for_ = field(&parts, 2, WHAT, token)?;
        Ok(Policy {
            name: field(&parts, 0, WHAT, token)?.to_string(),
            as_: PolicyAs::parse(as_).ok_or_else(|| SerializerError::decode(WHAT, token))?,
            for_: PolicyFor::parse(for_).ok_or_else(|| SerializerError::decode(WHAT, token))?,
            to: split_list(field(&parts, 3, WHAT, token)?),
            using: opt_field(field(&parts, 4, WHAT, token)?),
            with_check: opt_field(field(&parts, 5, WHAT, token)?),
            on: opt_field(parts.get(6).copied().unwrap_or("")),
        })
    }
}

impl Squash for Identity {
    fn squash(&self) -> String {
        format!(
            "{};{};{};{};{};{};{};{}",
            self.name,
            self.kind.as_str(),
            opt_to_field(self.min_value.as_deref()),
            opt_to_field(self.max_value.as_deref()),
            opt_to_field(self.increment.as_deref()),
            opt_to_field(self.start_with.as_deref()),
            opt_to_field(self.cache.as_deref()),
            self.cycle
        )
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "postgres identity";
        let parts = split_fields(token, ";", 8);
        let kind = field(&parts, 1, WHAT, token)?;
        Ok(Identity {
            name: field(&parts, 0, WHAT, token)?.to_string(),
            kind: IdentityKind::parse(kind).ok_or_else(|| SerializerError::decode(WHAT, token))?,
            min_value: opt_field(field(&parts, 2, WHAT, token)?),
            max_value: opt_field(field(&parts, 3, WHAT, token)?),
            increment: opt_field(field(&parts, 4, WHAT, token)?),
            start_with: opt_field(field(&parts, 5, WHAT, token)?),
            cache: opt_field(field(&parts, 6, WHAT, token)?),
            cycle: parse_bool(field(&parts, 7, WHAT, token)?, WHAT)?,
        })
    }
}

/// Sequence option token: `min;max;inc;start;cache;cycle`
pub fn squash_sequence(seq: &Sequence) -> String {
    format!(
        "{};{};{};{};{};{}",
        seq.min_value, seq.max_value, seq.increment, seq.start_with, seq.cache, seq.cycle
    )
}

pub fn unsquash_sequence(
    name: &str,
    schema: &str,
    token: &str,
) -> Result<Sequence, SerializerError> {
    const WHAT: &str = "postgres sequence";
    let parts = split_fields(token, ";", 6);
    Ok(Sequence {
        name: name.to_string(),
        schema: schema.to_string(),
        min_value: field(&parts, 0, WHAT, token)?.to_string(),
        max_value: field(&parts, 1, WHAT, token)?.to_string(),
        increment: field(&parts, 2, WHAT, token)?.to_string(),
        start_with: field(&parts, 3, WHAT, token)?.to_string(),
        cache: field(&parts, 4, WHAT, token)?.to_string(),
        cycle: parse_bool(field(&parts, 5, WHAT, token)?, WHAT)?,
    })
}

/// Replace every compound entity of the snapshot with its token
pub fn squash_snapshot(snapshot: &PgSnapshot) -> SquashedPgSnapshot {
    let tables = snapshot
        .tables
        .iter()
        .map(|(key, table)| {
            let mut identities = BTreeMap::new();
            let columns = table
                .columns
                .iter()
                .map(|(name, column)| {
                    let mut column = column.clone();
                    if let Some(identity) = column.identity.take() {
                        identities.insert(name.clone(), identity.squash());
                    }
                    (name.clone(), column)
                })
                .collect();
            let squashed = SquashedTable {
                name: table.name.clone(),
                schema: table.schema.clone(),
                columns,
                identities,
                indexes: squash_map(&table.indexes),
                foreign_keys: squash_map(&table.foreign_keys),
                composite_primary_keys: squash_map(&table.composite_primary_keys),
                unique_constraints: squash_map(&table.unique_constraints),
                check_constraints: squash_map(&table.check_constraints),
                policies: squash_map(&table.policies),
                is_rls_enabled: table.is_rls_enabled,
            };
            (key.clone(), squashed)
        })
        .collect();

    let sequences = snapshot
        .sequences
        .iter()
        .map(|(key, seq)| {
            (
                key.clone(),
                SquashedSequence {
                    name: seq.name.clone(),
                    schema: seq.schema.clone(),
                    values: squash_sequence(seq),
                },
            )
        })
        .collect();

    SquashedPgSnapshot {
        tables,
        enums: snapshot.enums.clone(),
        schemas: snapshot.schemas.clone(),
        sequences,
        roles: snapshot.roles.clone(),
        policies: squash_map(&snapshot.policies),
        views: snapshot.views.clone(),
    }
}
