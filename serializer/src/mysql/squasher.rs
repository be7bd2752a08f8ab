//! MySQL token layouts

use super::snapshot::{
    CheckConstraint, ForeignKey, Index, MySqlSnapshot, PrimaryKey, SquashedMySqlSnapshot,
    SquashedTable, SquashedView, UniqueConstraint, View,
};
use crate::error::SerializerError;
use crate::squash::{Squash, join_columns, opt_to_field, squash_map};
use crate::utils::{field, opt_field, parse_bool, split_fields, split_list};

impl Squash for Index {
    fn squash(&self) -> String {
        format!(
            "{};{};{};{};{};{}",
            self.name,
            join_columns(&self.columns),
            self.is_unique,
            opt_to_field(self.using.as_deref()),
            opt_to_field(self.algorithm.as_deref()),
            opt_to_field(self.lock.as_deref()),
        )
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "mysql index";
        let parts = split_fields(token, ";", 6);
        Ok(Index {
            name: field(&parts, 0, WHAT, token)?.to_string(),
            columns: split_list(field(&parts, 1, WHAT, token)?),
            is_unique: parse_bool(field(&parts, 2, WHAT, token)?, WHAT)?,
            using: opt_field(field(&parts, 3, WHAT, token)?),
            algorithm: opt_field(field(&parts, 4, WHAT, token)?),
            lock: opt_field(field(&parts, 5, WHAT, token)?),
        })
    }
}

impl Squash for ForeignKey {
    fn squash(&self) -> String {
        format!(
            "{};{};{};{};{};{};{}",
            self.name,
            self.table_from,
            join_columns(&self.columns_from),
            self.table_to,
            join_columns(&self.columns_to),
            opt_to_field(self.on_update.as_deref()),
            opt_to_field(self.on_delete.as_deref()),
        )
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "mysql foreign key";
        let parts = split_fields(token, ";", 7);
        Ok(ForeignKey {
            name: field(&parts, 0, WHAT, token)?.to_string(),
            table_from: field(&parts, 1, WHAT, token)?.to_string(),
            columns_from: split_list(field(&parts, 2, WHAT, token)?),
            table_to: field(&parts, 3, WHAT, token)?.to_string(),
            columns_to: split_list(field(&parts, 4, WHAT, token)?),
            on_update: opt_field(field(&parts, 5, WHAT, token)?),
            on_delete: opt_field(field(&parts, 6, WHAT, token)?),
        })
    }
}

impl Squash for PrimaryKey {
    fn squash(&self) -> String {
        format!("{};{}", self.name, join_columns(&self.columns))
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "mysql primary key";
        let parts = split_fields(token, ";", 2);
        Ok(PrimaryKey {
            name: field(&parts, 0, WHAT, token)?.to_string(),
            columns: split_list(field(&parts, 1, WHAT, token)?),
        })
    }
}

impl Squash for UniqueConstraint {
    fn squash(&self) -> String {
        format!("{};{}", self.name, join_columns(&self.columns))
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "mysql unique constraint";
        let parts = split_fields(token, ";", 2);
        Ok(UniqueConstraint {
            name: field(&parts, 0, WHAT, token)?.to_string(),
            columns: split_list(field(&parts, 1, WHAT, token)?),
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
            .ok_or_else(|| SerializerError::decode("mysql check constraint", token))?;
        Ok(CheckConstraint {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// View options token: `algorithm;sqlSecurity;withCheckOption`
pub fn squash_view_meta(view: &View) -> String {
    format!(
        "{};{};{}",
        view.algorithm,
        view.sql_security,
        opt_to_field(view.with_check_option.as_deref())
    )
}

/// Decode a view options token into `(algorithm, sql_security, with_check_option)`
pub fn unsquash_view_meta(
    token: &str,
) -> Result<(String, String, Option<String>), SerializerError> {
    const WHAT: &str = "mysql view options";
    let parts = split_fields(token, ";", 3);
    Ok((
        field(&parts, 0, WHAT, token)?.to_string(),
        field(&parts, 1, WHAT, token)?.to_string(),
        opt_field(field(&parts, 2, WHAT, token)?),
    ))
}

pub fn squash_snapshot(snapshot: &MySqlSnapshot) -> SquashedMySqlSnapshot {
    let tables = snapshot
        .tables
        .iter()
        .map(|(key, table)| {
            (
                key.clone(),
                SquashedTable {
                    name: table.name.clone(),
                    columns: table.columns.clone(),
                    indexes: squash_map(&table.indexes),
                    foreign_keys: squash_map(&table.foreign_keys),
                    composite_primary_keys: squash_map(&table.composite_primary_keys),
                    unique_constraints: squash_map(&table.unique_constraints),
                    check_constraints: squash_map(&table.check_constraints),
                },
            )
        })
        .collect();
    let views = snapshot
        .views
        .iter()
        .map(|(key, view)| {
            (
                key.clone(),
                SquashedView {
                    name: view.name.clone(),
                    definition: view.definition.clone(),
                    is_existing: view.is_existing,
                    meta: squash_view_meta(view),
                },
            )
        })
        .collect();
    SquashedMySqlSnapshot { tables, views }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn index_token_layout() {
        let index = Index {
            name: "users_name_idx".into(),
            columns: vec!["name".into(), "lower(`email`)".into()],
            is_unique: false,
            using: Some("btree".into()),
            algorithm: None,
            lock: Some("none".into()),
        };
        assert_eq!(
            index.squash(),
            "users_name_idx;name,lower(`email`);false;btree;;none"
        );
        assert_eq!(Index::unsquash(&index.squash()).unwrap(), index);
    }

    #[test]
    fn unique_index_without_options() {
        let index = Index {
            name: "users_email_idx".into(),
            columns: vec!["email".into()],
            is_unique: true,
            using: None,
            algorithm: None,
            lock: None,
        };
        assert_eq!(index.squash(), "users_email_idx;email;true;;;");
        assert_eq!(Index::unsquash(&index.squash()).unwrap(), index);
    }

    #[test]
    fn unique_constraint_round_trip() {
        let unique = UniqueConstraint {
            name: "users_email_org_unique".into(),
            columns: vec!["email".into(), "org_id".into()],
        };
        assert_eq!(unique.squash(), "users_email_org_unique;email,org_id");
        assert_eq!(UniqueConstraint::unsquash(&unique.squash()).unwrap(), unique);
    }

    #[test]
    fn foreign_key_round_trip() {
        let fk = ForeignKey {
            name: "posts_author_id_users_id_fk".into(),
            table_from: "posts".into(),
            columns_from: vec!["author_id".into()],
            table_to: "users".into(),
            columns_to: vec!["id".into()],
            on_update: Some("no action".into()),
            on_delete: Some("cascade".into()),
        };
        assert_eq!(
            fk.squash(),
            "posts_author_id_users_id_fk;posts;author_id;users;id;no action;cascade"
        );
        assert_eq!(ForeignKey::unsquash(&fk.squash()).unwrap(), fk);
    }

    #[test]
    fn primary_key_is_name_first() {
        let pk = PrimaryKey {
            name: "members_user_id_team_id_pk".into(),
            columns: vec!["user_id".into(), "team_id".into()],
        };
        assert_eq!(pk.squash(), "members_user_id_team_id_pk;user_id,team_id");
        assert_eq!(PrimaryKey::unsquash(&pk.squash()).unwrap(), pk);
    }

    #[test]
    fn check_keeps_quotes() {
        let check = CheckConstraint {
            name: "status_check".into(),
            value: "`status` <> 'draft;old'".into(),
        };
        assert_eq!(CheckConstraint::unsquash(&check.squash()).unwrap(), check);
    }

    #[test]
    fn view_meta() {
        let view = View {
            name: "active".into(),
            columns: BTreeMap::new(),
            definition: Some("select 1".into()),
            is_existing: false,
            algorithm: "merge".into(),
            sql_security: "invoker".into(),
            with_check_option: Some("cascaded".into()),
        };
        let token = squash_view_meta(&view);
        assert_eq!(token, "merge;invoker;cascaded");
        assert_eq!(
            unsquash_view_meta(&token).unwrap(),
            ("merge".to_string(), "invoker".to_string(), Some("cascaded".to_string()))
        );
        assert_eq!(unsquash_view_meta("undefined;definer;").unwrap().2, None);
    }
}
