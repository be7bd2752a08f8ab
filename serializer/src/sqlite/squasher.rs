//! SQLite token layouts

use super::snapshot::{
    CheckConstraint, ForeignKey, Index, PrimaryKey, SqliteSnapshot, SquashedSqliteSnapshot,
    SquashedTable, UniqueConstraint,
};
use crate::error::SerializerError;
use crate::squash::{Squash, join_columns, opt_to_field, squash_map};
use crate::utils::{field, opt_field, parse_bool, split_fields, split_list};

impl Squash for Index {
    fn squash(&self) -> String {
        format!(
            "{};{};{};{}",
            self.name,
            join_columns(&self.columns),
            self.is_unique,
            opt_to_field(self.where_clause.as_deref()),
        )
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "sqlite index";
        let parts = split_fields(token, ";", 4);
        Ok(Index {
            name: field(&parts, 0, WHAT, token)?.to_string(),
            columns: split_list(field(&parts, 1, WHAT, token)?),
            is_unique: parse_bool(field(&parts, 2, WHAT, token)?, WHAT)?,
            where_clause: opt_field(field(&parts, 3, WHAT, token)?),
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
        const WHAT: &str = "sqlite foreign key";
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

/// Columns first, name last
impl Squash for PrimaryKey {
    fn squash(&self) -> String {
        format!(
            "{};{}",
            join_columns(&self.columns),
            opt_to_field(self.name.as_deref())
        )
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "sqlite primary key";
        let parts = split_fields(token, ";", 2);
        Ok(PrimaryKey {
            columns: split_list(field(&parts, 0, WHAT, token)?),
            name: parts.get(1).and_then(|n| opt_field(n)),
        })
    }
}

impl Squash for UniqueConstraint {
    fn squash(&self) -> String {
        format!("{};{}", self.name, join_columns(&self.columns))
    }

    fn unsquash(token: &str) -> Result<Self, SerializerError> {
        const WHAT: &str = "sqlite unique constraint";
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
            .ok_or_else(|| SerializerError::decode("sqlite check constraint", token))?;
        Ok(CheckConstraint {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

pub fn squash_snapshot(snapshot: &SqliteSnapshot) -> SquashedSqliteSnapshot {
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
    SquashedSqliteSnapshot {
        tables,
        views: snapshot.views.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_index_keeps_where_clause() {
        let index = Index {
            name: "users_active_idx".into(),
            columns: vec!["email".into(), "lower(`name`)".into()],
            is_unique: true,
            where_clause: Some("`deleted_at` is null and `role` = 'a;b'".into()),
        };
        let token = index.squash();
        assert_eq!(
            token,
            "users_active_idx;email,lower(`name`);true;`deleted_at` is null and `role` = 'a;b'"
        );
        assert_eq!(Index::unsquash(&token).unwrap(), index);
    }

    #[test]
    fn primary_key_is_columns_first() {
        let pk = PrimaryKey {
            columns: vec!["a".into(), "b".into()],
            name: Some("t_a_b_pk".into()),
        };
        assert_eq!(pk.squash(), "a,b;t_a_b_pk");
        assert_eq!(PrimaryKey::unsquash("a,b;t_a_b_pk").unwrap(), pk);
        assert_eq!(PrimaryKey::unsquash("a,b").unwrap().name, None);
    }

    #[test]
    fn foreign_key_without_actions() {
        let token = "posts_author_users_id_fk;posts;author;users;id;;";
        let fk = ForeignKey::unsquash(token).unwrap();
        assert_eq!(fk.on_update, None);
        assert_eq!(fk.on_delete, None);
        assert_eq!(fk.squash(), token);
    }

    #[test]
    fn unique_and_check_tokens() {
        let unique = UniqueConstraint {
            name: "members_user_id_team_id_unique".into(),
            columns: vec!["user_id".into(), "team_id".into()],
        };
        assert_eq!(unique.squash(), "members_user_id_team_id_unique;user_id,team_id");
        assert_eq!(UniqueConstraint::unsquash(&unique.squash()).unwrap(), unique);

        let check = CheckConstraint {
            name: "price_check".into(),
            value: "`price` > 0 and `note` <> 'x;y'".into(),
        };
        assert_eq!(check.squash(), "price_check;`price` > 0 and `note` <> 'x;y'");
        assert_eq!(CheckConstraint::unsquash(&check.squash()).unwrap(), check);
        assert!(CheckConstraint::unsquash("no_separator").is_err());
    }

    #[test]
    fn truncated_index_is_a_decode_error() {
        assert!(matches!(
            Index::unsquash("only_name"),
            Err(SerializerError::Decode { .. })
        ));
    }
}
