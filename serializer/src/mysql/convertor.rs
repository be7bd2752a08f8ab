//! MySQL statement rendering

use super::snapshot::{CheckConstraint, Column, ForeignKey, Index, PrimaryKey, UniqueConstraint};
use super::statements::MySqlStatement;
use crate::error::SerializerError;
use crate::snapshot::Internal;
use crate::squash::Squash;

pub fn convert(statement: &MySqlStatement) -> Result<Vec<String>, SerializerError> {
    let sql = match statement {
        MySqlStatement::CreateTable {
            table_name,
            columns,
            composite_pks,
            composite_pk_name,
            unique_constraints,
            check_constraints,
            internal,
        } => create_table(
            table_name,
            columns,
            composite_pks,
            composite_pk_name,
            unique_constraints,
            check_constraints,
            internal.as_ref(),
        )?,
        MySqlStatement::CreateReference { table_name, data } => {
            let fk = ForeignKey::unsquash(data)?;
            format!(
                "ALTER TABLE `{}` ADD CONSTRAINT `{}` FOREIGN KEY ({}) REFERENCES `{}`({}) ON DELETE {} ON UPDATE {};",
                table_name,
                fk.name,
                quote_list(&fk.columns_from),
                fk.table_to,
                quote_list(&fk.columns_to),
                fk.on_delete.as_deref().unwrap_or("no action"),
                fk.on_update.as_deref().unwrap_or("no action"),
            )
        }
        MySqlStatement::CreateIndex {
            table_name,
            data,
            internal,
        } => {
            let index = Index::unsquash(data)?;
            let columns = render_columns(internal.as_ref(), table_name, &index.name, &index.columns);
            format!(
                "CREATE {}INDEX `{}` ON `{}` ({});",
                if index.is_unique { "UNIQUE " } else { "" },
                index.name,
                table_name,
                columns
            )
        }
        MySqlStatement::CreateUniqueConstraint { table_name, data } => {
            let unique = UniqueConstraint::unsquash(data)?;
            format!(
                "ALTER TABLE `{}` ADD CONSTRAINT `{}` UNIQUE({});",
                table_name,
                unique.name,
                quote_list(&unique.columns)
            )
        }
        MySqlStatement::CreateCompositePk {
            table_name, data, ..
        } => {
            let pk = PrimaryKey::unsquash(data)?;
            format!(
                "ALTER TABLE `{}` ADD PRIMARY KEY({});",
                table_name,
                quote_list(&pk.columns)
            )
        }
        MySqlStatement::CreateView {
            name,
            definition,
            algorithm,
            sql_security,
            with_check_option,
        } => {
            let mut sql = format!(
                "CREATE ALGORITHM = {algorithm}\nSQL SECURITY {sql_security}\nVIEW `{name}` AS ({definition})"
            );
            if let Some(option) = with_check_option {
                sql.push_str(&format!("\nWITH {option} CHECK OPTION"));
            }
            sql.push(';');
            sql
        }
    };
    Ok(vec![sql])
}

fn quote_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("`{c}`"))
        .collect::<Vec<_>>()
        .join(",")
}

fn render_columns(
    internal: Option<&Internal>,
    table: &str,
    constraint: &str,
    columns: &[String],
) -> String {
    columns
        .iter()
        .map(|c| match internal {
            Some(internal) => internal.render_column(table, constraint, c, |c| format!("`{c}`")),
            None => format!("`{c}`"),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// One column definition line, tokens in MySQL order
fn column_line(column: &Column) -> String {
    let mut line = format!("\t`{}` {}", column.name, column.sql_type);
    if column.autoincrement {
        line.push_str(" AUTO_INCREMENT");
    }
    if column.primary_key {
        line.push_str(" PRIMARY KEY");
    }
    if let Some(generated) = &column.generated {
        line.push_str(&format!(
            " GENERATED ALWAYS AS ({}) {}",
            generated.expression,
            generated.mode.as_str().to_ascii_uppercase()
        ));
    }
    if column.not_null {
        line.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        line.push_str(&format!(" DEFAULT {default}"));
    }
    if column.on_update == Some(true) {
        line.push_str(" ON UPDATE CURRENT_TIMESTAMP");
    }
    line
}

fn create_table(
    table_name: &str,
    columns: &[Column],
    composite_pks: &[String],
    composite_pk_name: &str,
    unique_constraints: &[String],
    check_constraints: &[String],
    internal: Option<&Internal>,
) -> Result<String, SerializerError> {
    let mut lines: Vec<String> = columns.iter().map(column_line).collect();

    if let Some(token) = composite_pks.first() {
        let pk = PrimaryKey::unsquash(token)?;
        let name = if composite_pk_name.is_empty() {
            pk.name.as_str()
        } else {
            composite_pk_name
        };
        lines.push(format!(
            "\tCONSTRAINT `{}` PRIMARY KEY({})",
            name,
            quote_list(&pk.columns)
        ));
    }

    for token in unique_constraints {
        let unique = UniqueConstraint::unsquash(token)?;
        lines.push(format!(
            "\tCONSTRAINT `{}` UNIQUE({})",
            unique.name,
            render_columns(internal, table_name, &unique.name, &unique.columns)
        ));
    }

    for token in check_constraints {
        let check = CheckConstraint::unsquash(token)?;
        lines.push(format!("\tCONSTRAINT `{}` CHECK({})", check.name, check.value));
    }

    Ok(format!(
        "CREATE TABLE `{}` (\n{}\n);",
        table_name,
        lines.join(",\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::GeneratedMode;
    use crate::snapshot::Generated;

    #[test]
    fn column_tokens_follow_mysql_order() {
        let mut id = Column::new("id", "int");
        id.autoincrement = true;
        id.primary_key = true;
        id.not_null = true;
        assert_eq!(column_line(&id), "\t`id` int AUTO_INCREMENT PRIMARY KEY NOT NULL");

        let mut updated = Column::new("updated_at", "timestamp");
        updated.not_null = true;
        updated.default = Some("(now())".into());
        updated.on_update = Some(true);
        assert_eq!(
            column_line(&updated),
            "\t`updated_at` timestamp NOT NULL DEFAULT (now()) ON UPDATE CURRENT_TIMESTAMP"
        );

        let mut full = Column::new("full_name", "text");
        full.generated = Some(Generated {
            expression: "concat(`first`, ' ', `last`)".into(),
            mode: GeneratedMode::Stored,
        });
        assert_eq!(
            column_line(&full),
            "\t`full_name` text GENERATED ALWAYS AS (concat(`first`, ' ', `last`)) STORED"
        );
    }

    #[test]
    fn expression_index_columns_are_not_quoted() {
        let index = Index {
            name: "users_lower_email_idx".into(),
            columns: vec!["lower(`email`)".into(), "name".into()],
            is_unique: true,
            using: None,
            algorithm: None,
            lock: None,
        };
        let mut internal = Internal::default();
        internal.mark_expression("users", "users_lower_email_idx", "lower(`email`)");
        let sql = convert(&MySqlStatement::CreateIndex {
            table_name: "users".into(),
            data: index.squash(),
            internal: Some(internal),
        })
        .unwrap();
        assert_eq!(
            sql[0],
            "CREATE UNIQUE INDEX `users_lower_email_idx` ON `users` (lower(`email`),`name`);"
        );
    }

    #[test]
    fn views_carry_algorithm_and_security() {
        let sql = convert(&MySqlStatement::CreateView {
            name: "active_users".into(),
            definition: "select * from `users` where `active` = 1".into(),
            algorithm: "merge".into(),
            sql_security: "invoker".into(),
            with_check_option: Some("cascaded".into()),
        })
        .unwrap();
        assert_eq!(
            sql[0],
            "CREATE ALGORITHM = merge\nSQL SECURITY invoker\nVIEW `active_users` AS (select * from `users` where `active` = 1)\nWITH cascaded CHECK OPTION;"
        );
    }
}
