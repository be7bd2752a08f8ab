//! SQLite statement rendering

use super::snapshot::{CheckConstraint, Column, ForeignKey, Index, PrimaryKey, UniqueConstraint};
use super::statements::SqliteStatement;
use crate::error::SerializerError;
use crate::snapshot::Internal;
use crate::squash::Squash;

pub fn convert(statement: &SqliteStatement) -> Result<Vec<String>, SerializerError> {
    let sql = match statement {
        SqliteStatement::CreateTable {
            table_name,
            columns,
            composite_pks,
            references,
            unique_constraints,
            check_constraints,
            internal,
        } => create_table(
            table_name,
            columns,
            composite_pks,
            references,
            unique_constraints,
            check_constraints,
            internal.as_ref(),
        )?,
        SqliteStatement::CreateIndex {
            table_name,
            data,
            internal,
        } => {
            let index = Index::unsquash(data)?;
            let mut sql = format!(
                "CREATE {}INDEX `{}` ON `{}` ({})",
                if index.is_unique { "UNIQUE " } else { "" },
                index.name,
                table_name,
                render_columns(internal.as_ref(), table_name, &index.name, &index.columns)
            );
            if let Some(where_clause) = &index.where_clause {
                sql.push_str(&format!(" WHERE {where_clause}"));
            }
            sql.push(';');
            sql
        }
        SqliteStatement::CreateView { name, definition } => {
            format!("CREATE VIEW `{name}` AS {definition};")
        }
    };
    Ok(vec![sql])
}

fn quote_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("`{c}`"))
        .collect::<Vec<_>>()
        .join(", ")
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

fn column_line(column: &Column) -> String {
    let mut line = format!("\t`{}` {}", column.name, column.sql_type);
    if column.primary_key {
        line.push_str(" PRIMARY KEY");
    }
    if column.autoincrement {
        line.push_str(" AUTOINCREMENT");
    }
    if let Some(default) = &column.default {
        line.push_str(&format!(" DEFAULT {default}"));
    }
    if let Some(generated) = &column.generated {
        line.push_str(&format!(
            " GENERATED ALWAYS AS {} {}",
            crate::utils::parenthesize(&generated.expression),
            generated.mode.as_str().to_ascii_uppercase()
        ));
    }
    if column.not_null {
        line.push_str(" NOT NULL");
    }
    line
}

fn create_table(
    table_name: &str,
    columns: &[Column],
    composite_pks: &[String],
    references: &[String],
    unique_constraints: &[String],
    check_constraints: &[String],
    internal: Option<&Internal>,
) -> Result<String, SerializerError> {
    let mut lines: Vec<String> = columns.iter().map(column_line).collect();

    for token in composite_pks {
        let pk = PrimaryKey::unsquash(token)?;
        lines.push(format!("\tPRIMARY KEY({})", quote_list(&pk.columns)));
    }

    for token in references {
        let fk = ForeignKey::unsquash(token)?;
        let mut line = format!(
            "\tFOREIGN KEY ({}) REFERENCES `{}`({})",
            quote_list(&fk.columns_from),
            fk.table_to,
            quote_list(&fk.columns_to)
        );
        if let Some(action) = &fk.on_update {
            line.push_str(&format!(" ON UPDATE {action}"));
        }
        if let Some(action) = &fk.on_delete {
            line.push_str(&format!(" ON DELETE {action}"));
        }
        lines.push(line);
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
    fn create_table_inlines_keys_and_references() {
        let mut a = Column::new("a", "integer");
        a.not_null = true;
        let mut b = Column::new("b", "integer");
        b.not_null = true;
        b.ordinal_position = 1;
        let pk = PrimaryKey {
            columns: vec!["a".into(), "b".into()],
            name: Some("links_a_b_pk".into()),
        };
        let fk = ForeignKey {
            name: "links_a_users_id_fk".into(),
            table_from: "links".into(),
            columns_from: vec!["a".into()],
            table_to: "users".into(),
            columns_to: vec!["id".into()],
            on_update: Some("no action".into()),
            on_delete: Some("cascade".into()),
        };
        let check = CheckConstraint {
            name: "b_positive".into(),
            value: "`b` > 0 and `b` != 'x'".into(),
        };
        let sql = convert(&SqliteStatement::CreateTable {
            table_name: "links".into(),
            columns: vec![a, b],
            composite_pks: vec![pk.squash()],
            references: vec![fk.squash()],
            unique_constraints: Vec::new(),
            check_constraints: vec![check.squash()],
            internal: None,
        })
        .unwrap();
        assert_eq!(
            sql[0],
            "CREATE TABLE `links` (\n\t`a` integer NOT NULL,\n\t`b` integer NOT NULL,\n\tPRIMARY KEY(`a`, `b`),\n\tFOREIGN KEY (`a`) REFERENCES `users`(`id`) ON UPDATE no action ON DELETE cascade,\n\tCONSTRAINT `b_positive` CHECK(`b` > 0 and `b` != 'x')\n);"
        );
        assert!(!sql[0].contains("ALTER TABLE"));
    }

    #[test]
    fn column_tokens_follow_sqlite_order() {
        let mut id = Column::new("id", "integer");
        id.primary_key = true;
        id.autoincrement = true;
        id.not_null = true;
        assert_eq!(
            column_line(&id),
            "\t`id` integer PRIMARY KEY AUTOINCREMENT NOT NULL"
        );

        let mut total = Column::new("total", "integer");
        total.generated = Some(Generated {
            expression: "(`qty` * `price`)".into(),
            mode: GeneratedMode::Stored,
        });
        assert_eq!(
            column_line(&total),
            "\t`total` integer GENERATED ALWAYS AS (`qty` * `price`) STORED"
        );
    }

    #[test]
    fn partial_index_renders_where() {
        let index = Index {
            name: "users_email_idx".into(),
            columns: vec!["email".into()],
            is_unique: true,
            where_clause: Some("`deleted_at` is null".into()),
        };
        let sql = convert(&SqliteStatement::CreateIndex {
            table_name: "users".into(),
            data: index.squash(),
            internal: None,
        })
        .unwrap();
        assert_eq!(
            sql[0],
            "CREATE UNIQUE INDEX `users_email_idx` ON `users` (`email`) WHERE `deleted_at` is null;"
        );
    }
}
