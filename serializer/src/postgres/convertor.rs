//! PostgreSQL statement rendering

use heck::ToSnakeCase;
use serde_json::Value;

use super::snapshot::{Column, ForeignKey, Identity, Index, Policy, PrimaryKey, UniqueConstraint};
use super::statements::PgStatement;
use crate::error::SerializerError;
use crate::squash::Squash;
use crate::utils::quote_literal;
use drizzle_types::postgres::{RESERVED_POLICY_ROLES, is_native_type};

/// Render one statement into SQL text
pub fn convert(statement: &PgStatement) -> Result<Vec<String>, SerializerError> {
    let sql = match statement {
        PgStatement::CreateSchema { name } => format!("CREATE SCHEMA \"{name}\";"),
        PgStatement::CreateRole { name, values } => {
            let mut with = String::new();
            if values.create_db {
                with.push_str(" CREATEDB");
            }
            if values.create_role {
                with.push_str(" CREATEROLE");
            }
            if !values.inherit {
                with.push_str(" NOINHERIT");
            }
            if with.is_empty() {
                format!("CREATE ROLE \"{name}\";")
            } else {
                format!("CREATE ROLE \"{name}\" WITH{with};")
            }
        }
        PgStatement::CreateTypeEnum {
            name,
            schema,
            values,
        } => {
            let values = values
                .iter()
                .map(|v| quote_literal(v))
                .collect::<Vec<_>>()
                .join(", ");
            guard_duplicate(&format!(
                "CREATE TYPE {} AS ENUM({values})",
                qualified(schema, name)
            ))
        }
        PgStatement::CreateSequence {
            name,
            schema,
            values,
        } => {
            let mut sql = format!("CREATE SEQUENCE {}", qualified(schema, name));
            sql.push_str(&sequence_options(
                Some(&values.increment),
                Some(&values.min_value),
                Some(&values.max_value),
                Some(&values.start_with),
                Some(&values.cache),
                values.cycle,
            ));
            sql.push(';');
            sql
        }
        PgStatement::CreateTable {
            table_name,
            schema,
            columns,
            composite_pks,
            composite_pk_name,
            unique_constraints,
            check_constraints,
            ..
        } => create_table(
            table_name,
            schema,
            columns,
            composite_pks,
            composite_pk_name,
            unique_constraints,
            check_constraints,
        )?,
        PgStatement::EnableRls { table_name, schema } => format!(
            "ALTER TABLE {} ENABLE ROW LEVEL SECURITY;",
            qualified(schema, table_name)
        ),
        PgStatement::CreateReference { schema, data, .. } => {
            let fk = ForeignKey::unsquash(data)?;
            let mut sql = format!(
                "ALTER TABLE {} ADD CONSTRAINT \"{}\" FOREIGN KEY ({}) REFERENCES {}({})",
                qualified(schema, &fk.table_from),
                fk.name,
                quote_list(&fk.columns_from, ","),
                qualified(fk.schema_to.as_deref().unwrap_or(""), &fk.table_to),
                quote_list(&fk.columns_to, ","),
            );
            if let Some(on_delete) = &fk.on_delete {
                sql.push_str(&format!(" ON DELETE {on_delete}"));
            }
            if let Some(on_update) = &fk.on_update {
                sql.push_str(&format!(" ON UPDATE {on_update}"));
            }
            guard_duplicate(&sql)
        }
        PgStatement::CreateIndex {
            table_name,
            schema,
            data,
        } => create_index(table_name, schema, &Index::unsquash(data)?),
        PgStatement::CreateUniqueConstraint {
            table_name,
            schema,
            data,
        } => {
            let unique = UniqueConstraint::unsquash(data)?;
            format!(
                "ALTER TABLE {} ADD CONSTRAINT \"{}\" UNIQUE{}({});",
                qualified(schema, table_name),
                unique.name,
                if unique.nulls_not_distinct {
                    " NULLS NOT DISTINCT"
                } else {
                    ""
                },
                quote_list(&unique.columns, ","),
            )
        }
        PgStatement::CreateCompositePk {
            table_name,
            schema,
            data,
            constraint_name,
        } => {
            let pk = PrimaryKey::unsquash(data)?;
            format!(
                "ALTER TABLE {} ADD CONSTRAINT \"{}\" PRIMARY KEY({});",
                qualified(schema, table_name),
                constraint_name,
                quote_list(&pk.columns, ","),
            )
        }
        PgStatement::CreatePolicy {
            table_name,
            schema,
            data,
        } => create_policy(data, &qualified(schema, table_name)),
        PgStatement::CreateIndPolicy { table_name, data } => create_policy(data, table_name),
        PgStatement::CreateView {
            name,
            schema,
            definition,
            materialized,
            with,
            using,
            tablespace,
            with_no_data,
        } => {
            let mut sql = if *materialized {
                format!("CREATE MATERIALIZED VIEW {}", qualified(schema, name))
            } else {
                format!("CREATE VIEW {}", qualified(schema, name))
            };
            if let Some(using) = using {
                sql.push_str(&format!(" USING \"{using}\""));
            }
            if !with.is_empty() {
                let options = with
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k.to_snake_case(), option_value(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                sql.push_str(&format!(" WITH ({options})"));
            }
            if let Some(tablespace) = tablespace {
                sql.push_str(&format!(" TABLESPACE {tablespace}"));
            }
            sql.push_str(&format!(" AS ({definition})"));
            if *with_no_data {
                sql.push_str(" WITH NO DATA");
            }
            sql.push(';');
            sql
        }
    };
    Ok(vec![sql])
}

/// `"schema"."name"`, or `"name"` for the default schema
pub(crate) fn qualified(schema: &str, name: &str) -> String {
    if schema.is_empty() {
        format!("\"{name}\"")
    } else {
        format!("\"{schema}\".\"{name}\"")
    }
}

fn quote_list(columns: &[String], sep: &str) -> String {
    columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(sep)
}

fn guard_duplicate(statement: &str) -> String {
    format!(
        "DO $$ BEGIN\n {statement};\nEXCEPTION\n WHEN duplicate_object THEN null;\nEND $$;"
    )
}

fn option_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Split a type into its base and array suffix (`text[][]` -> `text`, `[][]`)
fn split_array_suffix(sql_type: &str) -> (&str, &str) {
    match sql_type.find('[') {
        Some(i)
            if sql_type[i..]
                .chars()
                .all(|c| c == '[' || c == ']' || c.is_ascii_digit()) =>
        {
            (&sql_type[..i], &sql_type[i..])
        }
        _ => (sql_type, ""),
    }
}

/// Column type as written in DDL: native types bare, user types quoted and
/// schema-qualified outside `public`
pub(crate) fn render_type(sql_type: &str, type_schema: Option<&str>) -> String {
    if is_native_type(sql_type) {
        return sql_type.to_string();
    }
    let (base, array) = split_array_suffix(sql_type);
    let prefix = match type_schema {
        Some(s) if !s.is_empty() && s != "public" => format!("\"{s}\"."),
        _ => String::new(),
    };
    format!("{prefix}\"{base}\"{array}")
}

fn sequence_options(
    increment: Option<&str>,
    min: Option<&str>,
    max: Option<&str>,
    start: Option<&str>,
    cache: Option<&str>,
    cycle: bool,
) -> String {
    let mut out = String::new();
    for (keyword, value) in [
        ("INCREMENT BY", increment),
        ("MINVALUE", min),
        ("MAXVALUE", max),
        ("START WITH", start),
        ("CACHE", cache),
    ] {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            out.push_str(&format!(" {keyword} {v}"));
        }
    }
    if cycle {
        out.push_str(" CYCLE");
    }
    out
}

fn column_line(schema: &str, column: &Column) -> String {
    let mut line = format!(
        "\t\"{}\" {}",
        column.name,
        render_type(&column.sql_type, column.type_schema.as_deref())
    );
    if column.primary_key {
        line.push_str(" PRIMARY KEY");
    }
    if let Some(default) = &column.default {
        line.push_str(&format!(" DEFAULT {default}"));
    }
    if let Some(generated) = &column.generated {
        line.push_str(&format!(" GENERATED ALWAYS AS ({}) STORED", generated.expression));
    }
    if column.not_null && column.identity.is_none() {
        line.push_str(" NOT NULL");
    }
    if column.is_unique {
        line.push_str(&format!(
            " CONSTRAINT \"{}\" UNIQUE",
            column.unique_name.as_deref().unwrap_or_default()
        ));
        if column.nulls_not_distinct {
            line.push_str(" NULLS NOT DISTINCT");
        }
    }
    if let Some(identity) = &column.identity {
        line.push_str(&identity_clause(schema, identity));
    }
    line
}

fn identity_clause(schema: &str, identity: &Identity) -> String {
    let kind = match identity.kind {
        crate::schema::IdentityKind::Always => "ALWAYS",
        crate::schema::IdentityKind::ByDefault => "BY DEFAULT",
    };
    format!(
        " GENERATED {kind} AS IDENTITY (sequence name {}{})",
        qualified(schema, &identity.name),
        sequence_options(
            identity.increment.as_deref(),
            identity.min_value.as_deref(),
            identity.max_value.as_deref(),
            identity.start_with.as_deref(),
            identity.cache.as_deref(),
            identity.cycle,
        )
    )
}

fn create_table(
    table_name: &str,
    schema: &str,
    columns: &[Column],
    composite_pks: &[String],
    composite_pk_name: &str,
    unique_constraints: &[String],
    check_constraints: &[String],
) -> Result<String, SerializerError> {
    let mut lines: Vec<String> = columns.iter().map(|c| column_line(schema, c)).collect();

    if let Some(token) = composite_pks.first() {
        let pk = PrimaryKey::unsquash(token)?;
        let name = if composite_pk_name.is_empty() {
            pk.name.as_str()
        } else {
            composite_pk_name
        };
        lines.push(format!(
            "\tCONSTRAINT \"{}\" PRIMARY KEY({})",
            name,
            quote_list(&pk.columns, ",")
        ));
    }

    for token in unique_constraints {
        let unique = UniqueConstraint::unsquash(token)?;
        lines.push(format!(
            "\tCONSTRAINT \"{}\" UNIQUE{}({})",
            unique.name,
            if unique.nulls_not_distinct {
                " NULLS NOT DISTINCT"
            } else {
                ""
            },
            quote_list(&unique.columns, ",")
        ));
    }

    for token in check_constraints {
        let check = super::snapshot::CheckConstraint::unsquash(token)?;
        lines.push(format!("\tCONSTRAINT \"{}\" CHECK ({})", check.name, check.value));
    }

    Ok(format!(
        "CREATE TABLE {} (\n{}\n);",
        qualified(schema, table_name),
        lines.join(",\n")
    ))
}

fn create_index(table_name: &str, schema: &str, index: &Index) -> String {
    let columns = index
        .columns
        .iter()
        .map(|c| {
            let mut part = if c.is_expression {
                c.expression.clone()
            } else {
                format!("\"{}\"", c.expression)
            };
            match &c.opclass {
                Some(opclass) => part.push_str(&format!(" {opclass}")),
                None if !c.asc => part.push_str(" DESC"),
                None => {}
            }
            let default_nulls = c.asc && c.nulls == "last";
            if !default_nulls && c.opclass.is_none() {
                part.push_str(&format!(" NULLS {}", c.nulls.to_ascii_uppercase()));
            }
            part
        })
        .collect::<Vec<_>>()
        .join(",");

    let mut sql = format!(
        "CREATE {}INDEX{} \"{}\" ON {} USING {} ({})",
        if index.is_unique { "UNIQUE " } else { "" },
        if index.concurrently { " CONCURRENTLY" } else { "" },
        index.name,
        qualified(schema, table_name),
        index.method,
        columns
    );
    if !index.with.is_empty() {
        let with = index
            .with
            .iter()
            .map(|(k, v)| format!("{k}={}", option_value(v)))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" WITH ({with})"));
    }
    if let Some(where_clause) = &index.where_clause {
        sql.push_str(&format!(" WHERE {where_clause}"));
    }
    sql.push(';');
    sql
}

fn create_policy(policy: &Policy, target: &str) -> String {
    let to = policy
        .to
        .iter()
        .map(|role| {
            if RESERVED_POLICY_ROLES.contains(&role.as_str()) {
                role.clone()
            } else {
                format!("\"{role}\"")
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!(
        "CREATE POLICY \"{}\" ON {} AS {} FOR {} TO {}",
        policy.name,
        target,
        policy.as_.as_str(),
        policy.for_.as_str(),
        to
    );
    if let Some(using) = &policy.using {
        sql.push_str(&format!(" USING ({using})"));
    }
    if let Some(with_check) = &policy.with_check {
        sql.push_str(&format!(" WITH CHECK ({with_check})"));
    }
    sql.push(';');
    sql
}
