//! Rust source rendering shared by the per-dialect code generators
//!
//! Generated code targets the schema DSL of this crate. Relations are not
//! read back from the catalog; they are inferred from foreign keys.

use std::collections::{BTreeMap, HashMap, HashSet};

use heck::ToSnakeCase;

use crate::error::SerializerError;
use crate::schema::{ReferentialAction, RelationKind};
use crate::snapshot::Snapshot;

/// Import line every generated file starts with
pub const PRELUDE_IMPORT: &str = "use drizzle_kit::prelude::*;";

/// Generated schema and relations source text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedSource {
    pub schema: String,
    pub relations: String,
}

/// Render a snapshot as schema-description source
pub fn snapshot_to_source(snapshot: &Snapshot) -> Result<GeneratedSource, SerializerError> {
    let source = match snapshot {
        Snapshot::Postgres(s) => crate::postgres::codegen::generate(s)?,
        Snapshot::MySql(s) => crate::mysql::codegen::generate(s)?,
        Snapshot::Sqlite(s) => crate::sqlite::codegen::generate(s)?,
    };
    tracing::debug!(
        dialect = %snapshot.dialect(),
        bytes = source.schema.len() + source.relations.len(),
        "rendered schema source"
    );
    Ok(source)
}

/// Foreign key as seen by relation inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FkEdge {
    pub table_from: String,
    pub columns_from: Vec<String>,
    pub table_to: String,
    pub columns_to: Vec<String>,
}

/// One inferred relation field
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InferredRelation {
    pub field: String,
    pub kind: RelationKind,
    pub target: String,
    pub fields: Vec<String>,
    pub references: Vec<String>,
    pub relation_name: Option<String>,
}

/// `table_column_table_column`
pub(crate) fn relation_name(edge: &FkEdge) -> String {
    format!(
        "{}_{}_{}_{}",
        edge.table_from,
        edge.columns_from.join("_"),
        edge.table_to,
        edge.columns_to.join("_")
    )
}

/// Infer `one` relations on referencing tables and `many` relations on
/// referenced tables, keyed by table name.
///
/// When two tables are linked by more than one foreign key, or two inferred
/// fields of one table would share a name, the relation is named on both sides
/// and the field names are derived from the referencing columns.
pub(crate) fn infer_relations(edges: &[FkEdge]) -> BTreeMap<String, Vec<InferredRelation>> {
    let mut pair_count: HashMap<(&str, &str), usize> = HashMap::new();
    for e in edges {
        *pair_count
            .entry(ordered_pair(&e.table_from, &e.table_to))
            .or_default() += 1;
    }

    let mut plain_fields: HashMap<(&str, String), usize> = HashMap::new();
    for e in edges {
        *plain_fields
            .entry((e.table_from.as_str(), e.table_to.clone()))
            .or_default() += 1;
        *plain_fields
            .entry((e.table_to.as_str(), e.table_from.clone()))
            .or_default() += 1;
    }

    let mut out: BTreeMap<String, Vec<InferredRelation>> = BTreeMap::new();
    for e in edges {
        let ambiguous = pair_count[&ordered_pair(&e.table_from, &e.table_to)] > 1
            || plain_fields[&(e.table_from.as_str(), e.table_to.clone())] > 1
            || plain_fields[&(e.table_to.as_str(), e.table_from.clone())] > 1;

        let (one_field, many_field, name) = if ambiguous {
            let suffix = e.columns_from.join("_");
            (
                format!("{}_{suffix}", e.table_to),
                format!("{}_{suffix}", e.table_from),
                Some(relation_name(e)),
            )
        } else {
            (e.table_to.clone(), e.table_from.clone(), None)
        };

        out.entry(e.table_from.clone()).or_default().push(InferredRelation {
            field: one_field,
            kind: RelationKind::One,
            target: e.table_to.clone(),
            fields: e.columns_from.clone(),
            references: e.columns_to.clone(),
            relation_name: name.clone(),
        });
        out.entry(e.table_to.clone()).or_default().push(InferredRelation {
            field: many_field,
            kind: RelationKind::Many,
            target: e.table_from.clone(),
            fields: Vec::new(),
            references: Vec::new(),
            relation_name: name,
        });
    }

    // A self reference still yields two fields on one table
    for relations in out.values_mut() {
        let mut seen = HashSet::new();
        for r in relations.iter_mut() {
            if !seen.insert(r.field.clone()) {
                r.field = format!("{}_{}", r.field, r.kind.as_str());
                seen.insert(r.field.clone());
            }
        }
    }
    out
}

fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Source text of the relations file
pub(crate) fn relations_source(edges: &[FkEdge]) -> String {
    let mut code = String::new();
    code.push_str(PRELUDE_IMPORT);
    code.push('\n');

    for (table, relations) in infer_relations(edges) {
        code.push('\n');
        code.push_str(&format!(
            "pub fn {}_relations() -> RelationsDef {{\n    relations({})",
            ident(&table),
            lit(&table)
        ));
        for r in relations {
            match r.kind {
                RelationKind::One => code.push_str(&format!(
                    "\n        .one({}, {}, {}, {})",
                    lit(&r.field),
                    lit(&r.target),
                    lit_list(&r.fields),
                    lit_list(&r.references)
                )),
                RelationKind::Many => code.push_str(&format!(
                    "\n        .many({}, {})",
                    lit(&r.field),
                    lit(&r.target)
                )),
            }
            if let Some(name) = &r.relation_name {
                code.push_str(&format!("\n        .named({})", lit(name)));
            }
        }
        code.push_str("\n}\n");
    }
    code
}

/// Rust string literal
pub(crate) fn lit(s: &str) -> String {
    format!("{s:?}")
}

/// Rust array literal of strings
pub(crate) fn lit_list(items: &[String]) -> String {
    let inner: Vec<String> = items.iter().map(|s| lit(s)).collect();
    format!("[{}]", inner.join(", "))
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while",
];

/// Snake-case function name for a database identifier
pub(crate) fn ident(name: &str) -> String {
    let mut snake = name.to_snake_case();
    if snake.is_empty() {
        snake = "unnamed".to_string();
    }
    if snake.starts_with(|c: char| c.is_ascii_digit()) {
        snake.insert(0, '_');
    }
    if RUST_KEYWORDS.contains(&snake.as_str()) {
        format!("r#{snake}")
    } else {
        snake
    }
}

/// DSL expression for a referential action
pub(crate) fn action_expr(action: &str) -> Option<&'static str> {
    match ReferentialAction::parse(action)? {
        ReferentialAction::NoAction => None,
        ReferentialAction::Cascade => Some("ReferentialAction::Cascade"),
        ReferentialAction::Restrict => Some("ReferentialAction::Restrict"),
        ReferentialAction::SetNull => Some("ReferentialAction::SetNull"),
        ReferentialAction::SetDefault => Some("ReferentialAction::SetDefault"),
    }
}

/// `.foreign_key(...)` call for a table builder chain
pub(crate) fn foreign_key_call(
    name: &str,
    columns_from: &[String],
    table_to: &str,
    schema_to: Option<&str>,
    columns_to: &[String],
    on_update: Option<&str>,
    on_delete: Option<&str>,
) -> String {
    let mut call = format!(
        "\n        .foreign_key(\n            foreign_key({}, {}, {})",
        lit_list(columns_from),
        lit(table_to),
        lit_list(columns_to),
    );
    if let Some(schema) = schema_to.filter(|s| !s.is_empty() && *s != "public") {
        call.push_str(&format!("\n                .foreign_schema({})", lit(schema)));
    }
    call.push_str(&format!("\n                .name({})", lit(name)));
    if let Some(action) = on_delete.and_then(action_expr) {
        call.push_str(&format!("\n                .on_delete({action})"));
    }
    if let Some(action) = on_update.and_then(action_expr) {
        call.push_str(&format!("\n                .on_update({action})"));
    }
    call.push_str(",\n        )");
    call
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, cols_from: &[&str], to: &str, cols_to: &[&str]) -> FkEdge {
        FkEdge {
            table_from: from.to_string(),
            columns_from: cols_from.iter().map(|s| s.to_string()).collect(),
            table_to: to.to_string(),
            columns_to: cols_to.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn single_fk_yields_unnamed_pair() {
        let rels = infer_relations(&[edge("posts", &["author_id"], "users", &["id"])]);
        let posts = &rels["posts"];
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].kind, RelationKind::One);
        assert_eq!(posts[0].field, "users");
        assert_eq!(posts[0].relation_name, None);
        let users = &rels["users"];
        assert_eq!(users[0].kind, RelationKind::Many);
        assert_eq!(users[0].field, "posts");
    }

    #[test]
    fn two_fks_between_one_pair_are_named_on_both_sides() {
        let rels = infer_relations(&[
            edge("messages", &["sender_id"], "users", &["id"]),
            edge("messages", &["receiver_id"], "users", &["id"]),
        ]);
        let messages = &rels["messages"];
        assert_eq!(messages[0].field, "users_sender_id");
        assert_eq!(
            messages[0].relation_name.as_deref(),
            Some("messages_sender_id_users_id")
        );
        let users = &rels["users"];
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].field, "messages_receiver_id");
        assert_eq!(
            users[1].relation_name.as_deref(),
            Some("messages_receiver_id_users_id")
        );
    }

    #[test]
    fn self_reference_gets_distinct_fields() {
        let rels = infer_relations(&[edge("employees", &["manager_id"], "employees", &["id"])]);
        let fields: Vec<&str> = rels["employees"].iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields.len(), 2);
        assert_ne!(fields[0], fields[1]);
    }

    #[test]
    fn identifiers_are_rust_safe() {
        assert_eq!(ident("UserAccounts"), "user_accounts");
        assert_eq!(ident("type"), "r#type");
        assert_eq!(ident("2fa"), "_2fa");
    }

    #[test]
    fn relations_source_starts_with_import() {
        let code = relations_source(&[edge("posts", &["author_id"], "users", &["id"])]);
        assert!(code.starts_with(PRELUDE_IMPORT));
        assert!(code.contains("pub fn posts_relations() -> RelationsDef"));
        assert!(code.contains(".one(\"users\", \"users\", [\"author_id\"], [\"id\"])"));
        assert!(code.contains(".many(\"posts\", \"posts\")"));
    }
}
