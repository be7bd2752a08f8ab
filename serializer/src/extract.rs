//! Schema object extraction
//!
//! Buckets the exports of every schema module into a [`SchemaObjectSet`] and
//! resolves declarative relations against the merged table map.

use std::collections::{BTreeMap, HashSet};

use crate::schema::{SchemaModule, SchemaObject, SchemaObjectSet};
use crate::snapshot::Relation;

/// Merge the exports of all modules into one object set.
///
/// Objects are deduplicated by canonical name; the first occurrence wins.
pub fn extract(modules: &[SchemaModule]) -> SchemaObjectSet {
    let mut set = SchemaObjectSet::default();
    let mut seen: HashSet<(&'static str, String)> = HashSet::new();

    for module in modules {
        for (export, object) in &module.exports {
            let key = match object {
                SchemaObject::Table(t) => ("table", t.canonical_name()),
                SchemaObject::View(v) | SchemaObject::MaterializedView(v) => {
                    ("view", v.canonical_name())
                }
                SchemaObject::Enum(e) => (
                    "enum",
                    format!("{}.{}", e.schema.as_deref().unwrap_or(""), e.name),
                ),
                SchemaObject::Sequence(s) => (
                    "sequence",
                    format!("{}.{}", s.schema.as_deref().unwrap_or(""), s.name),
                ),
                SchemaObject::Role(r) => ("role", r.name.clone()),
                SchemaObject::Policy(p) => (
                    "policy",
                    match &p.link {
                        Some(link) => format!(
                            "{}.{}.{}",
                            link.schema.as_deref().unwrap_or(""),
                            link.name,
                            p.name
                        ),
                        None => format!("..{}", p.name),
                    },
                ),
                SchemaObject::Namespace(n) => ("namespace", n.name.clone()),
                SchemaObject::Relations(r) => ("relations", r.table.clone()),
            };

            if !seen.insert(key.clone()) {
                tracing::debug!(
                    kind = key.0,
                    name = %key.1,
                    export = %export,
                    module = %module.path,
                    "skipping duplicate schema object"
                );
                continue;
            }

            match object {
                SchemaObject::Table(t) => set.tables.push(t.clone()),
                SchemaObject::View(v) => set.views.push(v.clone()),
                SchemaObject::MaterializedView(v) => set.materialized_views.push(v.clone()),
                SchemaObject::Enum(e) => set.enums.push(e.clone()),
                SchemaObject::Sequence(s) => set.sequences.push(s.clone()),
                SchemaObject::Role(r) => set.roles.push(r.clone()),
                SchemaObject::Policy(p) => set.policies.push(p.clone()),
                SchemaObject::Namespace(n) => set.namespaces.push(n.clone()),
                SchemaObject::Relations(r) => set.relations.push(r.clone()),
            }
        }
    }

    tracing::debug!(
        tables = set.tables.len(),
        views = set.views.len() + set.materialized_views.len(),
        enums = set.enums.len(),
        relations = set.relations.len(),
        "extracted schema objects"
    );
    set
}

/// Resolve relation declarations into per-table relation descriptors.
///
/// Keys of the returned map are table database names. Relations whose source
/// or target table is unknown are dropped with a warning; a field declared
/// twice on one table keeps its first declaration.
pub fn resolve_relations(set: &SchemaObjectSet) -> BTreeMap<String, Vec<Relation>> {
    let mut out: BTreeMap<String, Vec<Relation>> = BTreeMap::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for defs in &set.relations {
        if set.find_table(&defs.table, None).is_none() {
            tracing::warn!(table = %defs.table, "relations declared for an unknown table");
            continue;
        }
        for rel in &defs.relations {
            if set.find_table(&rel.target, None).is_none() {
                tracing::warn!(
                    table = %defs.table,
                    field = %rel.field_name,
                    target = %rel.target,
                    "relation target table not found"
                );
                continue;
            }
            if !seen.insert((defs.table.clone(), rel.field_name.clone())) {
                continue;
            }
            out.entry(defs.table.clone()).or_default().push(Relation {
                kind: rel.kind,
                field_name: rel.field_name.clone(),
                relation_name: rel
                    .relation_name
                    .clone()
                    .unwrap_or_else(|| format!("{}_{}", defs.table, rel.field_name)),
                referenced_table_name: rel.target.clone(),
            });
        }
    }
    out
}
