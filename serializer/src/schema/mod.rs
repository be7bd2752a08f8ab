//! Schema description DSL
//!
//! Schema descriptions are plain values built with the functions in this
//! module. A source file is modelled as a [`SchemaModule`]: an ordered list of
//! named exports, each tagged with what kind of object it is.

mod column;
mod entities;
mod relations;
mod sql;
mod table;
mod view;

pub use column::*;
pub use entities::*;
pub use relations::*;
pub use sql::{Sql, SqlChunk};
pub use table::*;
pub use view::*;

/// One exported value of a schema source file, tagged by capability
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaObject {
    Table(TableDef),
    View(ViewDef),
    MaterializedView(ViewDef),
    Enum(EnumDef),
    Sequence(SequenceDef),
    Role(RoleDef),
    Policy(PolicyDef),
    Namespace(NamespaceDef),
    Relations(RelationsDef),
}

impl From<TableDef> for SchemaObject {
    fn from(v: TableDef) -> Self {
        Self::Table(v)
    }
}

impl From<ViewDef> for SchemaObject {
    fn from(v: ViewDef) -> Self {
        if v.materialized {
            Self::MaterializedView(v)
        } else {
            Self::View(v)
        }
    }
}

impl From<EnumDef> for SchemaObject {
    fn from(v: EnumDef) -> Self {
        Self::Enum(v)
    }
}

impl From<SequenceDef> for SchemaObject {
    fn from(v: SequenceDef) -> Self {
        Self::Sequence(v)
    }
}

impl From<RoleDef> for SchemaObject {
    fn from(v: RoleDef) -> Self {
        Self::Role(v)
    }
}

impl From<PolicyDef> for SchemaObject {
    fn from(v: PolicyDef) -> Self {
        Self::Policy(v)
    }
}

impl From<NamespaceDef> for SchemaObject {
    fn from(v: NamespaceDef) -> Self {
        Self::Namespace(v)
    }
}

impl From<RelationsDef> for SchemaObject {
    fn from(v: RelationsDef) -> Self {
        Self::Relations(v)
    }
}

/// An evaluated schema source file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaModule {
    pub path: String,
    pub exports: Vec<(String, SchemaObject)>,
}

impl SchemaModule {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            exports: Vec::new(),
        }
    }

    #[must_use]
    pub fn export(mut self, name: impl Into<String>, object: impl Into<SchemaObject>) -> Self {
        self.exports.push((name.into(), object.into()));
        self
    }
}

/// Bucketed schema objects, merged across modules
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaObjectSet {
    pub tables: Vec<TableDef>,
    pub views: Vec<ViewDef>,
    pub materialized_views: Vec<ViewDef>,
    pub enums: Vec<EnumDef>,
    pub sequences: Vec<SequenceDef>,
    pub roles: Vec<RoleDef>,
    pub policies: Vec<PolicyDef>,
    pub namespaces: Vec<NamespaceDef>,
    pub relations: Vec<RelationsDef>,
}

impl SchemaObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    #[must_use]
    pub fn view(mut self, view: ViewDef) -> Self {
        if view.materialized {
            self.materialized_views.push(view);
        } else {
            self.views.push(view);
        }
        self
    }

    #[must_use]
    pub fn enum_type(mut self, e: EnumDef) -> Self {
        self.enums.push(e);
        self
    }

    #[must_use]
    pub fn sequence(mut self, s: SequenceDef) -> Self {
        self.sequences.push(s);
        self
    }

    #[must_use]
    pub fn role(mut self, r: RoleDef) -> Self {
        self.roles.push(r);
        self
    }

    #[must_use]
    pub fn policy(mut self, p: PolicyDef) -> Self {
        self.policies.push(p);
        self
    }

    #[must_use]
    pub fn namespace(mut self, n: NamespaceDef) -> Self {
        self.namespaces.push(n);
        self
    }

    #[must_use]
    pub fn relations(mut self, r: RelationsDef) -> Self {
        self.relations.push(r);
        self
    }

    /// Find a table by database name, optionally restricted to a schema
    pub fn find_table(&self, name: &str, schema: Option<&str>) -> Option<&TableDef> {
        self.tables.iter().find(|t| {
            t.name == name
                && schema.is_none_or(|s| t.schema.as_deref().unwrap_or("public") == s)
        })
    }

    /// All views, regular first
    pub fn all_views(&self) -> impl Iterator<Item = &ViewDef> {
        self.views.iter().chain(self.materialized_views.iter())
    }
}
