//! Declarative relations between tables
//!
//! Relations describe how tables are navigated from application code. They
//! are independent of foreign keys: either may exist without the other.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    One,
    Many,
}

impl RelationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Many => "many",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationDef {
    pub field_name: String,
    pub kind: RelationKind,
    pub target: String,
    pub relation_name: Option<String>,
    pub fields: Vec<String>,
    pub references: Vec<String>,
}

/// Relations declared for one table
///
/// ```
/// use drizzle_serializer::schema::relations;
///
/// let rel = relations("posts")
///     .one("author", "users", ["authorId"], ["id"])
///     .named("post_author");
/// assert_eq!(rel.relations[0].relation_name.as_deref(), Some("post_author"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RelationsDef {
    pub table: String,
    pub relations: Vec<RelationDef>,
}

pub fn relations(table: impl Into<String>) -> RelationsDef {
    RelationsDef {
        table: table.into(),
        relations: Vec::new(),
    }
}

impl RelationsDef {
    #[must_use]
    pub fn one<I, S, J, T>(
        mut self,
        field_name: impl Into<String>,
        target: impl Into<String>,
        fields: I,
        references: J,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.relations.push(RelationDef {
            field_name: field_name.into(),
            kind: RelationKind::One,
            target: target.into(),
            relation_name: None,
            fields: fields.into_iter().map(Into::into).collect(),
            references: references.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn many(mut self, field_name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations.push(RelationDef {
            field_name: field_name.into(),
            kind: RelationKind::Many,
            target: target.into(),
            relation_name: None,
            fields: Vec::new(),
            references: Vec::new(),
        });
        self
    }

    /// Name the most recently added relation
    #[must_use]
    pub fn named(mut self, relation_name: impl Into<String>) -> Self {
        if let Some(last) = self.relations.last_mut() {
            last.relation_name = Some(relation_name.into());
        }
        self
    }
}
