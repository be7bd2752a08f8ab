//! Schema-level entities: enums, sequences, roles, policies and namespaces

use serde::{Deserialize, Serialize};

use super::Sql;
use super::table::TableDef;

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub schema: Option<String>,
    pub values: Vec<String>,
}

pub fn pg_enum<I, S>(name: impl Into<String>, values: I) -> EnumDef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    EnumDef {
        name: name.into(),
        schema: None,
        values: values.into_iter().map(Into::into).collect(),
    }
}

impl EnumDef {
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Sequence options shared by standalone sequences and identity columns.
/// Unset fields receive defaults derived from the increment sign.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequenceOptions {
    pub increment: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub start_with: Option<i64>,
    pub cache: Option<i64>,
    pub cycle: Option<bool>,
}

impl SequenceOptions {
    #[must_use]
    pub fn increment(mut self, v: i64) -> Self {
        self.increment = Some(v);
        self
    }

    #[must_use]
    pub fn min_value(mut self, v: i64) -> Self {
        self.min_value = Some(v);
        self
    }

    #[must_use]
    pub fn max_value(mut self, v: i64) -> Self {
        self.max_value = Some(v);
        self
    }

    #[must_use]
    pub fn start_with(mut self, v: i64) -> Self {
        self.start_with = Some(v);
        self
    }

    #[must_use]
    pub fn cache(mut self, v: i64) -> Self {
        self.cache = Some(v);
        self
    }

    #[must_use]
    pub fn cycle(mut self, v: bool) -> Self {
        self.cycle = Some(v);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDef {
    pub name: String,
    pub schema: Option<String>,
    pub options: SequenceOptions,
}

pub fn sequence(name: impl Into<String>) -> SequenceDef {
    SequenceDef {
        name: name.into(),
        schema: None,
        options: SequenceOptions::default(),
    }
}

impl SequenceDef {
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: SequenceOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleDef {
    pub name: String,
    pub create_db: Option<bool>,
    pub create_role: Option<bool>,
    pub inherit: Option<bool>,
    /// Role managed outside this schema; recorded but never created
    pub existing: bool,
}

pub fn role(name: impl Into<String>) -> RoleDef {
    RoleDef {
        name: name.into(),
        ..RoleDef::default()
    }
}

impl RoleDef {
    #[must_use]
    pub fn create_db(mut self) -> Self {
        self.create_db = Some(true);
        self
    }

    #[must_use]
    pub fn create_role(mut self) -> Self {
        self.create_role = Some(true);
        self
    }

    #[must_use]
    pub fn no_inherit(mut self) -> Self {
        self.inherit = Some(false);
        self
    }

    #[must_use]
    pub fn existing(mut self) -> Self {
        self.existing = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyAs {
    Permissive,
    Restrictive,
}

impl PolicyAs {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "PERMISSIVE",
            Self::Restrictive => "RESTRICTIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PERMISSIVE" => Some(Self::Permissive),
            "RESTRICTIVE" => Some(Self::Restrictive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyFor {
    All,
    Select,
    Insert,
    Update,
    Delete,
}

impl PolicyFor {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Some(Self::All),
            "SELECT" => Some(Self::Select),
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Table a standalone policy is attached to
#[derive(Debug, Clone, PartialEq)]
pub struct TableLink {
    pub schema: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDef {
    pub name: String,
    pub as_: Option<PolicyAs>,
    pub for_: Option<PolicyFor>,
    pub to: Vec<String>,
    pub using: Option<Sql>,
    pub with_check: Option<Sql>,
    pub link: Option<TableLink>,
}

pub fn policy(name: impl Into<String>) -> PolicyDef {
    PolicyDef {
        name: name.into(),
        as_: None,
        for_: None,
        to: Vec::new(),
        using: None,
        with_check: None,
        link: None,
    }
}

impl PolicyDef {
    #[must_use]
    pub fn as_(mut self, as_: PolicyAs) -> Self {
        self.as_ = Some(as_);
        self
    }

    #[must_use]
    pub fn for_(mut self, for_: PolicyFor) -> Self {
        self.for_ = Some(for_);
        self
    }

    #[must_use]
    pub fn to<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.to = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn using(mut self, sql: impl Into<Sql>) -> Self {
        self.using = Some(sql.into());
        self
    }

    #[must_use]
    pub fn with_check(mut self, sql: impl Into<Sql>) -> Self {
        self.with_check = Some(sql.into());
        self
    }

    /// Attach a standalone policy to a table
    #[must_use]
    pub fn link(mut self, table: &TableDef) -> Self {
        self.link = Some(TableLink {
            schema: table.schema.clone(),
            name: table.name.clone(),
        });
        self
    }
}

/// A database schema (namespace) other than the default one
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDef {
    pub name: String,
}

pub fn namespace(name: impl Into<String>) -> NamespaceDef {
    NamespaceDef { name: name.into() }
}
