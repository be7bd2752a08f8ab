//! Column definitions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Sql;
use super::entities::{EnumDef, SequenceOptions};

/// Default value of a column before dialect formatting
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Sql(Sql),
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Json(Value),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
    Bytes(Vec<u8>),
}

impl From<Sql> for DefaultValue {
    fn from(sql: Sql) -> Self {
        Self::Sql(sql)
    }
}

impl From<&str> for DefaultValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for DefaultValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for DefaultValue {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for DefaultValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for DefaultValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Value> for DefaultValue {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<NaiveDate> for DefaultValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<DateTime<Utc>> for DefaultValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Vec<u8>> for DefaultValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedMode {
    Stored,
    #[default]
    Virtual,
}

impl GeneratedMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Virtual => "virtual",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDef {
    pub expression: Sql,
    pub mode: GeneratedMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Always,
    #[serde(rename = "byDefault")]
    ByDefault,
}

impl IdentityKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::ByDefault => "byDefault",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "always" => Some(Self::Always),
            "byDefault" => Some(Self::ByDefault),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityDef {
    pub kind: IdentityKind,
    pub sequence_name: Option<String>,
    pub options: SequenceOptions,
}

/// Foreign key action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    #[default]
    NoAction,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cascade => "cascade",
            Self::Restrict => "restrict",
            Self::NoAction => "no action",
            Self::SetNull => "set null",
            Self::SetDefault => "set default",
        }
    }

    /// Parse an action as catalogs and snapshots spell it, in any case
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Some(Self::Cascade),
            "restrict" => Some(Self::Restrict),
            "no action" => Some(Self::NoAction),
            "set null" => Some(Self::SetNull),
            "set default" => Some(Self::SetDefault),
            _ => None,
        }
    }
}

/// Inline `references(...)` on a column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReference {
    pub table: String,
    pub schema: Option<String>,
    pub column: String,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

/// Column-level unique marker
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UniqueMarker {
    pub name: Option<String>,
    pub nulls_not_distinct: bool,
}

/// Reference from a Postgres column to an enum type
#[derive(Debug, Clone, PartialEq)]
pub struct EnumRef {
    pub name: String,
    pub schema: Option<String>,
}

/// A column as declared in a schema description
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// In-source identifier; the storage name is derived from it unless
    /// `name` is set
    pub key: String,
    pub name: Option<String>,
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub default: Option<DefaultValue>,
    pub unique: Option<UniqueMarker>,
    pub generated: Option<GeneratedDef>,
    pub identity: Option<IdentityDef>,
    pub autoincrement: bool,
    pub on_update_now: bool,
    pub enum_ref: Option<EnumRef>,
    pub enum_values: Vec<String>,
    pub references: Option<ColumnReference>,
    pub comment: Option<String>,
}

/// Start a column definition
///
/// ```
/// use drizzle_serializer::schema::column;
///
/// let id = column("id", "integer").primary_key();
/// assert!(id.not_null);
/// ```
pub fn column(key: impl Into<String>, sql_type: impl Into<String>) -> ColumnDef {
    ColumnDef::new(key, sql_type)
}

/// Postgres column typed by an enum
pub fn enum_column(key: impl Into<String>, enum_def: &EnumDef) -> ColumnDef {
    let mut col = ColumnDef::new(key, enum_def.name.clone());
    col.enum_ref = Some(EnumRef {
        name: enum_def.name.clone(),
        schema: enum_def.schema.clone(),
    });
    col.enum_values = enum_def.values.clone();
    col
}

/// MySQL `enum(...)` column
pub fn mysql_enum<I, S>(key: impl Into<String>, values: I) -> ColumnDef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ColumnDef::new(key, "enum").enum_values(values)
}

impl ColumnDef {
    pub fn new(key: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: None,
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            default: None,
            unique: None,
            generated: None,
            identity: None,
            autoincrement: false,
            on_update_now: false,
            enum_ref: None,
            enum_values: Vec::new(),
            references: None,
            comment: None,
        }
    }

    /// Explicit storage name, bypassing the casing policy
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the column as primary key; primary keys are always not null.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Default given as a raw SQL expression
    #[must_use]
    pub fn default_sql(self, expr: impl Into<String>) -> Self {
        self.default(Sql::raw(expr))
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique.get_or_insert_with(UniqueMarker::default);
        self
    }

    #[must_use]
    pub fn unique_named(mut self, name: impl Into<String>) -> Self {
        self.unique.get_or_insert_with(UniqueMarker::default).name = Some(name.into());
        self
    }

    #[must_use]
    pub fn nulls_not_distinct(mut self) -> Self {
        self.unique
            .get_or_insert_with(UniqueMarker::default)
            .nulls_not_distinct = true;
        self
    }

    #[must_use]
    pub fn generated_stored(mut self, expression: impl Into<Sql>) -> Self {
        self.generated = Some(GeneratedDef {
            expression: expression.into(),
            mode: GeneratedMode::Stored,
        });
        self
    }

    #[must_use]
    pub fn generated_virtual(mut self, expression: impl Into<Sql>) -> Self {
        self.generated = Some(GeneratedDef {
            expression: expression.into(),
            mode: GeneratedMode::Virtual,
        });
        self
    }

    /// `GENERATED ALWAYS AS IDENTITY` with default sequence options
    #[must_use]
    pub fn identity_always(self) -> Self {
        self.identity(IdentityKind::Always, SequenceOptions::default())
    }

    /// `GENERATED BY DEFAULT AS IDENTITY` with default sequence options
    #[must_use]
    pub fn identity_by_default(self) -> Self {
        self.identity(IdentityKind::ByDefault, SequenceOptions::default())
    }

    #[must_use]
    pub fn identity(mut self, kind: IdentityKind, options: SequenceOptions) -> Self {
        self.identity = Some(IdentityDef {
            kind,
            sequence_name: None,
            options,
        });
        self.not_null = true;
        self
    }

    #[must_use]
    pub fn identity_sequence_name(mut self, name: impl Into<String>) -> Self {
        if let Some(identity) = self.identity.as_mut() {
            identity.sequence_name = Some(name.into());
        }
        self
    }

    #[must_use]
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// MySQL `ON UPDATE CURRENT_TIMESTAMP`
    #[must_use]
    pub fn on_update_now(mut self) -> Self {
        self.on_update_now = true;
        self
    }

    #[must_use]
    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Inline foreign key to `table.column`, where `column` is the key the
    /// referenced column is declared under.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ColumnReference {
            table: table.into(),
            schema: None,
            column: column.into(),
            on_delete: None,
            on_update: None,
        });
        self
    }

    #[must_use]
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        if let Some(reference) = self.references.as_mut() {
            reference.on_delete = Some(action);
        }
        self
    }

    #[must_use]
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        if let Some(reference) = self.references.as_mut() {
            reference.on_update = Some(action);
        }
        self
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
