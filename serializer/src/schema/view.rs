//! Regular and materialized view definitions

use std::collections::BTreeMap;

use serde_json::Value;

use super::Sql;
use super::column::ColumnDef;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewDef {
    pub name: String,
    pub schema: Option<String>,
    pub materialized: bool,
    /// View managed outside this schema; described but never created
    pub existing: bool,
    pub columns: Vec<ColumnDef>,
    pub definition: Option<Sql>,
    pub algorithm: Option<String>,
    pub sql_security: Option<String>,
    pub with_check_option: Option<String>,
    pub with: BTreeMap<String, Value>,
    pub using: Option<String>,
    pub tablespace: Option<String>,
    pub with_no_data: bool,
}

pub fn view(name: impl Into<String>) -> ViewDef {
    ViewDef {
        name: name.into(),
        ..ViewDef::default()
    }
}

pub fn materialized_view(name: impl Into<String>) -> ViewDef {
    ViewDef {
        name: name.into(),
        materialized: true,
        ..ViewDef::default()
    }
}

impl ViewDef {
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn as_sql(mut self, definition: impl Into<Sql>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    #[must_use]
    pub fn existing(mut self) -> Self {
        self.existing = true;
        self
    }

    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    #[must_use]
    pub fn sql_security(mut self, security: impl Into<String>) -> Self {
        self.sql_security = Some(security.into());
        self
    }

    #[must_use]
    pub fn with_check_option(mut self, option: impl Into<String>) -> Self {
        self.with_check_option = Some(option.into());
        self
    }

    /// Postgres `WITH (...)` storage option, keyed in camelCase
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn using(mut self, method: impl Into<String>) -> Self {
        self.using = Some(method.into());
        self
    }

    #[must_use]
    pub fn tablespace(mut self, tablespace: impl Into<String>) -> Self {
        self.tablespace = Some(tablespace.into());
        self
    }

    #[must_use]
    pub fn with_no_data(mut self) -> Self {
        self.with_no_data = true;
        self
    }

    pub fn canonical_name(&self) -> String {
        format!("{}.{}", self.schema.as_deref().unwrap_or(""), self.name)
    }
}
