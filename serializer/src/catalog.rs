//! Catalog access used by introspection
//!
//! Introspection never talks to a driver directly. It issues queries through
//! [`CatalogQuery`], which any closure with the right signature implements,
//! and reads the returned rows through serde.

use drizzle_types::Dialect;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::SerializerError;

/// One result row, column name to value
pub type Row = serde_json::Map<String, Value>;

/// Runs catalog queries on behalf of the introspectors
///
/// Parameters are positional and always bound by the implementation, never
/// spliced into the SQL text.
pub trait CatalogQuery {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SerializerError>;
}

impl<F> CatalogQuery for F
where
    F: FnMut(&str, &[Value]) -> Result<Vec<Row>, SerializerError>,
{
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SerializerError> {
        self(sql, params)
    }
}

#[cfg(feature = "rusqlite")]
impl CatalogQuery for rusqlite::Connection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SerializerError> {
        use rusqlite::types::ValueRef;

        let mut stmt = self.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let bound = params.iter().map(json_to_sqlite);
        let mut rows = stmt.query(rusqlite::params_from_iter(bound))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Row::new();
            for (i, name) in names.iter().enumerate() {
                let value = match row.get_ref(i)? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(v) => Value::from(v),
                    ValueRef::Real(v) => Value::from(v),
                    ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
                };
                map.insert(name.clone(), value);
            }
            out.push(map);
        }
        Ok(out)
    }
}

#[cfg(feature = "rusqlite")]
fn json_to_sqlite(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Sql::Integer(i),
            None => Sql::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}

/// Run `sql` and decode every row into `T`
pub(crate) fn fetch<T: DeserializeOwned>(
    db: &mut impl CatalogQuery,
    sql: &str,
    params: &[Value],
) -> Result<Vec<T>, SerializerError> {
    tracing::trace!(sql = sql.trim(), params = params.len(), "catalog query");
    db.query(sql, params)?
        .into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row.clone())).map_err(|e| {
                SerializerError::Query(format!("unexpected row shape {}: {e}", Value::Object(row)))
            })
        })
        .collect()
}

/// Role managers whose roles are excluded from introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleProvider {
    Supabase,
    Neon,
}

impl RoleProvider {
    pub fn managed_roles(&self) -> &'static [&'static str] {
        match self {
            Self::Supabase => &[
                "anon",
                "authenticator",
                "authenticated",
                "service_role",
                "supabase_auth_admin",
                "supabase_storage_admin",
                "dashboard_user",
                "supabase_admin",
            ],
            Self::Neon => &["authenticated", "anonymous"],
        }
    }
}

/// What to introspect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectOptions {
    pub dialect: Dialect,
    /// Postgres schemas to read, or the MySQL database name
    pub schemas: Vec<String>,
    pub role_provider: Option<RoleProvider>,
    /// Table names to keep; empty keeps everything
    pub tables: Vec<String>,
}

impl IntrospectOptions {
    pub fn new(dialect: Dialect) -> Self {
        let schemas = match dialect {
            Dialect::PostgreSQL => vec!["public".to_string()],
            Dialect::MySQL | Dialect::SQLite => Vec::new(),
        };
        Self {
            dialect,
            schemas,
            role_provider: None,
            tables: Vec::new(),
        }
    }

    #[must_use]
    pub fn schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas = schemas.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn role_provider(mut self, provider: RoleProvider) -> Self {
        self.role_provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn includes_table(&self, name: &str) -> bool {
        self.tables.is_empty() || self.tables.iter().any(|t| t == name)
    }

    pub fn includes_role(&self, name: &str) -> bool {
        self.role_provider
            .is_none_or(|p| !p.managed_roles().contains(&name))
    }
}

// =============================================================================
// Lenient row decoding
// =============================================================================

/// Boolean column that drivers may report as a bool, a number or text
pub(crate) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Value::String(s) => Ok(matches!(
            s.to_ascii_lowercase().as_str(),
            "1" | "t" | "true" | "yes" | "y"
        )),
        other => Err(de::Error::custom(format!("expected a flag, got {other}"))),
    }
}

/// Text column that may arrive as a number
pub(crate) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(de::Error::custom(format!("expected text, got {other}"))),
    }
}

/// Integer column that may arrive as text
pub(crate) fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("expected an integer, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected an integer, got {s}"))),
        Value::Bool(b) => Ok(i64::from(b)),
        other => Err(de::Error::custom(format!("expected an integer, got {other}"))),
    }
}

/// Array column: a JSON array or a Postgres `{a,b}` literal
pub(crate) fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect()),
        Value::String(s) => Ok(parse_pg_array(&s)),
        other => Err(de::Error::custom(format!("expected a list, got {other}"))),
    }
}

/// Split a Postgres array literal such as `{a,"b c"}`
pub(crate) fn parse_pg_array(s: &str) -> Vec<String> {
    let inner = s.trim().trim_start_matches('{').trim_end_matches('}');
    if inner.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => quoted = !quoted,
            '\\' if quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' if !quoted => out.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    out.push(current);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "flag")]
        on: bool,
        #[serde(deserialize_with = "string_list")]
        list: Vec<String>,
        #[serde(default, deserialize_with = "text")]
        value: Option<String>,
    }

    #[test]
    fn closures_are_catalogs() {
        let mut calls = Vec::new();
        let mut db = |sql: &str, params: &[Value]| -> Result<Vec<Row>, SerializerError> {
            calls.push((sql.to_string(), params.len()));
            Ok(vec![Row::new()])
        };
        let rows = db.query("SELECT 1", &[Value::from("x")]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(calls, vec![("SELECT 1".to_string(), 1)]);
    }

    #[test]
    fn lenient_decoding() {
        let probe: Probe = serde_json::from_value(serde_json::json!({
            "on": "YES",
            "list": "{a,\"b c\"}",
            "value": 10
        }))
        .unwrap();
        assert!(probe.on);
        assert_eq!(probe.list, vec!["a", "b c"]);
        assert_eq!(probe.value.as_deref(), Some("10"));
    }

    #[test]
    fn role_provider_filters_managed_roles() {
        let opts = IntrospectOptions::new(Dialect::PostgreSQL).role_provider(RoleProvider::Supabase);
        assert!(!opts.includes_role("anon"));
        assert!(opts.includes_role("admin"));
        assert_eq!(opts.schemas, vec!["public"]);
    }

    #[test]
    fn table_filter() {
        let opts = IntrospectOptions::new(Dialect::SQLite).tables(["users"]);
        assert!(opts.includes_table("users"));
        assert!(!opts.includes_table("posts"));
        assert!(IntrospectOptions::new(Dialect::SQLite).includes_table("posts"));
    }
}
