//! Serializer errors

use drizzle_types::Dialect;

/// Errors raised while building, encoding, planning or introspecting a schema
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    /// Two entities of one table (or schema) resolved to the same name
    #[error("duplicated {kind} name \"{name}\" in {table}: {detail}")]
    NamingCollision {
        kind: &'static str,
        name: String,
        table: String,
        detail: String,
    },
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("{operation} is not supported for the {dialect} dialect")]
    UnsupportedDialect {
        dialect: Dialect,
        operation: &'static str,
    },
    #[error("{capability} is not available: {hint}")]
    MissingDependency {
        capability: &'static str,
        hint: &'static str,
    },
    #[error("could not decode {what}: {input}")]
    Decode { what: &'static str, input: String },
    #[error("catalog query failed: {0}")]
    Query(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SerializerError {
    pub(crate) fn collision(
        kind: &'static str,
        name: impl Into<String>,
        table: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::NamingCollision {
            kind,
            name: name.into(),
            table: table.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn decode(what: &'static str, input: impl Into<String>) -> Self {
        Self::Decode {
            what,
            input: input.into(),
        }
    }
}

#[cfg(feature = "rusqlite")]
impl From<rusqlite::Error> for SerializerError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Query(e.to_string())
    }
}
