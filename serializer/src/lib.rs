//! Schema compiler for drizzle-rs
//!
//! Turns schema descriptions into versioned JSON snapshots and DDL, and runs
//! the same pipeline backwards from a live catalog to schema source:
//!
//! ```text
//! SchemaModule -> extract -> build_snapshot -> Snapshot -> plan -> emit -> SQL
//! CatalogQuery -> introspect -> Snapshot -> snapshot_to_source -> Rust
//! ```
//!
//! Every dialect (PostgreSQL, MySQL, SQLite) has its own snapshot shape,
//! squash encoding, planner and convertors under [`postgres`], [`mysql`] and
//! [`sqlite`]. The functions at the crate root dispatch on [`Dialect`].
//!
//! # Features
//!
//! - `rusqlite` - Implements [`catalog::CatalogQuery`] for
//!   `rusqlite::Connection` and enables [`sql_dump_to_snapshot`]

pub mod builder;
pub mod catalog;
pub mod codegen;
pub mod config;
pub mod emitter;
pub mod error;
pub mod extract;
pub mod mysql;
pub mod postgres;
pub mod schema;
pub mod snapshot;
pub mod sqlite;
pub mod squash;
pub mod statements;
mod utils;

pub use builder::BuildOptions;
pub use catalog::{CatalogQuery, IntrospectOptions, RoleProvider, Row};
pub use codegen::{GeneratedSource, snapshot_to_source};
pub use config::SnapshotConfig;
pub use drizzle_types::{Casing, Dialect};
pub use emitter::{Convertor, emit};
pub use error::SerializerError;
pub use snapshot::Snapshot;
pub use statements::{PlanOptions, Statement, StatementKind, plan};

/// Result type for serializer operations
pub type Result<T, E = SerializerError> = std::result::Result<T, E>;

/// Everything a schema description file needs
pub mod prelude {
    pub use crate::schema::*;
    pub use crate::{BuildOptions, Casing, Dialect, Snapshot};
}

/// Build a snapshot of `dialect` from schema modules
///
/// Modules are merged in order and the first definition of a name wins.
/// Naming collisions abort the whole build; no partial snapshot is returned.
pub fn objects_to_snapshot(
    modules: &[schema::SchemaModule],
    dialect: Dialect,
    options: &BuildOptions,
) -> Result<Snapshot> {
    let set = extract::extract(modules);
    tracing::debug!(
        %dialect,
        modules = modules.len(),
        tables = set.tables.len(),
        views = set.views.len(),
        "extracted schema objects"
    );

    let snapshot = match dialect {
        Dialect::PostgreSQL => Snapshot::Postgres(postgres::build_snapshot(&set, options)?),
        Dialect::MySQL => Snapshot::MySql(mysql::build_snapshot(&set, options)?),
        Dialect::SQLite => Snapshot::Sqlite(sqlite::build_snapshot(&set, options)?),
    };
    Ok(snapshot)
}

/// Plan and emit the DDL that creates `snapshot` from an empty database
pub fn snapshot_to_sql(snapshot: &Snapshot, options: &PlanOptions) -> Result<String> {
    let statements = plan(snapshot, options)?;
    emit(&statements)
}

/// Read a live catalog into a snapshot of `options.dialect`
pub fn import_from_database(
    db: &mut impl CatalogQuery,
    options: &IntrospectOptions,
) -> Result<Snapshot> {
    tracing::info!(dialect = %options.dialect, "introspecting database");
    let snapshot = match options.dialect {
        Dialect::PostgreSQL => Snapshot::Postgres(postgres::introspect::introspect(db, options)?),
        Dialect::MySQL => Snapshot::MySql(mysql::introspect::introspect(db, options)?),
        Dialect::SQLite => Snapshot::Sqlite(sqlite::introspect::introspect(db, options)?),
    };
    Ok(snapshot)
}

/// Execute a SQL dump against an in-memory database and introspect the result
///
/// Only SQLite dumps can be replayed, and only with the `rusqlite` feature.
pub fn sql_dump_to_snapshot(dialect: Dialect, sql: &str) -> Result<Snapshot> {
    if dialect != Dialect::SQLite {
        return Err(SerializerError::UnsupportedDialect {
            dialect,
            operation: "sql dump import",
        });
    }
    replay_sqlite_dump(sql)
}

#[cfg(feature = "rusqlite")]
fn replay_sqlite_dump(sql: &str) -> Result<Snapshot> {
    let mut conn = rusqlite::Connection::open_in_memory()?;
    conn.execute_batch(sql)?;
    let options = IntrospectOptions::new(Dialect::SQLite);
    Ok(Snapshot::Sqlite(sqlite::introspect::introspect(
        &mut conn, &options,
    )?))
}

#[cfg(not(feature = "rusqlite"))]
fn replay_sqlite_dump(_sql: &str) -> Result<Snapshot> {
    Err(SerializerError::MissingDependency {
        capability: "sqlite dump import",
        hint: "enable the `rusqlite` feature",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_import_rejects_server_dialects() {
        for dialect in [Dialect::PostgreSQL, Dialect::MySQL] {
            let err = sql_dump_to_snapshot(dialect, "CREATE TABLE t (id int);").unwrap_err();
            assert!(matches!(err, SerializerError::UnsupportedDialect { .. }));
        }
    }

    #[cfg(not(feature = "rusqlite"))]
    #[test]
    fn dump_import_needs_engine() {
        let err = sql_dump_to_snapshot(Dialect::SQLite, "CREATE TABLE t (id int);").unwrap_err();
        assert!(matches!(err, SerializerError::MissingDependency { .. }));
    }

    #[cfg(feature = "rusqlite")]
    #[test]
    fn dump_import_round_trips_sqlite() {
        let snapshot = sql_dump_to_snapshot(
            Dialect::SQLite,
            "CREATE TABLE users (id integer PRIMARY KEY, name text NOT NULL);",
        )
        .unwrap();
        let sqlite = snapshot.as_sqlite().unwrap();
        assert!(sqlite.tables.contains_key("users"));
    }
}
