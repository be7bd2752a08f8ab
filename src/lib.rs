//! # drizzle-kit
//!
//! Schema snapshots and DDL for PostgreSQL, MySQL and SQLite.
//!
//! Describe tables, views, enums and the rest with the builder functions in
//! [`prelude`], group them into [`SchemaModule`](schema::SchemaModule)s and
//! hand them to [`objects_to_snapshot`]. The snapshot serializes to the
//! versioned JSON format and renders to a `CREATE` script with
//! [`snapshot_to_sql`].
//!
//! ```rust,ignore
//! use drizzle_kit::prelude::*;
//!
//! let users = table("users")
//!     .column(column("id", "serial").primary_key())
//!     .column(column("name", "text").not_null());
//!
//! let module = SchemaModule::new("src/schema.rs").export("users", users);
//! let snapshot = drizzle_kit::objects_to_snapshot(
//!     &[module],
//!     Dialect::PostgreSQL,
//!     &BuildOptions::default(),
//! )?;
//! let sql = drizzle_kit::snapshot_to_sql(&snapshot, &PlanOptions::default())?;
//! ```
//!
//! Going the other way, [`import_from_database`] reads a live catalog through
//! any [`CatalogQuery`] and [`snapshot_to_source`] renders the result as
//! schema source that imports this prelude.
//!
//! ## Features
//!
//! - `std` (default)
//! - `rusqlite` - query SQLite catalogs through `rusqlite::Connection` and
//!   replay SQL dumps with [`sql_dump_to_snapshot`]

// =============================================================================
// Root-level exports
// =============================================================================

pub use drizzle_serializer::{
    BuildOptions, CatalogQuery, GeneratedSource, IntrospectOptions, PlanOptions, Result,
    RoleProvider, Row, Snapshot, SnapshotConfig, Statement, StatementKind, emit,
    import_from_database, objects_to_snapshot, plan, snapshot_to_source, snapshot_to_sql,
    sql_dump_to_snapshot,
};

/// Database dialect and column casing
pub use drizzle_types::{Casing, Dialect};

/// Error types
pub mod error {
    pub use drizzle_serializer::error::SerializerError;
}

/// Schema description DSL
pub use drizzle_serializer::schema;

/// Per-dialect snapshot types, squashers, planners and convertors
pub mod dialects {
    pub use drizzle_serializer::{mysql, postgres, sqlite};
}

/// Snapshot JSON types shared by every dialect
pub use drizzle_serializer::snapshot;

/// Canonical string encoding of snapshot entities
pub use drizzle_serializer::squash;

// =============================================================================
// Prelude
// =============================================================================

/// Everything a schema description file needs.
///
/// Generated schema sources start with `use drizzle_kit::prelude::*;`.
pub mod prelude {
    pub use drizzle_serializer::prelude::*;
    pub use drizzle_serializer::{PlanOptions, SnapshotConfig};
}
