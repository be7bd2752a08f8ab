//! Shared type definitions for the drizzle schema serializer
//!
//! - [`Dialect`] - Database dialect enum (SQLite, PostgreSQL, MySQL)
//! - [`Casing`] - Column naming policy
//! - SQLite type affinity in the [`sqlite`] module
//! - PostgreSQL native types and identity ranges in the [`postgres`] module
//!
//! # Features
//!
//! - `std` - Standard library support (enabled by default)
//! - `serde` - Enable serde serialization/deserialization

mod casing;
mod dialect;
pub mod postgres;
pub mod sqlite;

pub use casing::Casing;
pub use dialect::{Dialect, DialectParseError};

/// Prelude module for commonly used types
pub mod prelude {
    pub use crate::sqlite::SQLTypeCategory;
    pub use crate::{Casing, Dialect};
}
