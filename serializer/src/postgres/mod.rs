//! PostgreSQL dialect: snapshot shape, builder, canonical encoding, planner,
//! DDL convertor, catalog introspection and source generation

pub mod builder;
pub mod codegen;
pub mod convertor;
pub mod introspect;
pub mod planner;
pub mod snapshot;
pub mod squasher;
pub mod statements;

pub use builder::build_snapshot;
pub use snapshot::{PgSnapshot, SquashedPgSnapshot};
pub use squasher::squash_snapshot;
pub use statements::PgStatement;
