//! MySQL snapshot model, builder, planner, DDL and catalog reader

pub mod builder;
pub mod codegen;
pub mod convertor;
pub mod introspect;
pub mod planner;
pub mod snapshot;
pub mod squasher;
pub mod statements;

pub use builder::build_snapshot;
pub use snapshot::{MySqlSnapshot, SquashedMySqlSnapshot};
pub use squasher::squash_snapshot;
pub use statements::MySqlStatement;
