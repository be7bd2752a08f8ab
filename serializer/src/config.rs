//! Snapshot configuration
//!
//! The record a front end hands to the core: which dialect to target, how to
//! name columns and how to plan constraints. Loadable from TOML.

use std::path::Path;

use drizzle_types::{Casing, Dialect};
use serde::{Deserialize, Serialize};

use crate::builder::BuildOptions;
use crate::error::SerializerError;
use crate::statements::PlanOptions;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotConfig {
    pub dialect: Dialect,
    #[serde(default)]
    pub casing: Casing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub split_constraints: bool,
}

impl SnapshotConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, SerializerError> {
        toml::from_str(content).map_err(|e| SerializerError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self, SerializerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| SerializerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            casing: self.casing,
            project_id: self.project_id.clone(),
        }
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            split_constraints: self.split_constraints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let cfg = SnapshotConfig::from_toml_str(
            r#"
dialect = "postgresql"
casing = "snake_case"
projectId = "shop"
splitConstraints = true
"#,
        )
        .unwrap();
        assert_eq!(cfg.dialect, Dialect::PostgreSQL);
        assert_eq!(cfg.build_options().casing, Casing::SnakeCase);
        assert_eq!(cfg.build_options().project_id.as_deref(), Some("shop"));
        assert!(cfg.plan_options().split_constraints);
    }

    #[test]
    fn defaults_apply() {
        let cfg = SnapshotConfig::from_toml_str(r#"dialect = "sqlite""#).unwrap();
        assert_eq!(cfg, SnapshotConfig::new(Dialect::SQLite));
        assert_eq!(cfg.casing, Casing::Preserve);
        assert!(!cfg.split_constraints);
    }

    #[test]
    fn bad_values_are_config_errors() {
        assert!(matches!(
            SnapshotConfig::from_toml_str(r#"dialect = "oracle""#),
            Err(SerializerError::Config(_))
        ));
        assert!(matches!(
            SnapshotConfig::from_toml_str(r#"dialect = "mysql"
casing = "kebab""#),
            Err(SerializerError::Config(_))
        ));
    }
}
