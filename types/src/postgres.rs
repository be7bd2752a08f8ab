//! PostgreSQL type vocabulary
//!
//! Native type names decide whether a column type is emitted bare or quoted
//! as a user-defined type. Identity ranges supply sequence defaults.

/// Built-in type names. A column type starting with any of these is emitted
/// without identifier quoting.
pub const NATIVE_TYPES: &[&str] = &[
    "uuid",
    "smallint",
    "integer",
    "bigint",
    "boolean",
    "bool",
    "text",
    "varchar",
    "character",
    "char",
    "serial",
    "smallserial",
    "bigserial",
    "decimal",
    "numeric",
    "real",
    "double precision",
    "json",
    "jsonb",
    "time",
    "timetz",
    "timestamp",
    "timestamptz",
    "date",
    "interval",
    "bytea",
    "inet",
    "cidr",
    "macaddr",
    "macaddr8",
    "point",
    "line",
    "bit",
    "varbit",
    "money",
    "int2",
    "int4",
    "int8",
    "float4",
    "float8",
    "oid",
    "xml",
    "tsvector",
    "tsquery",
    "vector",
    "halfvec",
    "sparsevec",
    "geometry",
];

/// Returns `true` when the type is a built-in type rather than an enum or
/// domain.
#[must_use]
pub fn is_native_type(sql_type: &str) -> bool {
    let lowered = sql_type.trim().to_ascii_lowercase();
    NATIVE_TYPES.iter().any(|t| lowered.starts_with(t))
}

/// Value range of an integer column backing an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityRange {
    pub min: &'static str,
    pub max: &'static str,
}

impl IdentityRange {
    /// Range for the given column type; non-integer types fall back to `integer`.
    #[must_use]
    pub fn for_type(column_type: &str) -> Self {
        match column_type {
            "smallint" => Self {
                min: "-32768",
                max: "32767",
            },
            "bigint" => Self {
                min: "-9223372036854775808",
                max: "9223372036854775807",
            },
            _ => Self {
                min: "-2147483648",
                max: "2147483647",
            },
        }
    }
}

/// Sequence bounds used when a standalone sequence does not set them.
pub const SEQUENCE_MIN: &str = "1";
pub const SEQUENCE_MAX: &str = "9223372036854775807";
pub const SEQUENCE_NEGATIVE_MIN: &str = "-9223372036854775808";

/// Namespaces that are never introspected
pub const SYSTEM_NAMESPACE_NAMES: &[&str] = &["pg_toast", "pg_catalog", "information_schema"];

#[must_use]
pub fn is_system_namespace(name: &str) -> bool {
    name.starts_with("pg_toast")
        || name.starts_with("pg_temp_")
        || SYSTEM_NAMESPACE_NAMES.contains(&name)
}

#[must_use]
pub fn is_system_role(name: &str) -> bool {
    name == "postgres" || name.starts_with("pg_")
}

/// Roles reserved in policy `TO` lists that must not be quoted
pub const RESERVED_POLICY_ROLES: &[&str] =
    &["current_user", "current_role", "session_user", "public"];

/// Serial pseudo-type backing the given integer type, if any
#[must_use]
pub fn serial_for(column_type: &str) -> Option<&'static str> {
    match column_type {
        "smallint" => Some("smallserial"),
        "integer" => Some("serial"),
        "bigint" => Some("bigserial"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_types_are_detected_by_prefix() {
        assert!(is_native_type("varchar(256)"));
        assert!(is_native_type("timestamp with time zone"));
        assert!(is_native_type("integer[]"));
        assert!(!is_native_type("mood"));
    }

    #[test]
    fn identity_ranges() {
        assert_eq!(IdentityRange::for_type("smallint").max, "32767");
        assert_eq!(IdentityRange::for_type("bigint").min, "-9223372036854775808");
        assert_eq!(IdentityRange::for_type("integer").max, "2147483647");
    }

    #[test]
    fn system_checks() {
        assert!(is_system_namespace("pg_catalog"));
        assert!(is_system_namespace("pg_toast_temp_1"));
        assert!(!is_system_namespace("public"));
        assert!(is_system_role("pg_read_all_data"));
        assert!(!is_system_role("admin"));
    }
}
