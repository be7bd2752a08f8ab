//! SQLite type affinity
//!
//! SQLite accepts any declared type name and folds it into one of five
//! affinities. Reverse rendering collapses introspected types the same way.

/// SQL type affinity categories for SQLite
///
/// # Examples
///
/// ```
/// use drizzle_types::sqlite::SQLTypeCategory;
///
/// assert_eq!(SQLTypeCategory::from_sql_type("INTEGER"), SQLTypeCategory::Integer);
/// assert_eq!(SQLTypeCategory::from_sql_type("VARCHAR(255)"), SQLTypeCategory::Text);
/// assert_eq!(SQLTypeCategory::from_sql_type("REAL"), SQLTypeCategory::Real);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SQLTypeCategory {
    /// INT, INTEGER, TINYINT, SMALLINT, MEDIUMINT, BIGINT, ...
    Integer,
    /// REAL, DOUBLE, DOUBLE PRECISION, FLOAT
    Real,
    /// NUMERIC, DECIMAL, BOOLEAN, DATE, DATETIME and anything unrecognized
    Numeric,
    /// TEXT, CHARACTER, VARCHAR, NCHAR, NVARCHAR, CLOB
    Text,
    Blob,
}

const INT_AFFINITIES: &[&str] = &[
    "int",
    "integer",
    "tinyint",
    "smallint",
    "mediumint",
    "bigint",
    "unsigned big int",
    "int2",
    "int8",
];

const REAL_AFFINITIES: &[&str] = &["real", "double", "double precision", "float"];

const TEXT_AFFINITIES: &[&str] = &[
    "character",
    "varchar",
    "varying character",
    "national varying character",
    "nchar",
    "native character",
    "nvarchar",
    "text",
    "clob",
];

impl SQLTypeCategory {
    /// Determine the affinity of a declared SQL type
    ///
    /// Matching is by lowercase prefix, so `bigint unsigned` is an integer and
    /// `varchar(255)` is text.
    #[must_use]
    pub fn from_sql_type(sql_type: &str) -> Self {
        let lowered = sql_type.trim().to_ascii_lowercase();
        let starts = |list: &[&str]| list.iter().any(|a| lowered.starts_with(a));

        if starts(INT_AFFINITIES) {
            Self::Integer
        } else if starts(TEXT_AFFINITIES) {
            Self::Text
        } else if lowered.starts_with("blob") {
            Self::Blob
        } else if starts(REAL_AFFINITIES) {
            Self::Real
        } else {
            Self::Numeric
        }
    }

    /// Canonical type name for this affinity
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Blob => "blob",
        }
    }

    /// Map a declared type to the type name used in generated source.
    ///
    /// Text types keep their length argument, e.g. `varchar(32)` becomes
    /// `text(32)`.
    #[must_use]
    pub fn canonical_type(sql_type: &str) -> String {
        let category = Self::from_sql_type(sql_type);
        if category == Self::Text {
            let digits: String = sql_type
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(char::is_ascii_digit)
                .collect();
            if !digits.is_empty() {
                return format!("text({digits})");
            }
        }
        category.as_str().to_string()
    }
}
