//! Unified database dialect enum
//!
//! Single source of truth for dialect identification across snapshot building,
//! statement planning and catalog introspection.

/// SQL dialect a snapshot or statement targets
///
/// # Examples
///
/// ```
/// use drizzle_types::Dialect;
///
/// let dialect = Dialect::PostgreSQL;
/// assert_eq!(dialect.quote("users"), "\"users\"");
///
/// let sqlite = Dialect::SQLite;
/// assert_eq!(sqlite.quote("users"), "`users`");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dialect {
    /// SQLite family: sqlite, libsql, turso
    #[default]
    SQLite,

    /// PostgreSQL family
    PostgreSQL,

    /// MySQL family
    MySQL,
}

impl Dialect {
    /// Parse a dialect from a string (case-insensitive)
    ///
    /// Supports various common aliases:
    /// - SQLite: `"sqlite"`, `"turso"`, `"libsql"`
    /// - PostgreSQL: `"postgresql"`, `"postgres"`, `"pg"`
    /// - MySQL: `"mysql"`
    ///
    /// # Examples
    ///
    /// ```
    /// use drizzle_types::Dialect;
    ///
    /// assert_eq!(Dialect::parse("sqlite"), Some(Dialect::SQLite));
    /// assert_eq!(Dialect::parse("pg"), Some(Dialect::PostgreSQL));
    /// assert_eq!(Dialect::parse("unknown"), None);
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("sqlite")
            || s.eq_ignore_ascii_case("turso")
            || s.eq_ignore_ascii_case("libsql")
        {
            Some(Dialect::SQLite)
        } else if s.eq_ignore_ascii_case("postgresql")
            || s.eq_ignore_ascii_case("postgres")
            || s.eq_ignore_ascii_case("pg")
        {
            Some(Dialect::PostgreSQL)
        } else if s.eq_ignore_ascii_case("mysql") {
            Some(Dialect::MySQL)
        } else {
            None
        }
    }

    /// Character used to delimit identifiers
    #[must_use]
    pub const fn quote_char(&self) -> char {
        match self {
            Dialect::PostgreSQL => '"',
            Dialect::SQLite | Dialect::MySQL => '`',
        }
    }

    /// Quote an identifier for this dialect
    #[must_use]
    pub fn quote(&self, ident: &str) -> String {
        let q = self.quote_char();
        format!("{q}{ident}{q}")
    }

    /// Snapshot format version written for this dialect
    #[must_use]
    pub const fn snapshot_version(&self) -> &'static str {
        match self {
            Dialect::PostgreSQL => "7",
            Dialect::MySQL => "5",
            Dialect::SQLite => "6",
        }
    }

    /// Get the dialect name as a lowercase string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Dialect::SQLite => "sqlite",
            Dialect::PostgreSQL => "postgresql",
            Dialect::MySQL => "mysql",
        }
    }
}

impl core::fmt::Display for Dialect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Dialect {
    type Err = DialectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::parse(s).ok_or(DialectParseError)
    }
}

/// Error returned when parsing an unknown dialect string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectParseError;

impl core::fmt::Display for DialectParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("unknown dialect")
    }
}

impl std::error::Error for DialectParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_parse() {
        assert_eq!(Dialect::parse("SQLite"), Some(Dialect::SQLite));
        assert_eq!(Dialect::parse("libsql"), Some(Dialect::SQLite));
        assert_eq!(Dialect::parse("postgres"), Some(Dialect::PostgreSQL));
        assert_eq!(Dialect::parse("PG"), Some(Dialect::PostgreSQL));
        assert_eq!(Dialect::parse("MySQL"), Some(Dialect::MySQL));
        assert_eq!(Dialect::parse(""), None);
    }

    #[test]
    fn test_dialect_quote() {
        assert_eq!(Dialect::PostgreSQL.quote("a"), "\"a\"");
        assert_eq!(Dialect::MySQL.quote("a"), "`a`");
        assert_eq!(Dialect::SQLite.quote("a"), "`a`");
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(format!("{}", Dialect::SQLite), "sqlite");
        assert_eq!(format!("{}", Dialect::PostgreSQL), "postgresql");
        assert_eq!(format!("{}", Dialect::MySQL), "mysql");
        assert_eq!("pg".parse::<Dialect>(), Ok(Dialect::PostgreSQL));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_dialect_serde_names() {
        let json = serde_json::to_string(&Dialect::PostgreSQL).unwrap();
        assert_eq!(json, "\"postgresql\"");
        let back: Dialect = serde_json::from_str("\"mysql\"").unwrap();
        assert_eq!(back, Dialect::MySQL);
    }
}
