//! Domain identifier types with validation
//!
//! Newtype wrappers for the SQL identifiers quarry passes to the dump tool.
//! Both are interpolated into command lines and into `USE`/`LOCK TABLES`
//! statements, so they are validated once at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum identifier length accepted by MySQL
const MAX_IDENTIFIER_LEN: usize = 64;

fn validate_identifier(kind: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{kind} cannot be empty"));
    }
    if value.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "{kind} '{value}' exceeds {MAX_IDENTIFIER_LEN} characters"
        ));
    }
    if value.contains('`') || value.contains('\0') {
        return Err(format!("{kind} '{value}' contains a backtick or NUL byte"));
    }
    Ok(())
}

/// Table name newtype wrapper
///
/// # Examples
///
/// ```
/// use quarry::domain::ids::TableName;
/// use std::str::FromStr;
///
/// let table = TableName::from_str("track_album_rel").unwrap();
/// assert_eq!(table.quoted(), "`track_album_rel`");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Creates a new TableName, rejecting empty, overlong or backtick-bearing names
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        validate_identifier("Table name", &name)?;
        Ok(Self(name))
    }

    /// Returns the table name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name wrapped in backticks, as mysqldump writes it
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TableName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(name: TableName) -> Self {
        name.0
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Database (schema) name newtype wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseName(String);

impl DatabaseName {
    /// Creates a new DatabaseName
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        validate_identifier("Database name", &name)?;
        Ok(Self(name))
    }

    /// Returns the database name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The database name wrapped in backticks
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }

    /// The `USE` directive that prefixes table and routine sections
    pub fn use_directive(&self) -> String {
        format!("USE {};\r\n\r\n", self.quoted())
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatabaseName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DatabaseName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DatabaseName> for String {
    fn from(name: DatabaseName) -> Self {
        name.0
    }
}

impl AsRef<str> for DatabaseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
