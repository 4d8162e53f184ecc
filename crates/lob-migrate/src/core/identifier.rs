//! Validated SQL identifiers and literal quoting.
//!
//! Table and column names reach the migration engine straight from the live
//! catalog and have to be spliced into DDL text: identifiers cannot be bound as
//! statement parameters. Rather than quoting, names are checked against a
//! conservative charset that both MySQL and Oracle accept unquoted, and then
//! interpolated verbatim. For well-formed schemas the emitted statements are
//! exactly the unquoted ones an operator would type by hand; anything outside
//! the charset is rejected before a statement is ever built.
//!
//! Oracle folds unquoted identifiers to upper case, and its catalog reports
//! them that way, so verbatim interpolation round-trips.

use std::fmt;

use crate::error::{MigrateError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - MySQL: 64 characters
/// - Oracle 12.2+: 128 bytes
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// A table or column name that is safe to interpolate into SQL text.
///
/// Accepted: `[A-Za-z_][A-Za-z0-9_$#]*`, at most [`MAX_IDENTIFIER_LENGTH`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Validate `name` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::InvalidIdentifier` for empty, over-long, or
    /// non-conforming names.
    pub fn new(name: &str) -> Result<Self> {
        validate_identifier(name)?;
        Ok(Self(name.to_string()))
    }

    /// The identifier text, as it will appear in SQL.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a sibling identifier: the first `budget` characters of this one
    /// followed by `suffix`.
    ///
    /// Used for temporary column names that must stay within a backend's
    /// identifier length limit (Oracle pre-12.2: 30 bytes).
    pub fn truncated_with_suffix(&self, budget: usize, suffix: &str) -> Result<Self> {
        // Validated identifiers are ASCII, so byte and char positions agree.
        let end = self.0.len().min(budget);
        Self::new(&format!("{}{}", &self.0[..end], suffix))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate an identifier against the safe charset.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers exceeding maximum length
/// - A leading digit or `$`/`#`
/// - Any character outside ASCII letters, digits, `_`, `$`, `#`
///   (quotes, whitespace, semicolons, comment markers, null bytes, ...)
///
/// # Errors
///
/// Returns `MigrateError::InvalidIdentifier` with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::InvalidIdentifier(
            "identifier cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::InvalidIdentifier(format!(
            "identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap_or_default();
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(MigrateError::InvalidIdentifier(format!(
            "identifier must start with a letter or underscore: {:?}",
            name
        )));
    }

    if let Some(bad) =
        chars.find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#')))
    {
        return Err(MigrateError::InvalidIdentifier(format!(
            "identifier contains unsupported character {:?}: {:?}",
            bad, name
        )));
    }

    Ok(())
}

/// Quote a string literal for Oracle: single quotes are doubled.
pub fn quote_literal_oracle(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote a string literal for MySQL.
///
/// Backslashes are escaped as well, since MySQL treats them as escape
/// characters inside string literals unless `NO_BACKSLASH_ESCAPES` is set.
pub fn quote_literal_mysql(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}
