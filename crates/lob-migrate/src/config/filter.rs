//! Table include/exclude matching.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{MigrateError, Result};

/// Decides which tables a run operates on.
///
/// A table is selected when it matches any include pattern (or no include
/// patterns were given) and matches no exclude pattern. Matching is
/// case-insensitive: Oracle reports names in upper case, MySQL as created.
#[derive(Debug, Clone)]
pub struct TableFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl TableFilter {
    /// Build a filter from glob patterns.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include = if include.is_empty() {
            None
        } else {
            Some(build_set(include)?)
        };

        Ok(Self {
            include,
            exclude: build_set(exclude)?,
        })
    }

    /// A filter that selects every table.
    pub fn all() -> Self {
        Self {
            include: None,
            exclude: GlobSet::empty(),
        }
    }

    pub fn matches(&self, table: &str) -> bool {
        let included = self.include.as_ref().map_or(true, |set| set.is_match(table));
        included && !self.exclude.is_match(table)
    }
}

impl Default for TableFilter {
    fn default() -> Self {
        Self::all()
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                MigrateError::Config(format!("invalid table pattern '{}': {}", pattern, e))
            })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| MigrateError::Config(format!("invalid table patterns: {}", e)))
}
