//! Diagnostics
//!
//! Every provider operation reports failure by appending to a
//! [`Diagnostics`] list rather than returning an error. An error-severity
//! entry fails the surrounding operation; warnings never do.

use crate::error::CoreError;
use crate::path::Path;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

/// What kind of failure a diagnostic reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Unknown type name, or a value that does not fit the schema
    SchemaMismatch,
    /// An operation issued before the provider was configured
    OrderingViolation,
    /// Stored state that could not be migrated to the current schema
    UpgradeFailure,
    /// Stop could not cancel in-flight work
    Cancellation,
    /// Anything reported by the provider itself
    #[default]
    Provider,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
    pub byte: usize,
}

/// Location in a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub filename: String,
    pub start: SourcePos,
    pub end: SourcePos,
}

/// A single error or warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,

    #[serde(default)]
    pub category: Category,

    /// One-line description
    pub summary: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Attribute the diagnostic refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<Path>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
}

impl Diagnostic {
    fn new(severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            category: Category::default(),
            summary: summary.into(),
            detail: None,
            attribute: None,
            range: None,
        }
    }

    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(Severity::Error, summary)
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(Severity::Warning, summary)
    }

    /// An error diagnostic describing a value or schema error. The error's
    /// path, if any, becomes the diagnostic's attribute.
    pub fn from_core_error(err: &CoreError) -> Self {
        let mut diag = Self::error(err.to_string()).with_category(Category::SchemaMismatch);
        diag.attribute = err.path().cloned();
        diag
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_attribute(mut self, path: Path) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<CoreError> for Diagnostic {
    fn from(err: CoreError) -> Self {
        Self::from_core_error(&err)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.summary)?;
        if let Some(attribute) = &self.attribute {
            write!(f, " (at {})", attribute)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "\n  {}", detail)?;
        }
        Ok(())
    }
}

/// Ordered, append-only list of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Append every diagnostic from `other`, keeping order.
    pub fn append(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    /// Shorthand for pushing an error diagnostic
    pub fn error(&mut self, summary: impl Into<String>) {
        self.push(Diagnostic::error(summary));
    }

    pub fn warning(&mut self, summary: impl Into<String>) {
        self.push(Diagnostic::warning(summary));
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.0.iter().any(|d| d.category == category)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| !d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_do_not_fail() {
        let mut diags = Diagnostics::new();
        diags.warning("deprecated attribute");
        assert!(!diags.has_errors());
        diags.error("boom");
        assert!(diags.has_errors());
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_append_keeps_order() {
        let mut a: Diagnostics = Diagnostic::error("first").into();
        let mut b = Diagnostics::new();
        b.warning("second");
        b.error("third");
        a.append(b);
        let summaries: Vec<_> = a.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_from_core_error_keeps_path() {
        let err = CoreError::type_mismatch(&Path::root().attr("size"), "number required");
        let diag = Diagnostic::from(err);
        assert_eq!(diag.category, Category::SchemaMismatch);
        assert_eq!(diag.attribute, Some(Path::root().attr("size")));
        assert_eq!(diag.to_string(), "Error: .size: number required (at .size)");
    }
}
