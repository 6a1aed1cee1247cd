use std::cell::RefCell;
use std::fmt;

use crate::processor::CastError;

/// Non-fatal data-quality condition reported while loading, casting or sorting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A data line had the wrong number of fields and was dropped
    RowValidation {
        /// 1-based line number in the source
        line: usize,
        expected: usize,
        found: usize,
    },
    /// A caster rejected a field; the raw string was kept
    CastFallback {
        /// 0-based row index in the table being cast
        row: usize,
        column: String,
        value: String,
        error: CastError,
    },
    /// Two sort keys could not be compared and were treated as equal
    Comparison {
        key: String,
        left: &'static str,
        right: &'static str,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::RowValidation {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {line}: expected {expected} fields, got {found}; row skipped"
            ),
            Diagnostic::CastFallback {
                row,
                column,
                value,
                error,
            } => write!(
                f,
                "row {row}, column '{column}': cannot cast {value:?} ({error}); kept as string"
            ),
            Diagnostic::Comparison { key, left, right } => write!(
                f,
                "values for key '{key}' are not comparable ({left} vs {right}); treated as equal"
            ),
        }
    }
}

/// Side channel for [`Diagnostic`]s. Emitting never fails and never blocks the
/// operation that reports it.
pub trait DiagnosticSink {
    fn emit(&self, diagnostic: Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Diagnostic),
{
    fn emit(&self, diagnostic: Diagnostic) {
        self(&diagnostic)
    }
}

/// Forwards every diagnostic to `tracing` at WARN level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::RowValidation {
                line,
                expected,
                found,
            } => {
                tracing::warn!(line, expected, found, "invalid field count, skipping row");
            }
            Diagnostic::CastFallback {
                row,
                column,
                value,
                error,
            } => {
                tracing::warn!(row, %column, %value, error = %error, "cast failed, keeping string");
            }
            Diagnostic::Comparison { key, left, right } => {
                tracing::warn!(%key, left, right, "values are not comparable");
            }
        }
    }
}

/// Keeps every diagnostic in memory for later inspection
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }
}
