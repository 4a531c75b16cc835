use serde::{Deserialize, Serialize};
use std::fmt;
use text_size::TextRange;

/// What kind of problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Malformed text. Analysis continues on a best-effort tree.
    SyntaxError,
    /// A reference that could not be bound to a declaration.
    UnresolvedSymbol,
}

impl DiagnosticKind {
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => "syntax-error",
            DiagnosticKind::UnresolvedSymbol => "unresolved-symbol",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A problem found while analyzing one file, anchored to a byte range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub range: TextRange,
    pub message: String,
}

impl Diagnostic {
    pub fn syntax_error(range: TextRange, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::SyntaxError,
            severity: Severity::Error,
            range,
            message: message.into(),
        }
    }

    pub fn unresolved_symbol(range: TextRange, name: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnresolvedSymbol,
            severity: Severity::Error,
            range,
            message: format!("cannot resolve symbol `{name}`"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}: {} [{}]",
            u32::from(self.range.start()),
            u32::from(self.range.end()),
            self.message,
            self.kind.code()
        )
    }
}
