//! Structured diagnostic messages scoped to projects and files.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use strata_common::CanonicalPath;

/// A structured diagnostic message.
///
/// Diagnostics are the primary mechanism for reporting errors, warnings,
/// and build status to the user. Unlike single-compiler diagnostics they
/// carry no source span; the unit of attribution in the orchestrator is a
/// project (and optionally a file within it).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique code identifying the type of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The project this diagnostic belongs to, if any.
    pub project: Option<CanonicalPath>,
    /// The file within the project this diagnostic refers to, if any.
    pub file: Option<CanonicalPath>,
    /// Explanatory footnotes (e.g., "note: ...").
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a new error diagnostic with the given code and message.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            project: None,
            file: None,
            notes: Vec::new(),
        }
    }

    /// Creates a new warning diagnostic with the given code and message.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            project: None,
            file: None,
            notes: Vec::new(),
        }
    }

    /// Creates a new note diagnostic with the given code and message.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            code,
            message: message.into(),
            project: None,
            file: None,
            notes: Vec::new(),
        }
    }

    /// Attributes this diagnostic to a project.
    pub fn with_project(mut self, project: CanonicalPath) -> Self {
        self.project = Some(project);
        self
    }

    /// Attributes this diagnostic to a file.
    pub fn with_file(mut self, file: CanonicalPath) -> Self {
        self.file = Some(file);
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::codes;

    #[test]
    fn create_error() {
        let diag = Diagnostic::error(codes::CONFIG_NOT_FOUND, "cannot read strata.toml");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "cannot read strata.toml");
        assert_eq!(format!("{}", diag.code), "E202");
        assert!(diag.project.is_none());
    }

    #[test]
    fn create_note() {
        let diag = Diagnostic::note(codes::UP_TO_DATE, "project is up to date");
        assert_eq!(diag.severity, Severity::Note);
    }

    #[test]
    fn builder_methods() {
        let diag = Diagnostic::error(codes::SOURCE_UNREADABLE, "cannot read file")
            .with_project(CanonicalPath::from_canonical("/proj/app/strata.toml"))
            .with_file(CanonicalPath::from_canonical("/proj/app/src/main.st"))
            .with_note("the file was listed in [project] files");
        assert!(diag.project.is_some());
        assert!(diag.file.is_some());
        assert_eq!(diag.notes.len(), 1);
    }

    #[test]
    fn serde_roundtrip() {
        let diag = Diagnostic::warning(codes::CONFIG_INVALID, "suspect field")
            .with_project(CanonicalPath::from_canonical("/proj/strata.toml"));
        let json = serde_json::to_string(&diag).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, "suspect field");
        assert_eq!(back.severity, Severity::Warning);
    }
}
