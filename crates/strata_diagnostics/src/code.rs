//! Diagnostic codes with category prefixes for structured error identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Error diagnostics, prefixed with `E`.
    Error,
    /// Warning diagnostics, prefixed with `W`.
    Warning,
    /// Build status diagnostics, prefixed with `B`.
    Build,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Build => 'B',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a numeric
/// identifier.
///
/// Displayed as the category prefix followed by a zero-padded 3-digit
/// number, e.g., `E201`, `W105`, `B301`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

/// Well-known diagnostic codes emitted by the orchestrator itself.
///
/// The compiler collaborator emits its own codes; these cover graph
/// construction, configuration resolution, and build bookkeeping.
pub mod codes {
    use super::{Category, DiagnosticCode};

    /// A cycle was detected in the project reference graph.
    pub const REFERENCE_CYCLE: DiagnosticCode = DiagnosticCode::new(Category::Error, 201);
    /// A referenced project configuration could not be read.
    pub const CONFIG_NOT_FOUND: DiagnosticCode = DiagnosticCode::new(Category::Error, 202);
    /// A referenced project configuration failed to parse or validate.
    pub const CONFIG_INVALID: DiagnosticCode = DiagnosticCode::new(Category::Error, 203);
    /// A source file listed by a project could not be read.
    pub const SOURCE_UNREADABLE: DiagnosticCode = DiagnosticCode::new(Category::Error, 204);
    /// Writing an output artifact or build-info file failed.
    pub const EMIT_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 205);
    /// A project's outputs were removed by a clean pass.
    pub const OUTPUTS_CLEANED: DiagnosticCode = DiagnosticCode::new(Category::Build, 301);
    /// A project was skipped because its outputs are up to date.
    pub const UP_TO_DATE: DiagnosticCode = DiagnosticCode::new(Category::Build, 302);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prefixes() {
        assert_eq!(Category::Error.prefix(), 'E');
        assert_eq!(Category::Warning.prefix(), 'W');
        assert_eq!(Category::Build.prefix(), 'B');
    }

    #[test]
    fn display_format() {
        let code = DiagnosticCode::new(Category::Error, 201);
        assert_eq!(format!("{code}"), "E201");

        let code = DiagnosticCode::new(Category::Warning, 3);
        assert_eq!(format!("{code}"), "W003");

        let code = DiagnosticCode::new(Category::Build, 42);
        assert_eq!(format!("{code}"), "B042");
    }

    #[test]
    fn well_known_codes() {
        assert_eq!(format!("{}", codes::REFERENCE_CYCLE), "E201");
        assert_eq!(format!("{}", codes::UP_TO_DATE), "B302");
    }

    #[test]
    fn serde_roundtrip() {
        let code = codes::CONFIG_NOT_FOUND;
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
