//! Text rendering of diagnostics for the ordered output stream.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Renders diagnostics as human-readable text lines.
///
/// Produces output like:
/// ```text
/// error[E202]: cannot read configuration file
///   --> /proj/lib/strata.toml
///    = note: referenced from /proj/app/strata.toml
/// ```
///
/// Colors use plain ANSI codes on the severity word only, matching the
/// terse style of the rest of the status output.
pub struct TextRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TextRenderer {
    /// Creates a new text renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Renders a single diagnostic into a formatted string.
    pub fn render(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();

        let severity = if self.color {
            match diag.severity {
                Severity::Error => format!("\x1b[31m{}\x1b[0m", diag.severity),
                Severity::Warning => format!("\x1b[33m{}\x1b[0m", diag.severity),
                Severity::Note => format!("\x1b[36m{}\x1b[0m", diag.severity),
            }
        } else {
            diag.severity.to_string()
        };

        out.push_str(&format!("{severity}[{}]: {}\n", diag.code, diag.message));

        // Attribution: prefer the file, fall back to the project config
        if let Some(file) = &diag.file {
            out.push_str(&format!("  --> {file}\n"));
        } else if let Some(project) = &diag.project {
            out.push_str(&format!("  --> {project}\n"));
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }

        out
    }
}
