//! Line-level scanning of source files for reference edges and
//! scope-affecting facts.
//!
//! This is not a parser. The host only needs the handful of facts the
//! snapshot engine consumes: whether a file is a module, whether it
//! augments the global scope, whether it has non-ambient statements, and
//! which files it references. Those are recoverable from line shapes:
//!
//! ```text
//! /// <reference path="../shared/types.d.st" />
//! import "./util";
//! import { x } from "./x";
//! export const y = 1;
//! declare global { ... }
//! declare module "name" { ... }
//! ```

/// Facts about one source file recovered by scanning.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScannedFacts {
    /// Whether the file has imports or exports of its own.
    pub is_module: bool,
    /// Whether the file augments the global scope.
    pub has_global_augmentation: bool,
    /// Whether the file has at least one top-level statement that is not
    /// an ambient string-literal-named module declaration.
    pub has_non_ambient_statements: bool,
    /// Reference specifiers, as written (unresolved).
    pub references: Vec<String>,
}

/// Scans `text` line by line.
pub fn scan(text: &str) -> ScannedFacts {
    let mut facts = ScannedFacts::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(path) = reference_directive(line) {
            facts.references.push(path.to_string());
            continue;
        }
        if line.starts_with("//") {
            continue;
        }

        if line.starts_with("import ") || line.starts_with("import\"") {
            facts.is_module = true;
            if let Some(spec) = quoted_specifier(line) {
                facts.references.push(spec.to_string());
            }
            continue;
        }
        if line.starts_with("export ") {
            facts.is_module = true;
            facts.has_non_ambient_statements = true;
            continue;
        }

        if line.starts_with("declare global") {
            facts.has_global_augmentation = true;
            continue;
        }
        if line.starts_with("declare module \"") || line.starts_with("declare module '") {
            // Ambient string-literal-named module declaration
            continue;
        }
        if line.starts_with('}') {
            continue;
        }

        facts.has_non_ambient_statements = true;
    }

    facts
}

/// Extracts the path from a `/// <reference path="..." />` directive.
fn reference_directive(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("///")?.trim_start();
    let rest = rest.strip_prefix("<reference")?;
    let start = rest.find("path=\"")? + "path=\"".len();
    let end = rest[start..].find('"')? + start;
    Some(&rest[start..end])
}

/// Extracts the last double- or single-quoted specifier on a line.
fn quoted_specifier(line: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        let mut parts = line.split(quote);
        let _before = parts.next()?;
        let mut last = None;
        while let Some(inside) = parts.next() {
            last = Some(inside);
            // Skip the text between closing and next opening quote
            parts.next();
        }
        if let Some(spec) = last {
            return Some(spec);
        }
    }
    None
}
