//! Diagnostic creation, severity management, and text rendering.
//!
//! This crate provides structured [`Diagnostic`] messages with severity
//! levels and error codes, scoped to a project and optionally a file. The
//! thread-safe [`DiagnosticSink`] accumulates diagnostics during a build,
//! and [`TextRenderer`] formats them as human-readable lines for the
//! build-order-serialized output stream.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{codes, Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::TextRenderer;
pub use severity::Severity;
pub use sink::DiagnosticSink;
