// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Diagnostics collected by compiler passes
//!
//! Passes never print findings at the point of detection. They push them into a
//! [`Diagnostics`] buffer and the driver flushes the buffer once the pass has
//! finished, so each pass reports all of its findings together.

use crate::position::Position;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Non-blocking finding
    Warning,
    /// Recoverable error; analysis continues but output is provisional
    Error,
    /// Process-ending error; later passes do not run
    Fatal,
}

/// Categories of findings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    #[error("Duplicate declaration")]
    DuplicateDeclaration,

    #[error("Unresolved name")]
    UnresolvedName,

    #[error("Type mismatch")]
    TypeMismatch,

    #[error("Invalid invocation")]
    InvalidInvocation,

    #[error("Illegal sense statement")]
    IllegalSense,

    #[error("Illegal return statement")]
    IllegalReturn,

    #[error("Illegal statement")]
    IllegalStatement,

    #[error("Invalid clause")]
    InvalidClause,

    #[error("Invalid clause argument")]
    InvalidClauseArgument,

    #[error("Empty constraint")]
    EmptyConstraint,

    #[error("Invalid inference")]
    InvalidInference,

    #[error("Invalid learning expression")]
    InvalidLearner,

    #[error("Value range")]
    ValueRange,

    #[error("Protected artifact")]
    ProtectedOverwrite,

    #[error("Fatal error")]
    Fatal,
}

impl DiagnosticKind {
    /// Get a short code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::DuplicateDeclaration => "D001",
            DiagnosticKind::UnresolvedName => "D002",
            DiagnosticKind::TypeMismatch => "D003",
            DiagnosticKind::InvalidInvocation => "D004",
            DiagnosticKind::IllegalSense => "D005",
            DiagnosticKind::IllegalReturn => "D006",
            DiagnosticKind::IllegalStatement => "D014",
            DiagnosticKind::InvalidClause => "D007",
            DiagnosticKind::InvalidClauseArgument => "D008",
            DiagnosticKind::EmptyConstraint => "D009",
            DiagnosticKind::InvalidInference => "D010",
            DiagnosticKind::InvalidLearner => "D011",
            DiagnosticKind::ValueRange => "D012",
            DiagnosticKind::ProtectedOverwrite => "D013",
            DiagnosticKind::Fatal => "D999",
        }
    }
}

/// One finding reported by a pass
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub position: Position,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        if self.position.is_valid() {
            write!(f, "{label}[{}] at {}: {}", self.kind.code(), self.position, self.message)
        } else {
            write!(f, "{label}[{}]: {}", self.kind.code(), self.message)
        }
    }
}

/// Per-pass buffer of findings
#[derive(Debug, Default)]
pub struct Diagnostics {
    pass: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty buffer for the named pass
    pub fn new(pass: impl Into<String>) -> Self {
        Self { pass: pass.into(), entries: Vec::new() }
    }

    /// Name of the pass this buffer belongs to
    pub fn pass(&self) -> &str {
        &self.pass
    }

    pub fn error(&mut self, kind: DiagnosticKind, position: Position, message: impl Into<String>) {
        self.push(Severity::Error, kind, position, message);
    }

    pub fn warning(&mut self, kind: DiagnosticKind, position: Position, message: impl Into<String>) {
        self.push(Severity::Warning, kind, position, message);
    }

    pub fn fatal(&mut self, message: impl Into<String>) {
        self.push(Severity::Fatal, DiagnosticKind::Fatal, Position::unknown(), message);
    }

    fn push(&mut self, severity: Severity, kind: DiagnosticKind, position: Position, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity,
            kind,
            position,
            message: message.into(),
        });
    }

    /// Move every finding of `other` into this buffer
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|d| d.severity >= Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries.iter().filter(|d| d.severity == Severity::Warning).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn has_fatal(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Fatal)
    }

    /// Check whether any finding of the given kind was recorded
    pub fn contains(&self, kind: &DiagnosticKind) -> bool {
        self.entries.iter().any(|d| &d.kind == kind)
    }

    /// Emit every buffered finding through `tracing` and drain the buffer
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        for diagnostic in &self.entries {
            match diagnostic.severity {
                Severity::Warning => warn!(pass = %self.pass, "{diagnostic}"),
                Severity::Error | Severity::Fatal => error!(pass = %self.pass, "{diagnostic}"),
            }
        }
        std::mem::take(&mut self.entries)
    }
}
