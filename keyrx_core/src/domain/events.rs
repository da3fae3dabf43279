//! Structured diagnostics.
//!
//! The external API surfaces only a boolean/`Option`/`Result`; the `log`
//! facade carries the human-readable line at the call site, the same way
//! `compat.c`'s `log_warn`/`log_err` do. This bus additionally accumulates
//! the same events as typed values (a `DomainEvent`/`DomainEventBus`
//! publish/drain pattern), so a caller that wants more than "it failed" can
//! inspect what happened.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One recorded diagnostic: a collision, an override, an unsupported
/// legacy field, or a per-statement error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Which source file produced this diagnostic.
    pub file_id: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(file_id: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            file_id,
            message: message.into(),
        }
    }

    pub fn error(file_id: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            file_id,
            message: message.into(),
        }
    }

    pub fn from_error(file_id: u32, err: &CoreError) -> Self {
        Diagnostic::error(file_id, err.to_string())
    }
}

/// Accumulates [`Diagnostic`]s emitted while compiling one or more files,
/// logging each through the `log` facade as it is published.
#[derive(Debug, Default)]
pub struct DiagnosticBus {
    events: Vec<Diagnostic>,
}

impl DiagnosticBus {
    pub fn new() -> Self {
        DiagnosticBus::default()
    }

    pub fn publish(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => log::warn!("{}", diagnostic.message),
            Severity::Error => log::error!("{}", diagnostic.message),
        }
        self.events.push(diagnostic);
    }

    /// Drains every recorded diagnostic, leaving the bus empty.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        core::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter()
    }

    pub fn error_count(&self) -> usize {
        self.events
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
