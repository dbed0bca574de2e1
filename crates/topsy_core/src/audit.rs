//! Audit trail sinks.
//!
//! Actions emit one `info` entry per invocation. Sinks may fail, but a
//! failing sink never blocks or fails the action that wrote to it.

use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Target used for audit records routed through the `log` facade.
pub const AUDIT_LOG_TARGET: &str = "topsy::audit";

/// Severity of one recorded audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl AuditLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Sink failed to record an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditError(pub String);

impl Display for AuditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "audit sink failed: {}", self.0)
    }
}

impl Error for AuditError {}

/// Logging collaborator used by actions.
pub trait AuditSink: Send + Sync {
    fn info(&self, message: &str) -> Result<(), AuditError>;
}

/// Forwards audit entries to the process logger.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn info(&self, message: &str) -> Result<(), AuditError> {
        info!(target: AUDIT_LOG_TARGET, "{message}");
        Ok(())
    }
}

/// Keeps audit entries in memory; used by tests and local tooling.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<(AuditLevel, String)>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&self, message: &str) {
        self.push(AuditLevel::Debug, message);
    }

    pub fn warning(&self, message: &str) {
        self.push(AuditLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.push(AuditLevel::Error, message);
    }

    /// Returns a snapshot of every recorded entry in write order.
    pub fn dump(&self) -> Vec<(AuditLevel, String)> {
        self.entries().clone()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    fn push(&self, level: AuditLevel, message: &str) {
        self.entries().push((level, message.to_string()));
    }

    fn entries(&self) -> MutexGuard<'_, Vec<(AuditLevel, String)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuditSink for MemoryAuditSink {
    fn info(&self, message: &str) -> Result<(), AuditError> {
        self.push(AuditLevel::Info, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AuditLevel, AuditSink, MemoryAuditSink};

    #[test]
    fn memory_sink_records_levels_in_order() {
        let sink = MemoryAuditSink::new();
        sink.debug("one");
        sink.info("two").unwrap();
        sink.warning("three");
        sink.error("four");

        let levels: Vec<_> = sink.dump().into_iter().map(|(level, _)| level).collect();
        assert_eq!(
            levels,
            vec![
                AuditLevel::Debug,
                AuditLevel::Info,
                AuditLevel::Warning,
                AuditLevel::Error
            ]
        );

        sink.clear();
        assert!(sink.dump().is_empty());
    }
}
