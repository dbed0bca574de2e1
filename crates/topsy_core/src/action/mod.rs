//! Actions: use-case calls wrapped with permission checks and audit logging.
//!
//! # Responsibility
//! - Refuse a call when the caller's resolved permissions lack a token.
//! - Write one audit entry naming the action and its arguments.
//!
//! # Invariants
//! - Order is fixed: every permission check, then the audit entry, then
//!   exactly one use-case invocation.
//! - A denied call performs no side effects and writes no audit entry.
//! - Audit sink failures are reported as diagnostics and never fail a call.
//!
//! Callers resolve permission sets with `PermissionChecker` for the board
//! they pass to the action.

use crate::audit::AuditSink;
use crate::permission::{Permission, PermissionError, PermissionSet};
use crate::usecase::UseCaseError;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account;
pub mod note;

pub use account::AccountActions;
pub use note::NoteActions;

pub type ActionResult<T> = Result<T, ActionError>;

/// Error returned by every action.
#[derive(Debug)]
pub enum ActionError {
    Permission(PermissionError),
    UseCase(UseCaseError),
}

impl ActionError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Permission(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UseCase(err) if err.is_not_found())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::UseCase(err) if err.is_validation())
    }
}

impl Display for ActionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permission(err) => write!(f, "{err}"),
            Self::UseCase(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ActionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Permission(err) => Some(err),
            Self::UseCase(err) => Some(err),
        }
    }
}

impl From<PermissionError> for ActionError {
    fn from(value: PermissionError) -> Self {
        Self::Permission(value)
    }
}

impl From<UseCaseError> for ActionError {
    fn from(value: UseCaseError) -> Self {
        Self::UseCase(value)
    }
}

/// One wrapped invocation: required permissions plus audit arguments.
#[derive(Debug)]
pub struct Action<'a> {
    name: &'static str,
    requirements: Vec<(Permission, &'a PermissionSet)>,
    args: Vec<(&'static str, String)>,
}

impl<'a> Action<'a> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            requirements: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Requires `permission` to be present in `granted`.
    pub fn require(mut self, permission: Permission, granted: &'a PermissionSet) -> Self {
        self.requirements.push((permission, granted));
        self
    }

    /// Adds one argument to the audit entry.
    pub fn arg(mut self, key: &'static str, value: impl Display) -> Self {
        self.args.push((key, value.to_string()));
        self
    }

    /// Adds an optional argument; absent values are written as `none`.
    pub fn arg_opt<T: Display>(self, key: &'static str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.arg(key, value),
            None => self.arg(key, "none"),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Audit entry text: `name: key1=value1, key2=value2`, or just `name`
    /// without arguments.
    pub fn audit_message(&self) -> String {
        if self.args.is_empty() {
            return self.name.to_string();
        }
        let args = self
            .args
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}: {args}", self.name)
    }

    /// Checks every requirement in declaration order.
    pub fn authorize(&self) -> Result<(), PermissionError> {
        for (permission, granted) in &self.requirements {
            if !granted.contains(*permission) {
                return Err(PermissionError {
                    permission: *permission,
                });
            }
        }
        Ok(())
    }

    /// Authorizes, records the audit entry, then invokes `call` once.
    pub fn run<T, E>(
        self,
        audit: &dyn AuditSink,
        call: impl FnOnce() -> Result<T, E>,
    ) -> ActionResult<T>
    where
        ActionError: From<E>,
    {
        if let Err(err) = self.authorize() {
            warn!(
                "event=action_denied module=action action={} permission={}",
                self.name, err.permission
            );
            return Err(err.into());
        }

        if let Err(err) = audit.info(&self.audit_message()) {
            warn!(
                "event=audit_write module=action status=error action={} error={err}",
                self.name
            );
        }

        Ok(call()?)
    }
}
