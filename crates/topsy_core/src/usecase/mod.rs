//! Business use cases for accounts, notes, and boards.
//!
//! # Responsibility
//! - Enforce business preconditions before anything reaches storage.
//! - Operate on entities only; storage technology never leaks upward.
//!
//! # Invariants
//! - Validation failures happen before any write.
//! - Storage `NotFound` is surfaced unchanged in meaning, never swallowed.

use crate::model::entity::InvalidFieldError;
use crate::model::note::BoardId;
use crate::model::user::UserId;
use crate::storage::{EntityKind, StorageError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account;
pub mod note;

pub use account::AccountUseCases;
pub use note::NoteUseCases;

pub type UseCaseResult<T> = Result<T, UseCaseError>;

/// Caller-supplied data failed a business precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required input (field, actor id, board id, password) is absent.
    MissingField(&'static str),
    /// Required text input is present but blank.
    BlankField(&'static str),
    /// Entity construction rejected the supplied fields.
    InvalidField(InvalidFieldError),
    /// Role token is not one of `reader|editor|owner`.
    InvalidRole(String),
    InvalidEmail(String),
    DuplicateEmail(String),
    /// Email/password pair did not authenticate an active user.
    InvalidCredentials,
    /// Removing or demoting this member would leave the board without an owner.
    LastOwner { board_id: BoardId, user_id: UserId },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::BlankField(field) => write!(f, "field `{field}` must not be blank"),
            Self::InvalidField(err) => write!(f, "{err}"),
            Self::InvalidRole(role) => {
                write!(f, "invalid role `{role}`; expected reader|editor|owner")
            }
            Self::InvalidEmail(email) => write!(f, "invalid email address `{email}`"),
            Self::DuplicateEmail(email) => write!(f, "email already registered: {email}"),
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::LastOwner { board_id, user_id } => write!(
                f,
                "user {user_id} is the last owner of board {board_id} and cannot be removed or demoted"
            ),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidField(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidFieldError> for ValidationError {
    fn from(value: InvalidFieldError) -> Self {
        match value {
            InvalidFieldError::MissingField { field, .. } => Self::MissingField(field),
            other => Self::InvalidField(other),
        }
    }
}

/// Error returned by every use case.
#[derive(Debug)]
pub enum UseCaseError {
    Validation(ValidationError),
    /// Referenced entity does not exist (boards: or is soft-deleted).
    NotFound { entity: EntityKind, id: i64 },
    /// The user holds no role on the board.
    MembershipNotFound { board_id: BoardId, user_id: UserId },
    /// Backend failure that is not part of the business contract.
    Storage(StorageError),
}

impl UseCaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::MembershipNotFound { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl Display for UseCaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound { entity, id } => write!(f, "{} {id} was not found", entity.as_str()),
            Self::MembershipNotFound { board_id, user_id } => {
                write!(f, "user {user_id} has no role on board {board_id}")
            }
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UseCaseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for UseCaseError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<InvalidFieldError> for UseCaseError {
    fn from(value: InvalidFieldError) -> Self {
        Self::Validation(value.into())
    }
}

impl From<StorageError> for UseCaseError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::NotFound { entity, id } => Self::NotFound { entity, id },
            StorageError::BoardUserNotFound { board_id, user_id } => {
                Self::MembershipNotFound { board_id, user_id }
            }
            StorageError::DuplicateEmail(email) => {
                Self::Validation(ValidationError::DuplicateEmail(email))
            }
            StorageError::LastOwner { board_id, user_id } => {
                Self::Validation(ValidationError::LastOwner { board_id, user_id })
            }
            other => Self::Storage(other),
        }
    }
}

/// Returns the trimmed value, or `BlankField` when nothing is left.
pub(crate) fn require_text(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}
