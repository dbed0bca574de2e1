//! Persistence boundary between business logic and storage backends.
//!
//! # Responsibility
//! - Define the backend-agnostic `Storage` contract over users, notes,
//!   boards, and board membership.
//! - Provide an in-memory backend (tests, ephemeral use) and a SQLite backend.
//!
//! # Invariants
//! - New ids are `1` for an empty collection, otherwise `max(existing) + 1`,
//!   assigned while the collection is locked.
//! - `get_board` never returns a board whose status is not `active`.
//! - Multi-record writes (`save_board_with_owner`, `delete_board`) are atomic.
//! - A board that has an owner keeps at least one: demoting or removing its
//!   only owner fails with `LastOwner`, checked under the same lock or
//!   transaction as the write.
//! - Backend failures surface as `StorageError`, never as panics.

use crate::credential::CredentialError;
use crate::db::DbError;
use crate::model::note::{Board, BoardId, BoardMember, BoardUser, Note, NoteId, Role, UserBoard};
use crate::model::user::{User, UserId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

pub type StorageResult<T> = Result<T, StorageError>;

/// Entity collection named in `NotFound` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Note,
    Board,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Note => "note",
            Self::Board => "board",
        }
    }
}

/// Storage error shared by all backends.
#[derive(Debug)]
pub enum StorageError {
    /// Referenced record does not exist (or, for boards, is not active).
    NotFound { entity: EntityKind, id: i64 },
    /// No membership record for the pair.
    BoardUserNotFound { board_id: BoardId, user_id: UserId },
    /// Another user already owns this email.
    DuplicateEmail(String),
    /// The write would leave the board without an owner.
    LastOwner { board_id: BoardId, user_id: UserId },
    /// Write referenced a record that is missing from the backend.
    ConstraintViolation(String),
    /// Persisted row could not be converted to an entity.
    InvalidData(String),
    /// Password could not be hashed.
    Credential(CredentialError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
}

impl StorageError {
    pub fn not_found(entity: EntityKind, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{} {id} was not found", entity.as_str()),
            Self::BoardUserNotFound { board_id, user_id } => {
                write!(f, "user {user_id} has no role on board {board_id}")
            }
            Self::DuplicateEmail(email) => write!(f, "email already registered: {email}"),
            Self::LastOwner { board_id, user_id } => {
                write!(f, "user {user_id} is the last owner of board {board_id}")
            }
            Self::Credential(err) => write!(f, "{err}"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Credential(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<CredentialError> for StorageError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence contract implemented by every backend.
///
/// Business logic depends on this trait only, so use cases run unchanged
/// against [`MemoryStorage`] and [`SqliteStorage`].
pub trait Storage: Send + Sync {
    /// Short backend name for diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Persists a new user and its hashed credential.
    fn create_user(&self, user: &User, raw_password: &str) -> StorageResult<User>;
    /// Overwrites an existing user record.
    fn save_user(&self, user: &User) -> StorageResult<User>;
    fn get_user(&self, id: UserId) -> StorageResult<User>;
    fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;
    /// Checks a raw password against the stored hash.
    fn verify_password(&self, user_id: UserId, raw_password: &str) -> StorageResult<bool>;

    /// Inserts (id `None`) or overwrites (id set) a note.
    fn save_note(&self, note: &Note) -> StorageResult<Note>;
    fn get_note(&self, id: NoteId) -> StorageResult<Note>;
    /// Permanently removes a note.
    fn delete_note(&self, id: NoteId) -> StorageResult<()>;

    /// Inserts (id `None`) or overwrites (id set) a board.
    fn save_board(&self, board: &Board) -> StorageResult<Board>;
    /// Inserts a board and its `owner` join record in one atomic step.
    fn save_board_with_owner(&self, board: &Board, owner_id: UserId) -> StorageResult<Board>;
    /// Loads an active board.
    fn get_board(&self, id: BoardId) -> StorageResult<Board>;
    fn get_board_notes(&self, board_id: BoardId) -> StorageResult<Vec<Note>>;
    /// Soft-deletes a board and removes its notes and join records atomically.
    fn delete_board(&self, id: BoardId) -> StorageResult<Board>;

    /// Upserts the join record for `(board_id, user_id)`.
    ///
    /// Demoting the board's only owner fails with `LastOwner`.
    fn save_board_user(
        &self,
        board_id: BoardId,
        user_id: UserId,
        role: Role,
    ) -> StorageResult<BoardUser>;
    /// Returns the user's role on the board, or `None` without a join record.
    fn get_role(&self, user_id: UserId, board_id: BoardId) -> StorageResult<Option<Role>>;
    fn get_board_users(&self, board_id: BoardId) -> StorageResult<Vec<BoardMember>>;
    /// Lists active boards the user holds any role on.
    fn get_user_boards(&self, user_id: UserId) -> StorageResult<Vec<UserBoard>>;
    /// Removes the join record; removing the board's only owner fails with
    /// `LastOwner`.
    fn delete_board_user(&self, board_id: BoardId, user_id: UserId) -> StorageResult<BoardUser>;
}

/// Current wall clock in epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Next id for a collection: `1` when empty, otherwise `max + 1`.
pub(crate) fn next_id<I>(existing: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    existing.into_iter().max().map_or(1, |max| max + 1)
}
