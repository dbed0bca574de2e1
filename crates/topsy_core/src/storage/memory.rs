//! Volatile storage backend kept in process memory.
//!
//! # Responsibility
//! - Mirror the SQLite backend contract without any database so use cases
//!   and actions can be exercised in isolation.
//!
//! # Invariants
//! - All collections live behind one mutex: id assignment and cascading
//!   writes are serialized and never observed half-applied.
//! - Membership records for unknown users are accepted (no foreign keys);
//!   they are skipped by `get_board_users`.

use crate::credential::{Argon2Hasher, PasswordHasher};
use crate::model::note::{
    Board, BoardId, BoardMember, BoardUser, EntityStatus, Note, NoteId, Role, UserBoard,
};
use crate::model::user::{User, UserId};
use crate::storage::{
    next_id, now_epoch_ms, EntityKind, Storage, StorageError, StorageResult,
};
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryTables {
    users: BTreeMap<UserId, User>,
    credentials: BTreeMap<UserId, String>,
    notes: BTreeMap<NoteId, Note>,
    boards: BTreeMap<BoardId, Board>,
    board_users: Vec<BoardUser>,
}

impl MemoryTables {
    fn ensure_unique_email(&self, email: &str, owner: Option<UserId>) -> StorageResult<()> {
        let taken = self
            .users
            .values()
            .any(|existing| existing.email == email && existing.id != owner);
        if taken {
            return Err(StorageError::DuplicateEmail(email.to_string()));
        }
        Ok(())
    }

    fn insert_board(&mut self, board: &Board, now: i64) -> Board {
        let id = board.id.unwrap_or_else(|| next_id(self.boards.keys().copied()));
        let stored = Board {
            id: Some(id),
            created_at: board.created_at.or(Some(now)),
            modified_at: Some(now),
            ..board.clone()
        };
        self.boards.insert(id, stored.clone());
        stored
    }

    /// Fails with `LastOwner` when `user_id` is the board's only owner.
    fn ensure_other_owner(&self, board_id: BoardId, user_id: UserId) -> StorageResult<()> {
        let owners: Vec<UserId> = self
            .board_users
            .iter()
            .filter(|record| record.board_id == board_id && record.role == Role::Owner)
            .map(|record| record.user_id)
            .collect();
        if owners == [user_id] {
            return Err(StorageError::LastOwner { board_id, user_id });
        }
        Ok(())
    }

    fn upsert_board_user(&mut self, board_id: BoardId, user_id: UserId, role: Role) -> BoardUser {
        if let Some(existing) = self
            .board_users
            .iter_mut()
            .find(|record| record.board_id == board_id && record.user_id == user_id)
        {
            existing.role = role;
            return *existing;
        }

        let record = BoardUser {
            board_id,
            user_id,
            role,
        };
        self.board_users.push(record);
        record
    }
}

/// In-memory `Storage` implementation.
pub struct MemoryStorage {
    tables: Mutex<MemoryTables>,
    hasher: Box<dyn PasswordHasher>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Creates an empty store using the default password hasher.
    pub fn new() -> Self {
        Self::with_hasher(Box::new(Argon2Hasher))
    }

    /// Creates an empty store with a caller-provided password hasher.
    pub fn with_hasher(hasher: Box<dyn PasswordHasher>) -> Self {
        Self {
            tables: Mutex::new(MemoryTables::default()),
            hasher,
        }
    }

    /// Number of membership records; used by tests to assert no duplicates.
    pub fn board_user_count(&self) -> usize {
        self.tables().board_users.len()
    }

    fn tables(&self) -> MutexGuard<'_, MemoryTables> {
        // A panic while holding the lock cannot leave a half-written record:
        // every write below is a single map/vec operation after validation.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn create_user(&self, user: &User, raw_password: &str) -> StorageResult<User> {
        let password_hash = self.hasher.hash(raw_password)?;
        let now = now_epoch_ms();
        let mut tables = self.tables();
        tables.ensure_unique_email(&user.email, user.id)?;
        if let Some(id) = user.id.filter(|id| tables.users.contains_key(id)) {
            return Err(StorageError::ConstraintViolation(format!(
                "user {id} already exists"
            )));
        }

        let id = user.id.unwrap_or_else(|| next_id(tables.users.keys().copied()));
        let stored = User {
            id: Some(id),
            created_at: user.created_at.or(Some(now)),
            modified_at: Some(now),
            ..user.clone()
        };
        tables.users.insert(id, stored.clone());
        tables.credentials.insert(id, password_hash);
        debug!("event=user_create module=storage backend=memory status=ok user_id={id}");
        Ok(stored)
    }

    fn save_user(&self, user: &User) -> StorageResult<User> {
        let Some(id) = user.id else {
            return Err(StorageError::ConstraintViolation(
                "save_user requires a persisted user id".to_string(),
            ));
        };
        let mut tables = self.tables();
        let created_at = tables
            .users
            .get(&id)
            .ok_or(StorageError::not_found(EntityKind::User, id))?
            .created_at;
        tables.ensure_unique_email(&user.email, Some(id))?;

        let stored = User {
            created_at: user.created_at.or(created_at),
            modified_at: Some(now_epoch_ms()),
            ..user.clone()
        };
        tables.users.insert(id, stored.clone());
        Ok(stored)
    }

    fn get_user(&self, id: UserId) -> StorageResult<User> {
        self.tables()
            .users
            .get(&id)
            .cloned()
            .ok_or(StorageError::not_found(EntityKind::User, id))
    }

    fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    fn verify_password(&self, user_id: UserId, raw_password: &str) -> StorageResult<bool> {
        let tables = self.tables();
        if !tables.users.contains_key(&user_id) {
            return Err(StorageError::not_found(EntityKind::User, user_id));
        }
        Ok(tables
            .credentials
            .get(&user_id)
            .is_some_and(|hash| self.hasher.verify(raw_password, hash)))
    }

    fn save_note(&self, note: &Note) -> StorageResult<Note> {
        let now = now_epoch_ms();
        let mut tables = self.tables();
        let id = note.id.unwrap_or_else(|| next_id(tables.notes.keys().copied()));
        let stored = Note {
            id: Some(id),
            created_at: note.created_at.or(Some(now)),
            modified_at: Some(now),
            ..note.clone()
        };
        tables.notes.insert(id, stored.clone());
        debug!("event=note_save module=storage backend=memory status=ok note_id={id}");
        Ok(stored)
    }

    fn get_note(&self, id: NoteId) -> StorageResult<Note> {
        self.tables()
            .notes
            .get(&id)
            .cloned()
            .ok_or(StorageError::not_found(EntityKind::Note, id))
    }

    fn delete_note(&self, id: NoteId) -> StorageResult<()> {
        self.tables()
            .notes
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::not_found(EntityKind::Note, id))
    }

    fn save_board(&self, board: &Board) -> StorageResult<Board> {
        let now = now_epoch_ms();
        let stored = self.tables().insert_board(board, now);
        Ok(stored)
    }

    fn save_board_with_owner(&self, board: &Board, owner_id: UserId) -> StorageResult<Board> {
        let now = now_epoch_ms();
        let mut tables = self.tables();
        let stored = tables.insert_board(board, now);
        if let Some(board_id) = stored.id {
            tables.upsert_board_user(board_id, owner_id, Role::Owner);
        }
        debug!(
            "event=board_create module=storage backend=memory status=ok board_id={:?} owner_id={owner_id}",
            stored.id
        );
        Ok(stored)
    }

    fn get_board(&self, id: BoardId) -> StorageResult<Board> {
        self.tables()
            .boards
            .get(&id)
            .filter(|board| board.is_active())
            .cloned()
            .ok_or(StorageError::not_found(EntityKind::Board, id))
    }

    fn get_board_notes(&self, board_id: BoardId) -> StorageResult<Vec<Note>> {
        Ok(self
            .tables()
            .notes
            .values()
            .filter(|note| note.board_id == Some(board_id))
            .cloned()
            .collect())
    }

    fn delete_board(&self, id: BoardId) -> StorageResult<Board> {
        let now = now_epoch_ms();
        let mut tables = self.tables();
        let board = tables
            .boards
            .get_mut(&id)
            .filter(|board| board.is_active())
            .ok_or(StorageError::not_found(EntityKind::Board, id))?;
        *board = Board {
            status: EntityStatus::Deleted,
            modified_at: Some(now),
            ..board.clone()
        };
        let deleted = board.clone();

        tables.notes.retain(|_, note| note.board_id != Some(id));
        tables.board_users.retain(|record| record.board_id != id);
        debug!("event=board_delete module=storage backend=memory status=ok board_id={id}");
        Ok(deleted)
    }

    fn save_board_user(
        &self,
        board_id: BoardId,
        user_id: UserId,
        role: Role,
    ) -> StorageResult<BoardUser> {
        let mut tables = self.tables();
        if role != Role::Owner {
            tables.ensure_other_owner(board_id, user_id)?;
        }
        Ok(tables.upsert_board_user(board_id, user_id, role))
    }

    fn get_role(&self, user_id: UserId, board_id: BoardId) -> StorageResult<Option<Role>> {
        Ok(self
            .tables()
            .board_users
            .iter()
            .find(|record| record.board_id == board_id && record.user_id == user_id)
            .map(|record| record.role))
    }

    fn get_board_users(&self, board_id: BoardId) -> StorageResult<Vec<BoardMember>> {
        let tables = self.tables();
        Ok(tables
            .board_users
            .iter()
            .filter(|record| record.board_id == board_id)
            .filter_map(|record| {
                tables.users.get(&record.user_id).map(|user| BoardMember {
                    user: user.clone(),
                    role: record.role,
                })
            })
            .collect())
    }

    fn get_user_boards(&self, user_id: UserId) -> StorageResult<Vec<UserBoard>> {
        let tables = self.tables();
        Ok(tables
            .board_users
            .iter()
            .filter(|record| record.user_id == user_id)
            .filter_map(|record| {
                tables
                    .boards
                    .get(&record.board_id)
                    .filter(|board| board.is_active())
                    .map(|board| UserBoard {
                        board: board.clone(),
                        role: record.role,
                    })
            })
            .collect())
    }

    fn delete_board_user(&self, board_id: BoardId, user_id: UserId) -> StorageResult<BoardUser> {
        let mut tables = self.tables();
        let index = tables
            .board_users
            .iter()
            .position(|record| record.board_id == board_id && record.user_id == user_id)
            .ok_or(StorageError::BoardUserNotFound { board_id, user_id })?;
        tables.ensure_other_owner(board_id, user_id)?;
        Ok(tables.board_users.swap_remove(index))
    }
}
