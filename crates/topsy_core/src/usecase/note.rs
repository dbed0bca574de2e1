//! Note and board use cases.
//!
//! # Responsibility
//! - Create, edit, move, transfer, and delete notes.
//! - Create, rename, and delete boards; manage board membership.
//!
//! # Invariants
//! - Every note has an actor (`created_by`) and non-blank title.
//! - A board is never persisted without its creator as `owner`.
//! - A board never loses its last owner: storage refuses to demote or
//!   remove it in the same atomic step as the write.
//! - Deleting a board removes its notes and memberships in one step.

use crate::model::entity::{Entity, Fields};
use crate::model::note::{
    Board, BoardId, BoardMember, BoardUser, Note, NoteId, Role, UserBoard, DEFAULT_ROLE,
};
use crate::model::user::UserId;
use crate::storage::Storage;
use crate::usecase::{require_text, UseCaseResult, ValidationError};
use log::info;
use serde_json::Value;
use std::sync::Arc;

/// Use cases for notes, boards, and board membership.
pub struct NoteUseCases<S: Storage + ?Sized> {
    storage: Arc<S>,
}

impl<S: Storage + ?Sized> Clone for NoteUseCases<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage + ?Sized> NoteUseCases<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Creates a note from fields on behalf of `user_id`.
    ///
    /// `board_id` overrides any `board_id` present in `fields`; the target
    /// board must be active.
    ///
    /// # Errors
    /// - `Validation(MissingField)` for a missing actor, `title`, or `body`.
    /// - `Validation(InvalidField)` for unknown fields.
    /// - `NotFound` when the target board does not exist.
    pub fn create_note(
        &self,
        fields: Fields,
        user_id: Option<UserId>,
        board_id: Option<BoardId>,
    ) -> UseCaseResult<Note> {
        let user_id = user_id.ok_or(ValidationError::MissingField("user_id"))?;
        let note = Note::from_fields(fields)?;
        let title = require_text(&note.title, "title")?;

        let board_id = board_id.or(note.board_id);
        if let Some(board_id) = board_id {
            self.storage.get_board(board_id)?;
        }

        // Creation always inserts: caller-supplied ids and timestamps are dropped.
        let note = Note {
            id: None,
            title,
            board_id,
            created_by: Some(user_id),
            created_at: None,
            modified_at: None,
            ..note
        };
        Ok(self.storage.save_note(&note)?)
    }

    pub fn get_note(&self, note_id: NoteId) -> UseCaseResult<Note> {
        Ok(self.storage.get_note(note_id)?)
    }

    /// Replaces only the provided fields; others keep their current values.
    pub fn edit_note(
        &self,
        note_id: NoteId,
        title: Option<&str>,
        body: Option<&str>,
    ) -> UseCaseResult<Note> {
        let note = self.storage.get_note(note_id)?;

        let mut changes = Fields::new();
        if let Some(title) = title {
            changes.insert(
                "title".to_string(),
                Value::String(require_text(title, "title")?),
            );
        }
        if let Some(body) = body {
            changes.insert("body".to_string(), Value::String(body.to_string()));
        }
        if changes.is_empty() {
            return Ok(note);
        }

        let edited = note.replace(changes)?;
        Ok(self.storage.save_note(&edited)?)
    }

    /// Permanently deletes a note.
    pub fn delete_note(&self, note_id: NoteId) -> UseCaseResult<()> {
        Ok(self.storage.delete_note(note_id)?)
    }

    /// Moves a note to another active board, or unassigns it with `None`.
    pub fn move_note(&self, note_id: NoteId, board_id: Option<BoardId>) -> UseCaseResult<Note> {
        let note = self.storage.get_note(note_id)?;
        if let Some(board_id) = board_id {
            self.storage.get_board(board_id)?;
        }
        let moved = Note { board_id, ..note };
        Ok(self.storage.save_note(&moved)?)
    }

    /// Hands a note over to another existing user.
    pub fn transfer_note(&self, note_id: NoteId, user_id: UserId) -> UseCaseResult<Note> {
        let note = self.storage.get_note(note_id)?;
        self.storage.get_user(user_id)?;
        let transferred = Note {
            created_by: Some(user_id),
            ..note
        };
        Ok(self.storage.save_note(&transferred)?)
    }

    /// Creates a board and grants its creator the `owner` role.
    ///
    /// Both writes happen in one storage step: if the membership cannot be
    /// written the board is not persisted either.
    pub fn create_board(&self, name: &str, user_id: Option<UserId>) -> UseCaseResult<Board> {
        let user_id = user_id.ok_or(ValidationError::MissingField("user_id"))?;
        let name = require_text(name, "name")?;
        let board = self
            .storage
            .save_board_with_owner(&Board::new(name), user_id)?;
        info!(
            "event=board_create module=usecase status=ok board_id={:?} owner_id={user_id}",
            board.id
        );
        Ok(board)
    }

    pub fn get_board(&self, board_id: BoardId) -> UseCaseResult<Board> {
        Ok(self.storage.get_board(board_id)?)
    }

    pub fn rename_board(&self, board_id: BoardId, name: &str) -> UseCaseResult<Board> {
        let name = require_text(name, "name")?;
        let board = self.storage.get_board(board_id)?;
        let renamed = Board { name, ..board };
        Ok(self.storage.save_board(&renamed)?)
    }

    /// Lists active boards the user can access, with the user's role.
    pub fn get_user_boards(&self, user_id: UserId) -> UseCaseResult<Vec<UserBoard>> {
        Ok(self.storage.get_user_boards(user_id)?)
    }

    pub fn get_board_notes(&self, board_id: BoardId) -> UseCaseResult<Vec<Note>> {
        self.storage.get_board(board_id)?;
        Ok(self.storage.get_board_notes(board_id)?)
    }

    pub fn get_board_users(&self, board_id: BoardId) -> UseCaseResult<Vec<BoardMember>> {
        self.storage.get_board(board_id)?;
        Ok(self.storage.get_board_users(board_id)?)
    }

    /// Grants `role` (default `reader`) on a board; re-granting overwrites.
    ///
    /// # Errors
    /// - `Validation(MissingField)` when the board or user id is absent.
    /// - `Validation(InvalidRole)` for unknown role tokens; nothing is written.
    /// - `NotFound` when the board is missing or deleted.
    /// - `Validation(LastOwner)` when this would demote the board's only owner.
    pub fn add_user_to_board(
        &self,
        board_id: Option<BoardId>,
        user_id: Option<UserId>,
        role: Option<&str>,
    ) -> UseCaseResult<BoardUser> {
        let board_id = board_id.ok_or(ValidationError::MissingField("board_id"))?;
        let user_id = user_id.ok_or(ValidationError::MissingField("user_id"))?;
        let role = match role {
            Some(token) => {
                Role::parse(token).ok_or_else(|| ValidationError::InvalidRole(token.to_string()))?
            }
            None => DEFAULT_ROLE,
        };

        self.storage.get_board(board_id)?;
        Ok(self.storage.save_board_user(board_id, user_id, role)?)
    }

    /// Revokes a user's role on a board.
    ///
    /// Removing the only remaining owner is rejected with
    /// `Validation(LastOwner)`.
    pub fn remove_user_from_board(
        &self,
        board_id: BoardId,
        user_id: UserId,
    ) -> UseCaseResult<BoardUser> {
        Ok(self.storage.delete_board_user(board_id, user_id)?)
    }

    /// Soft-deletes a board, dropping its notes and memberships.
    pub fn delete_board(&self, board_id: BoardId) -> UseCaseResult<Board> {
        let board = self.storage.delete_board(board_id)?;
        info!("event=board_delete module=usecase status=ok board_id={board_id}");
        Ok(board)
    }
}
