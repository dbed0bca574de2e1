//! Note and board actions.
//!
//! Each method takes the caller's resolved `PermissionSet` for the board the
//! call touches and forwards to `NoteUseCases` through [`Action::run`].

use crate::action::{Action, ActionResult};
use crate::audit::AuditSink;
use crate::model::entity::Fields;
use crate::model::note::{Board, BoardId, BoardUser, Note, NoteId, DEFAULT_ROLE};
use crate::model::user::UserId;
use crate::permission::{Permission, PermissionSet};
use crate::storage::Storage;
use crate::usecase::NoteUseCases;
use std::sync::Arc;

/// Permission-checked, audited entry points for notes and boards.
pub struct NoteActions<S: Storage + ?Sized> {
    use_cases: NoteUseCases<S>,
    audit: Arc<dyn AuditSink>,
}

impl<S: Storage + ?Sized> Clone for NoteActions<S> {
    fn clone(&self) -> Self {
        Self {
            use_cases: self.use_cases.clone(),
            audit: Arc::clone(&self.audit),
        }
    }
}

impl<S: Storage + ?Sized> NoteActions<S> {
    pub fn new(use_cases: NoteUseCases<S>, audit: Arc<dyn AuditSink>) -> Self {
        Self { use_cases, audit }
    }

    /// Underlying use cases, for reads that need no permission.
    pub fn use_cases(&self) -> &NoteUseCases<S> {
        &self.use_cases
    }

    /// Creates a board owned by `user_id`. Any authenticated user may do this.
    pub fn create_board(&self, name: &str, user_id: Option<UserId>) -> ActionResult<Board> {
        Action::new("board.create")
            .arg("name", name)
            .arg_opt("user_id", user_id)
            .run(self.audit.as_ref(), || {
                self.use_cases.create_board(name, user_id)
            })
    }

    /// Creates a note outside any board.
    pub fn create_private_note(&self, fields: Fields, user_id: Option<UserId>) -> ActionResult<Note> {
        Action::new("note.create_private")
            .arg_opt("user_id", user_id)
            .run(self.audit.as_ref(), || {
                self.use_cases.create_note(fields, user_id, None)
            })
    }

    /// Creates a note on `board_id`; requires `add_note` on that board.
    pub fn create_note(
        &self,
        granted: &PermissionSet,
        fields: Fields,
        user_id: Option<UserId>,
        board_id: BoardId,
    ) -> ActionResult<Note> {
        Action::new("note.create")
            .require(Permission::AddNote, granted)
            .arg_opt("user_id", user_id)
            .arg("board_id", board_id)
            .run(self.audit.as_ref(), || {
                self.use_cases.create_note(fields, user_id, Some(board_id))
            })
    }

    pub fn edit_note(
        &self,
        granted: &PermissionSet,
        note_id: NoteId,
        title: Option<&str>,
        body: Option<&str>,
    ) -> ActionResult<Note> {
        Action::new("note.edit")
            .require(Permission::EditNote, granted)
            .arg("note_id", note_id)
            .arg("title_changed", title.is_some())
            .arg("body_changed", body.is_some())
            .run(self.audit.as_ref(), || {
                self.use_cases.edit_note(note_id, title, body)
            })
    }

    pub fn delete_note(&self, granted: &PermissionSet, note_id: NoteId) -> ActionResult<()> {
        Action::new("note.delete")
            .require(Permission::DeleteNote, granted)
            .arg("note_id", note_id)
            .run(self.audit.as_ref(), || self.use_cases.delete_note(note_id))
    }

    /// Moves a note between boards.
    ///
    /// `source` is checked for `edit_note`; `target`, when moving onto a
    /// board, is checked for `add_note`.
    pub fn move_note(
        &self,
        source: &PermissionSet,
        target: Option<&PermissionSet>,
        note_id: NoteId,
        board_id: Option<BoardId>,
    ) -> ActionResult<Note> {
        let unresolved = PermissionSet::empty();
        let mut action = Action::new("note.move").require(Permission::EditNote, source);
        if board_id.is_some() {
            action = action.require(Permission::AddNote, target.unwrap_or(&unresolved));
        }
        action
            .arg("note_id", note_id)
            .arg_opt("board_id", board_id)
            .run(self.audit.as_ref(), || {
                self.use_cases.move_note(note_id, board_id)
            })
    }

    pub fn get_board_notes(
        &self,
        granted: &PermissionSet,
        board_id: BoardId,
    ) -> ActionResult<Vec<Note>> {
        Action::new("board.notes")
            .require(Permission::ViewNotes, granted)
            .arg("board_id", board_id)
            .run(self.audit.as_ref(), || {
                self.use_cases.get_board_notes(board_id)
            })
    }

    /// Grants a role on a board; requires `add_user`.
    pub fn add_user_to_board(
        &self,
        granted: &PermissionSet,
        board_id: BoardId,
        user_id: Option<UserId>,
        role: Option<&str>,
    ) -> ActionResult<BoardUser> {
        Action::new("board.add_user")
            .require(Permission::AddUser, granted)
            .arg_opt("user_id", user_id)
            .arg("board_id", board_id)
            .arg("role", role.unwrap_or(DEFAULT_ROLE.as_str()))
            .run(self.audit.as_ref(), || {
                self.use_cases
                    .add_user_to_board(Some(board_id), user_id, role)
            })
    }

    pub fn remove_user_from_board(
        &self,
        granted: &PermissionSet,
        board_id: BoardId,
        user_id: UserId,
    ) -> ActionResult<BoardUser> {
        Action::new("board.remove_user")
            .require(Permission::RemoveUser, granted)
            .arg("user_id", user_id)
            .arg("board_id", board_id)
            .run(self.audit.as_ref(), || {
                self.use_cases.remove_user_from_board(board_id, user_id)
            })
    }

    pub fn rename_board(
        &self,
        granted: &PermissionSet,
        board_id: BoardId,
        name: &str,
    ) -> ActionResult<Board> {
        Action::new("board.rename")
            .require(Permission::EditName, granted)
            .arg("board_id", board_id)
            .arg("name", name)
            .run(self.audit.as_ref(), || {
                self.use_cases.rename_board(board_id, name)
            })
    }

    pub fn delete_board(&self, granted: &PermissionSet, board_id: BoardId) -> ActionResult<Board> {
        Action::new("board.delete")
            .require(Permission::Delete, granted)
            .arg("board_id", board_id)
            .run(self.audit.as_ref(), || self.use_cases.delete_board(board_id))
    }
}
