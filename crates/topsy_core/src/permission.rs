//! Board permission tokens and role resolution.
//!
//! # Responsibility
//! - Define the fixed role → permission table.
//! - Resolve one user's effective permissions on one board via storage.
//!
//! # Invariants
//! - Permission sets are nested: reader ⊂ editor ⊂ owner.
//! - A user without a membership record has no permissions at all.

use crate::model::note::{BoardId, Role};
use crate::model::user::UserId;
use crate::storage::{Storage, StorageResult};
use log::debug;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Named capability granted by a board role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    ViewNotes,
    AddNote,
    DeleteNote,
    EditNote,
    AddUser,
    RemoveUser,
    EditName,
    Delete,
}

impl Permission {
    /// Stable token used in audit entries and at the transport edge.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewNotes => "view_notes",
            Self::AddNote => "add_note",
            Self::DeleteNote => "delete_note",
            Self::EditNote => "edit_note",
            Self::AddUser => "add_user",
            Self::RemoveUser => "remove_user",
            Self::EditName => "edit_name",
            Self::Delete => "delete",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses one permission token.
pub fn parse_permission(value: &str) -> Option<Permission> {
    match value {
        "view_notes" => Some(Permission::ViewNotes),
        "add_note" => Some(Permission::AddNote),
        "delete_note" => Some(Permission::DeleteNote),
        "edit_note" => Some(Permission::EditNote),
        "add_user" => Some(Permission::AddUser),
        "remove_user" => Some(Permission::RemoveUser),
        "edit_name" => Some(Permission::EditName),
        "delete" => Some(Permission::Delete),
        _ => None,
    }
}

const READER_PERMISSIONS: &[Permission] = &[Permission::ViewNotes];

const EDITOR_PERMISSIONS: &[Permission] = &[
    Permission::ViewNotes,
    Permission::AddNote,
    Permission::DeleteNote,
    Permission::EditNote,
];

const OWNER_PERMISSIONS: &[Permission] = &[
    Permission::ViewNotes,
    Permission::AddNote,
    Permission::DeleteNote,
    Permission::EditNote,
    Permission::AddUser,
    Permission::RemoveUser,
    Permission::EditName,
    Permission::Delete,
];

impl Role {
    /// Fixed permission table for board roles.
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Reader => READER_PERMISSIONS,
            Self::Editor => EDITOR_PERMISSIONS,
            Self::Owner => OWNER_PERMISSIONS,
        }
    }
}

/// Resolved permissions of one caller on one board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_role(role: Role) -> Self {
        role.permissions().iter().copied().collect()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn is_superset(&self, other: &PermissionSet) -> bool {
        self.0.is_superset(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Raised when a caller lacks the permission an action requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionError {
    pub permission: Permission,
}

impl Display for PermissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "user lacks permission: {}", self.permission)
    }
}

impl Error for PermissionError {}

/// Looks up a user's role on a board and expands it into permissions.
pub struct PermissionChecker<S: Storage + ?Sized> {
    storage: Arc<S>,
}

impl<S: Storage + ?Sized> Clone for PermissionChecker<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage + ?Sized> PermissionChecker<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Returns every permission the user holds on the board.
    pub fn check(&self, user_id: UserId, board_id: BoardId) -> StorageResult<PermissionSet> {
        let role = self.storage.get_role(user_id, board_id)?;
        debug!(
            "event=permission_check module=permission user_id={user_id} board_id={board_id} role={}",
            role.map_or("none", Role::as_str)
        );
        Ok(role.map_or_else(PermissionSet::empty, PermissionSet::for_role))
    }

    /// Returns whether the user holds `permission` on the board.
    pub fn has_permission(
        &self,
        user_id: UserId,
        board_id: BoardId,
        permission: Permission,
    ) -> StorageResult<bool> {
        Ok(self.check(user_id, board_id)?.contains(permission))
    }
}
