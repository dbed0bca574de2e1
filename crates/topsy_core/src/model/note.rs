//! Notes, boards, and board membership records.
//!
//! # Responsibility
//! - Define the content records (`Note`, `Board`) and the `BoardUser` join.
//! - Define the closed set of board roles.
//!
//! # Invariants
//! - `title` and `body` are required when building a `Note` from fields.
//! - At most one `BoardUser` exists per `(board_id, user_id)` pair.
//! - A board is created together with exactly one `owner` join record.

use crate::model::entity::Entity;
use crate::model::user::{User, UserId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type NoteId = i64;
pub type BoardId = i64;

/// Lifecycle marker for notes and boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    #[default]
    Active,
    Deleted,
}

impl EntityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Role of one user on one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Reader,
    Editor,
    Owner,
}

/// Role granted when the caller does not name one.
pub const DEFAULT_ROLE: Role = Role::Reader;

impl Role {
    /// Stable token used in storage and at the transport edge.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Editor => "editor",
            Self::Owner => "owner",
        }
    }

    /// Parses an exact lowercase role token.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reader" => Some(Self::Reader),
            "editor" => Some(Self::Editor),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    pub fn all() -> [Role; 3] {
        [Self::Reader, Self::Editor, Self::Owner]
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where users put the knowledge they need to save and share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Note {
    #[serde(default)]
    pub id: Option<NoteId>,
    pub title: String,
    pub body: String,
    /// Owning board; `None` means the note is unassigned.
    #[serde(default)]
    pub board_id: Option<BoardId>,
    #[serde(default)]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub modified_at: Option<i64>,
}

impl Note {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            body: body.into(),
            board_id: None,
            created_by: None,
            status: EntityStatus::Active,
            created_at: None,
            modified_at: None,
        }
    }
}

impl Entity for Note {
    const KIND: &'static str = "note";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "title",
        "body",
        "board_id",
        "created_by",
        "status",
        "created_at",
        "modified_at",
    ];
    const REQUIRED: &'static [&'static str] = &["title", "body"];
}

/// Container that groups notes and is shared through roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Board {
    #[serde(default)]
    pub id: Option<BoardId>,
    pub name: String,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub modified_at: Option<i64>,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            status: EntityStatus::Active,
            created_at: None,
            modified_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EntityStatus::Active
    }
}

impl Entity for Board {
    const KIND: &'static str = "board";
    const FIELDS: &'static [&'static str] = &["id", "name", "status", "created_at", "modified_at"];
    const REQUIRED: &'static [&'static str] = &["name"];
}

/// Join record granting `role` on `board_id` to `user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardUser {
    pub board_id: BoardId,
    pub user_id: UserId,
    pub role: Role,
}

impl Entity for BoardUser {
    const KIND: &'static str = "board_user";
    const FIELDS: &'static [&'static str] = &["board_id", "user_id", "role"];
    const REQUIRED: &'static [&'static str] = &["board_id", "user_id", "role"];
}

/// Board membership row joined with its user, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardMember {
    pub user: User,
    pub role: Role,
}

/// Board visible to one user together with that user's role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBoard {
    pub board: Board,
    pub role: Role,
}
