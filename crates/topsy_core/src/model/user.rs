//! Account identity record.
//!
//! # Invariants
//! - `id` is assigned by storage on first persist and never reassigned.
//! - `email` is unique across users (enforced by storage).

use crate::model::entity::Entity;
use serde::{Deserialize, Serialize};

/// Storage-assigned user identifier.
pub type UserId = i64;

/// Account lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Deactivated,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deactivated => "deactivated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "deactivated" => Some(Self::Deactivated),
            _ => None,
        }
    }
}

/// A person who signed up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    #[serde(default)]
    pub id: Option<UserId>,
    pub email: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub status: UserStatus,
    /// Epoch milliseconds of the last successful authentication.
    #[serde(default)]
    pub last_login: Option<i64>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub modified_at: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl User {
    /// Creates an active, non-admin user that has not been persisted yet.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            name: name.into(),
            is_active: true,
            is_admin: false,
            status: UserStatus::Active,
            last_login: None,
            created_at: None,
            modified_at: None,
        }
    }
}

impl Entity for User {
    const KIND: &'static str = "user";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "email",
        "name",
        "is_active",
        "is_admin",
        "status",
        "last_login",
        "created_at",
        "modified_at",
    ];
    const REQUIRED: &'static [&'static str] = &["email", "name"];
}
