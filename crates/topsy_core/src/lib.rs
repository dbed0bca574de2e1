//! Core domain logic for Topsy.
//! Entities, storage backends, permissions, use cases, and audited actions
//! live here; hosts only wire transports on top.

pub mod action;
pub mod app;
pub mod audit;
pub mod config;
pub mod credential;
pub mod db;
pub mod logging;
pub mod model;
pub mod permission;
pub mod storage;
pub mod usecase;

pub use action::{AccountActions, Action, ActionError, ActionResult, NoteActions};
pub use app::Topsy;
pub use audit::{AuditError, AuditLevel, AuditSink, LogAuditSink, MemoryAuditSink};
pub use config::{ConfigError, CoreConfig, StorageConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{into_fields, Entity, Fields, InvalidFieldError};
pub use model::note::{
    Board, BoardId, BoardMember, BoardUser, EntityStatus, Note, NoteId, Role, UserBoard,
    DEFAULT_ROLE,
};
pub use model::user::{User, UserId, UserStatus};
pub use permission::{Permission, PermissionChecker, PermissionError, PermissionSet};
pub use storage::{
    EntityKind, MemoryStorage, SqliteStorage, Storage, StorageError, StorageResult,
};
pub use usecase::{AccountUseCases, NoteUseCases, UseCaseError, UseCaseResult, ValidationError};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
