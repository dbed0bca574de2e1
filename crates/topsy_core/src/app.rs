//! Composition root.
//!
//! # Responsibility
//! - Build one storage backend, then the checker and actions that share it.
//!
//! # Invariants
//! - Every component of one `Topsy` value sees the same storage instance.
//! - Nothing here is process-global; hosts own and pass the value.

use crate::action::{AccountActions, NoteActions};
use crate::audit::AuditSink;
use crate::config::{CoreConfig, StorageConfig};
use crate::model::note::BoardId;
use crate::model::user::UserId;
use crate::permission::{PermissionChecker, PermissionSet};
use crate::storage::{MemoryStorage, SqliteStorage, Storage, StorageResult};
use crate::usecase::{AccountUseCases, NoteUseCases};
use log::info;
use std::sync::Arc;

/// Wired application services over one storage backend.
pub struct Topsy<S: Storage + ?Sized> {
    storage: Arc<S>,
    permissions: PermissionChecker<S>,
    accounts: AccountActions<S>,
    notes: NoteActions<S>,
}

impl<S: Storage + ?Sized> Topsy<S> {
    pub fn new(storage: Arc<S>, audit: Arc<dyn AuditSink>) -> Self {
        let permissions = PermissionChecker::new(Arc::clone(&storage));
        let accounts = AccountActions::new(
            AccountUseCases::new(Arc::clone(&storage)),
            Arc::clone(&audit),
        );
        let notes = NoteActions::new(NoteUseCases::new(Arc::clone(&storage)), audit);
        Self {
            storage,
            permissions,
            accounts,
            notes,
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn permission_checker(&self) -> &PermissionChecker<S> {
        &self.permissions
    }

    pub fn accounts(&self) -> &AccountActions<S> {
        &self.accounts
    }

    pub fn notes(&self) -> &NoteActions<S> {
        &self.notes
    }

    /// Resolves the permission set to pass into board actions.
    pub fn permissions(&self, user_id: UserId, board_id: BoardId) -> StorageResult<PermissionSet> {
        self.permissions.check(user_id, board_id)
    }
}

impl Topsy<dyn Storage> {
    /// Opens the backend named by `config`.
    pub fn from_config(config: &CoreConfig, audit: Arc<dyn AuditSink>) -> StorageResult<Self> {
        let storage: Arc<dyn Storage> = match &config.storage {
            StorageConfig::Memory => Arc::new(MemoryStorage::new()),
            StorageConfig::Sqlite { path } => Arc::new(SqliteStorage::open(path)?),
        };
        info!(
            "event=app_boot module=app status=ok backend={}",
            storage.backend_name()
        );
        Ok(Self::new(storage, audit))
    }
}
