//! Account actions. Audit entries never carry passwords.

use crate::action::{Action, ActionResult};
use crate::audit::AuditSink;
use crate::model::entity::Fields;
use crate::model::user::{User, UserId};
use crate::storage::Storage;
use crate::usecase::AccountUseCases;
use std::sync::Arc;

/// Audited entry points for user accounts.
pub struct AccountActions<S: Storage + ?Sized> {
    use_cases: AccountUseCases<S>,
    audit: Arc<dyn AuditSink>,
}

impl<S: Storage + ?Sized> Clone for AccountActions<S> {
    fn clone(&self) -> Self {
        Self {
            use_cases: self.use_cases.clone(),
            audit: Arc::clone(&self.audit),
        }
    }
}

impl<S: Storage + ?Sized> AccountActions<S> {
    pub fn new(use_cases: AccountUseCases<S>, audit: Arc<dyn AuditSink>) -> Self {
        Self { use_cases, audit }
    }

    pub fn use_cases(&self) -> &AccountUseCases<S> {
        &self.use_cases
    }

    pub fn create_account(&self, fields: Fields, password: &str) -> ActionResult<User> {
        let email = fields
            .get("email")
            .and_then(|value| value.as_str())
            .unwrap_or("none")
            .to_string();
        Action::new("account.create")
            .arg("email", email)
            .run(self.audit.as_ref(), || {
                self.use_cases.create_account(fields, password)
            })
    }

    pub fn authenticate(&self, email: &str, password: &str) -> ActionResult<User> {
        Action::new("account.authenticate")
            .arg("email", email)
            .run(self.audit.as_ref(), || {
                self.use_cases.authenticate(email, password)
            })
    }

    pub fn edit_account(&self, user_id: UserId, email: &str, name: &str) -> ActionResult<User> {
        Action::new("account.edit")
            .arg("user_id", user_id)
            .arg("email", email)
            .arg("name", name)
            .run(self.audit.as_ref(), || {
                self.use_cases.edit_account(user_id, email, name)
            })
    }

    pub fn deactivate(&self, user_id: UserId) -> ActionResult<User> {
        Action::new("account.deactivate")
            .arg("user_id", user_id)
            .run(self.audit.as_ref(), || self.use_cases.deactivate(user_id))
    }
}
