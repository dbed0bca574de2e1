//! Account use cases: sign-up, authentication, and profile lifecycle.
//!
//! # Invariants
//! - `name` and `email` are required to create an account.
//! - Raw passwords are handed to storage once and never logged.
//! - Deactivated accounts cannot authenticate.

use crate::model::entity::{Entity, Fields};
use crate::model::user::{User, UserId, UserStatus};
use crate::storage::{now_epoch_ms, Storage};
use crate::usecase::{require_text, UseCaseResult, ValidationError};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Use cases for user accounts.
pub struct AccountUseCases<S: Storage + ?Sized> {
    storage: Arc<S>,
}

impl<S: Storage + ?Sized> Clone for AccountUseCases<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage + ?Sized> AccountUseCases<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Creates a new account from user fields and a raw password.
    ///
    /// # Errors
    /// - `Validation(MissingField)` when `name`, `email`, or the password is absent.
    /// - `Validation(InvalidField)` when an unknown field is supplied.
    /// - `Validation(InvalidEmail | DuplicateEmail)` for unusable addresses.
    pub fn create_account(&self, fields: Fields, password: &str) -> UseCaseResult<User> {
        let user = User::from_fields(fields)?;
        let name = require_text(&user.name, "name")?;
        let email = validate_email(&user.email)?;
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        let user = User {
            id: None,
            email,
            name,
            ..user
        };
        let created = self.storage.create_user(&user, password)?;
        info!(
            "event=account_create module=usecase status=ok user_id={:?}",
            created.id
        );
        Ok(created)
    }

    /// Checks credentials and records the login time.
    pub fn authenticate(&self, email: &str, password: &str) -> UseCaseResult<User> {
        let Some(user) = self.storage.find_user_by_email(email.trim())? else {
            warn!("event=account_login module=usecase status=error reason=unknown_email");
            return Err(ValidationError::InvalidCredentials.into());
        };
        let Some(user_id) = user.id else {
            return Err(ValidationError::InvalidCredentials.into());
        };

        if !self.storage.verify_password(user_id, password)? {
            warn!("event=account_login module=usecase status=error user_id={user_id} reason=bad_password");
            return Err(ValidationError::InvalidCredentials.into());
        }
        if !user.is_active || user.status != UserStatus::Active {
            warn!("event=account_login module=usecase status=error user_id={user_id} reason=inactive");
            return Err(ValidationError::InvalidCredentials.into());
        }

        let logged_in = User {
            last_login: Some(now_epoch_ms()),
            ..user
        };
        Ok(self.storage.save_user(&logged_in)?)
    }

    pub fn get_user(&self, user_id: UserId) -> UseCaseResult<User> {
        Ok(self.storage.get_user(user_id)?)
    }

    /// Changes email and display name of one user.
    pub fn edit_account(&self, user_id: UserId, email: &str, name: &str) -> UseCaseResult<User> {
        let email = validate_email(email)?;
        let name = require_text(name, "name")?;
        let user = self.storage.get_user(user_id)?;
        let edited = User { email, name, ..user };
        Ok(self.storage.save_user(&edited)?)
    }

    /// Deactivates an account; the record is kept.
    pub fn deactivate(&self, user_id: UserId) -> UseCaseResult<User> {
        let user = self.storage.get_user(user_id)?;
        let deactivated = User {
            is_active: false,
            status: UserStatus::Deactivated,
            ..user
        };
        Ok(self.storage.save_user(&deactivated)?)
    }
}

fn validate_email(value: &str) -> Result<String, ValidationError> {
    let email = require_text(value, "email")?;
    if !EMAIL_RE.is_match(&email) {
        return Err(ValidationError::InvalidEmail(email));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::validate_email;
    use crate::usecase::ValidationError;

    #[test]
    fn email_validation_trims_and_checks_shape() {
        assert_eq!(validate_email(" bob@x.com ").unwrap(), "bob@x.com");
        assert!(matches!(
            validate_email("bob").unwrap_err(),
            ValidationError::InvalidEmail(_)
        ));
        assert_eq!(
            validate_email("  ").unwrap_err(),
            ValidationError::BlankField("email")
        );
    }
}
