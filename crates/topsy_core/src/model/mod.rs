//! Domain model for accounts, notes, and boards.
//!
//! # Responsibility
//! - Define immutable value records used by use cases and storage.
//! - Keep persistence technology out of entity definitions.
//!
//! # Invariants
//! - Entities are never mutated in place; changes produce new values.
//! - Ids are `None` until storage assigns them.

pub mod entity;
pub mod note;
pub mod user;
