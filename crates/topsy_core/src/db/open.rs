//! Connection opening.
//!
//! # Invariants
//! - Returned connections enforce foreign keys.
//! - Returned connections are at the latest schema version.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating if needed) and migrates the database file at `path`.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let started = Instant::now();
    let result = Connection::open(path.as_ref())
        .map_err(Into::into)
        .and_then(prepare);
    log_open("file", started, &result);
    result
}

/// Opens a private, migrated in-memory database.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started = Instant::now();
    let result = Connection::open_in_memory()
        .map_err(Into::into)
        .and_then(prepare);
    log_open("memory", started, &result);
    result
}

fn prepare(mut conn: Connection) -> DbResult<Connection> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn log_open(mode: &str, started: Instant, result: &DbResult<Connection>) {
    let elapsed_ms = started.elapsed().as_millis();
    match result {
        Ok(_) => info!("event=db_open module=db status=ok mode={mode} duration_ms={elapsed_ms}"),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={elapsed_ms} error={err}"
        ),
    }
}
