//! Durable storage backend on SQLite.
//!
//! # Responsibility
//! - Translate entities to/from rows in `users`, `notes`, `boards`, and
//!   `board_users`.
//! - Keep SQL details inside the storage boundary.
//!
//! # Invariants
//! - The connection is migrated before the first query (`db::open_db`).
//! - Ids come from `INTEGER PRIMARY KEY`, which assigns `max(id) + 1`.
//! - Multi-row writes run inside one `IMMEDIATE` transaction.
//! - Read paths reject invalid persisted values instead of masking them.

use crate::credential::{Argon2Hasher, PasswordHasher};
use crate::db::migrations::{latest_version, schema_version};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::note::{
    Board, BoardId, BoardMember, BoardUser, EntityStatus, Note, NoteId, Role, UserBoard,
};
use crate::model::user::{User, UserId, UserStatus};
use crate::storage::{now_epoch_ms, EntityKind, Storage, StorageError, StorageResult};
use log::debug;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const USER_COLUMNS: &str = "id, email, name, is_active, is_admin, status, last_login, created_at, modified_at";
const NOTE_COLUMNS: &str = "id, title, body, board_id, created_by, status, created_at, modified_at";
const BOARD_COLUMNS: &str = "id, name, status, created_at, modified_at";

/// SQLite-backed `Storage` implementation.
///
/// The connection sits behind a mutex so one instance can be shared across
/// threads; SQLite itself serializes writers on the file.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    hasher: Box<dyn PasswordHasher>,
}

impl SqliteStorage {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::from_connection(open_db(path)?)
    }

    /// Opens (and migrates) a private in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> StorageResult<Self> {
        let found = schema_version(&conn)?;
        let expected = latest_version();
        if found != expected {
            return Err(DbError::SchemaMismatch { expected, found }.into());
        }
        Ok(Self {
            conn: Mutex::new(conn),
            hasher: Box::new(Argon2Hasher),
        })
    }

    /// Replaces the password hasher.
    pub fn with_hasher(mut self, hasher: Box<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for SqliteStorage {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn create_user(&self, user: &User, raw_password: &str) -> StorageResult<User> {
        let password_hash = self.hasher.hash(raw_password)?;
        let now = now_epoch_ms();
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_unique_email(&tx, &user.email, user.id)?;

        tx.execute(
            "INSERT INTO users (
                id,
                email,
                name,
                password_hash,
                is_active,
                is_admin,
                status,
                last_login,
                created_at,
                modified_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                user.id,
                user.email.as_str(),
                user.name.as_str(),
                password_hash,
                bool_to_int(user.is_active),
                bool_to_int(user.is_admin),
                user.status.as_str(),
                user.last_login,
                user.created_at.unwrap_or(now),
                now,
            ],
        )
        .map_err(translate_constraint)?;
        let id = tx.last_insert_rowid();
        let stored = load_user(&tx, id)?;
        tx.commit()?;

        debug!("event=user_create module=storage backend=sqlite status=ok user_id={id}");
        Ok(stored)
    }

    fn save_user(&self, user: &User) -> StorageResult<User> {
        let Some(id) = user.id else {
            return Err(StorageError::ConstraintViolation(
                "save_user requires a persisted user id".to_string(),
            ));
        };
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_unique_email(&tx, &user.email, Some(id))?;

        let changed = tx
            .execute(
                "UPDATE users
                 SET
                    email = ?2,
                    name = ?3,
                    is_active = ?4,
                    is_admin = ?5,
                    status = ?6,
                    last_login = ?7,
                    created_at = COALESCE(?8, created_at),
                    modified_at = ?9
                 WHERE id = ?1;",
                params![
                    id,
                    user.email.as_str(),
                    user.name.as_str(),
                    bool_to_int(user.is_active),
                    bool_to_int(user.is_admin),
                    user.status.as_str(),
                    user.last_login,
                    user.created_at,
                    now_epoch_ms(),
                ],
            )
            .map_err(translate_constraint)?;
        if changed == 0 {
            return Err(StorageError::not_found(EntityKind::User, id));
        }
        let stored = load_user(&tx, id)?;
        tx.commit()?;
        Ok(stored)
    }

    fn get_user(&self, id: UserId) -> StorageResult<User> {
        load_user(&self.conn(), id)
    }

    fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1;"
        ))?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn verify_password(&self, user_id: UserId, raw_password: &str) -> StorageResult<bool> {
        let stored_hash: Option<String> = self
            .conn()
            .query_row(
                "SELECT password_hash FROM users WHERE id = ?1;",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;
        match stored_hash {
            Some(hash) => Ok(self.hasher.verify(raw_password, &hash)),
            None => Err(StorageError::not_found(EntityKind::User, user_id)),
        }
    }

    fn save_note(&self, note: &Note) -> StorageResult<Note> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO notes (
                id,
                title,
                body,
                board_id,
                created_by,
                status,
                created_at,
                modified_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, ?8), ?8)
            ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                board_id = excluded.board_id,
                created_by = excluded.created_by,
                status = excluded.status,
                created_at = COALESCE(?7, notes.created_at),
                modified_at = excluded.modified_at;",
            params![
                note.id,
                note.title.as_str(),
                note.body.as_str(),
                note.board_id,
                note.created_by,
                note.status.as_str(),
                note.created_at,
                now_epoch_ms(),
            ],
        )
        .map_err(translate_constraint)?;
        let id = note.id.unwrap_or_else(|| conn.last_insert_rowid());
        debug!("event=note_save module=storage backend=sqlite status=ok note_id={id}");
        load_note(&conn, id)
    }

    fn get_note(&self, id: NoteId) -> StorageResult<Note> {
        load_note(&self.conn(), id)
    }

    fn delete_note(&self, id: NoteId) -> StorageResult<()> {
        let changed = self.conn().execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(StorageError::not_found(EntityKind::Note, id));
        }
        Ok(())
    }

    fn save_board(&self, board: &Board) -> StorageResult<Board> {
        let conn = self.conn();
        let id = upsert_board(&conn, board)?;
        load_board(&conn, id, true)
    }

    fn save_board_with_owner(&self, board: &Board, owner_id: UserId) -> StorageResult<Board> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = upsert_board(&tx, board)?;
        upsert_board_user(&tx, id, owner_id, Role::Owner)?;
        let stored = load_board(&tx, id, true)?;
        tx.commit()?;

        debug!(
            "event=board_create module=storage backend=sqlite status=ok board_id={id} owner_id={owner_id}"
        );
        Ok(stored)
    }

    fn get_board(&self, id: BoardId) -> StorageResult<Board> {
        load_board(&self.conn(), id, false)
    }

    fn get_board_notes(&self, board_id: BoardId) -> StorageResult<Vec<Note>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE board_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([board_id])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn delete_board(&self, id: BoardId) -> StorageResult<Board> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE boards
             SET status = 'deleted',
                 modified_at = ?2
             WHERE id = ?1
               AND status = 'active';",
            params![id, now_epoch_ms()],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found(EntityKind::Board, id));
        }

        let removed_notes = tx.execute("DELETE FROM notes WHERE board_id = ?1;", [id])?;
        let removed_members = tx.execute("DELETE FROM board_users WHERE board_id = ?1;", [id])?;
        let deleted = load_board(&tx, id, true)?;
        tx.commit()?;

        debug!(
            "event=board_delete module=storage backend=sqlite status=ok board_id={id} notes={removed_notes} members={removed_members}"
        );
        Ok(deleted)
    }

    fn save_board_user(
        &self,
        board_id: BoardId,
        user_id: UserId,
        role: Role,
    ) -> StorageResult<BoardUser> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if role != Role::Owner {
            ensure_other_owner(&tx, board_id, user_id)?;
        }
        let record = upsert_board_user(&tx, board_id, user_id, role)?;
        tx.commit()?;
        Ok(record)
    }

    fn get_role(&self, user_id: UserId, board_id: BoardId) -> StorageResult<Option<Role>> {
        let value: Option<String> = self
            .conn()
            .query_row(
                "SELECT role FROM board_users WHERE user_id = ?1 AND board_id = ?2;",
                params![user_id, board_id],
                |row| row.get(0),
            )
            .optional()?;
        value.map(|text| parse_role(&text)).transpose()
    }

    fn get_board_users(&self, board_id: BoardId) -> StorageResult<Vec<BoardMember>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT
                u.id AS id,
                u.email AS email,
                u.name AS name,
                u.is_active AS is_active,
                u.is_admin AS is_admin,
                u.status AS status,
                u.last_login AS last_login,
                u.created_at AS created_at,
                u.modified_at AS modified_at,
                bu.role AS role
             FROM board_users bu
             INNER JOIN users u ON u.id = bu.user_id
             WHERE bu.board_id = ?1
             ORDER BY u.id ASC;",
        )?;
        let mut rows = stmt.query([board_id])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            let role_text: String = row.get("role")?;
            members.push(BoardMember {
                user: parse_user_row(row)?,
                role: parse_role(&role_text)?,
            });
        }
        Ok(members)
    }

    fn get_user_boards(&self, user_id: UserId) -> StorageResult<Vec<UserBoard>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT
                b.id AS id,
                b.name AS name,
                b.status AS status,
                b.created_at AS created_at,
                b.modified_at AS modified_at,
                bu.role AS role
             FROM board_users bu
             INNER JOIN boards b ON b.id = bu.board_id
             WHERE bu.user_id = ?1
               AND b.status = 'active'
             ORDER BY b.id ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut boards = Vec::new();
        while let Some(row) = rows.next()? {
            let role_text: String = row.get("role")?;
            boards.push(UserBoard {
                board: parse_board_row(row)?,
                role: parse_role(&role_text)?,
            });
        }
        Ok(boards)
    }

    fn delete_board_user(&self, board_id: BoardId, user_id: UserId) -> StorageResult<BoardUser> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let role: Option<String> = tx
            .query_row(
                "SELECT role FROM board_users WHERE board_id = ?1 AND user_id = ?2;",
                params![board_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(role_text) = role else {
            return Err(StorageError::BoardUserNotFound { board_id, user_id });
        };
        let role = parse_role(&role_text)?;
        if role == Role::Owner {
            ensure_other_owner(&tx, board_id, user_id)?;
        }
        tx.execute(
            "DELETE FROM board_users WHERE board_id = ?1 AND user_id = ?2;",
            params![board_id, user_id],
        )?;
        tx.commit()?;

        Ok(BoardUser {
            board_id,
            user_id,
            role,
        })
    }
}

fn ensure_unique_email(conn: &Connection, email: &str, owner: Option<UserId>) -> StorageResult<()> {
    let taken: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM users
            WHERE email = ?1
              AND (?2 IS NULL OR id <> ?2)
        );",
        params![email, owner],
        |row| row.get(0),
    )?;
    if taken == 1 {
        return Err(StorageError::DuplicateEmail(email.to_string()));
    }
    Ok(())
}

fn upsert_board(conn: &Connection, board: &Board) -> StorageResult<BoardId> {
    conn.execute(
        "INSERT INTO boards (
            id,
            name,
            status,
            created_at,
            modified_at
        ) VALUES (?1, ?2, ?3, COALESCE(?4, ?5), ?5)
        ON CONFLICT (id) DO UPDATE SET
            name = excluded.name,
            status = excluded.status,
            created_at = COALESCE(?4, boards.created_at),
            modified_at = excluded.modified_at;",
        params![
            board.id,
            board.name.as_str(),
            board.status.as_str(),
            board.created_at,
            now_epoch_ms(),
        ],
    )?;
    Ok(board.id.unwrap_or_else(|| conn.last_insert_rowid()))
}

fn upsert_board_user(
    conn: &Connection,
    board_id: BoardId,
    user_id: UserId,
    role: Role,
) -> StorageResult<BoardUser> {
    conn.execute(
        "INSERT INTO board_users (board_id, user_id, role)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (board_id, user_id) DO UPDATE SET role = excluded.role;",
        params![board_id, user_id, role.as_str()],
    )
    .map_err(translate_constraint)?;
    Ok(BoardUser {
        board_id,
        user_id,
        role,
    })
}

/// Fails with `LastOwner` when `user_id` is the board's only owner.
fn ensure_other_owner(conn: &Connection, board_id: BoardId, user_id: UserId) -> StorageResult<()> {
    let (is_owner, other_owners): (i64, i64) = conn.query_row(
        "SELECT
            COALESCE(SUM(user_id = ?2), 0),
            COALESCE(SUM(user_id <> ?2), 0)
         FROM board_users
         WHERE board_id = ?1 AND role = 'owner';",
        params![board_id, user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    if is_owner > 0 && other_owners == 0 {
        return Err(StorageError::LastOwner { board_id, user_id });
    }
    Ok(())
}

fn load_user(conn: &Connection, id: UserId) -> StorageResult<User> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return parse_user_row(row);
    }
    Err(StorageError::not_found(EntityKind::User, id))
}

fn load_note(conn: &Connection, id: NoteId) -> StorageResult<Note> {
    let mut stmt = conn.prepare(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return parse_note_row(row);
    }
    Err(StorageError::not_found(EntityKind::Note, id))
}

fn load_board(conn: &Connection, id: BoardId, include_deleted: bool) -> StorageResult<Board> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOARD_COLUMNS}
         FROM boards
         WHERE id = ?1
           AND (?2 = 1 OR status = 'active');"
    ))?;
    let mut rows = stmt.query(params![id, bool_to_int(include_deleted)])?;
    if let Some(row) = rows.next()? {
        return parse_board_row(row);
    }
    Err(StorageError::not_found(EntityKind::Board, id))
}

fn parse_user_row(row: &Row<'_>) -> StorageResult<User> {
    let status_text: String = row.get("status")?;
    let status = UserStatus::parse(&status_text).ok_or_else(|| {
        StorageError::InvalidData(format!("invalid user status `{status_text}` in users.status"))
    })?;

    Ok(User {
        id: Some(row.get("id")?),
        email: row.get("email")?,
        name: row.get("name")?,
        is_active: int_to_bool(row.get("is_active")?, "users.is_active")?,
        is_admin: int_to_bool(row.get("is_admin")?, "users.is_admin")?,
        status,
        last_login: row.get("last_login")?,
        created_at: Some(row.get("created_at")?),
        modified_at: Some(row.get("modified_at")?),
    })
}

fn parse_note_row(row: &Row<'_>) -> StorageResult<Note> {
    Ok(Note {
        id: Some(row.get("id")?),
        title: row.get("title")?,
        body: row.get("body")?,
        board_id: row.get("board_id")?,
        created_by: row.get("created_by")?,
        status: parse_entity_status(row.get::<_, String>("status")?, "notes.status")?,
        created_at: Some(row.get("created_at")?),
        modified_at: Some(row.get("modified_at")?),
    })
}

fn parse_board_row(row: &Row<'_>) -> StorageResult<Board> {
    Ok(Board {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        status: parse_entity_status(row.get::<_, String>("status")?, "boards.status")?,
        created_at: Some(row.get("created_at")?),
        modified_at: Some(row.get("modified_at")?),
    })
}

fn parse_entity_status(value: String, column: &'static str) -> StorageResult<EntityStatus> {
    EntityStatus::parse(&value)
        .ok_or_else(|| StorageError::InvalidData(format!("invalid status `{value}` in {column}")))
}

fn parse_role(value: &str) -> StorageResult<Role> {
    Role::parse(value).ok_or_else(|| {
        StorageError::InvalidData(format!("invalid role `{value}` in board_users.role"))
    })
}

fn translate_constraint(err: rusqlite::Error) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(
                message.unwrap_or_else(|| "constraint failed".to_string()),
            )
        }
        other => other.into(),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64, column: &'static str) -> StorageResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StorageError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
