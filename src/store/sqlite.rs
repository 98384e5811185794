use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior, ffi, params,
};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs `op` against the connection, retrying when another process holds
    /// the database lock.
    fn with_conn<T>(&self, op: impl Fn(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn();
        let mut attempt = 1;
        loop {
            match op(&mut *conn) {
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::debug!(attempt, "database busy, retrying: {err}");
                    std::thread::sleep(RETRY_BACKOFF * attempt);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width UTC form so that text comparison in SQL orders by time.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_datetime)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
    )
}

trait UniqueViolationExt<T> {
    /// Maps a unique-index violation to the error produced by `f`.
    fn on_unique_violation(self, f: impl FnOnce() -> Error) -> Result<T>;
}

impl<T> UniqueViolationExt<T> for rusqlite::Result<T> {
    fn on_unique_violation(self, f: impl FnOnce() -> Error) -> Result<T> {
        self.map_err(|err| {
            if is_unique_violation(&err) {
                f()
            } else {
                Error::Database(err)
            }
        })
    }
}

fn key_not_found(name: &str) -> Error {
    Error::not_found(format!("Key '{name}' not found"))
}

const USER_COLUMNS: &str = "id, username, deleted, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        deleted: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at";

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: parse_optional_datetime(row.get(6)?),
        last_used_at: parse_optional_datetime(row.get(7)?),
    })
}

const NAMESPACE_COLUMNS: &str = "n.id, n.name, n.description, n.created_by, n.deleted, n.created_at";

fn namespace_from_row(row: &Row<'_>) -> rusqlite::Result<Namespace> {
    Ok(Namespace {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        deleted: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const MEMBERSHIP_COLUMNS: &str = "m.user_id, m.namespace_id, m.role, m.granted_at";

fn membership_from_row(row: &Row<'_>) -> rusqlite::Result<Membership> {
    Ok(Membership {
        user_id: row.get(0)?,
        namespace_id: row.get(1)?,
        role: row.get(2)?,
        granted_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

const KEY_COLUMNS: &str = "id, name, namespace_id, current_revision_id, deleted, created_at";

fn key_from_row(row: &Row<'_>) -> rusqlite::Result<Key> {
    Ok(Key {
        id: row.get(0)?,
        name: row.get(1)?,
        namespace_id: row.get(2)?,
        current_revision_id: row.get(3)?,
        deleted: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const KEY_VIEW_SELECT: &str = "SELECT k.id, k.name, k.namespace_id, r.value, r.revision_number, k.created_at
     FROM keys k LEFT JOIN revisions r ON r.id = k.current_revision_id";

fn key_view_from_row(row: &Row<'_>) -> rusqlite::Result<KeyView> {
    Ok(KeyView {
        id: row.get(0)?,
        name: row.get(1)?,
        namespace_id: row.get(2)?,
        current_value: row.get(3)?,
        current_revision_number: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const REVISION_COLUMNS: &str = "id, key_id, value, revision_number, created_at";

fn revision_from_row(row: &Row<'_>) -> rusqlite::Result<Revision> {
    Ok(Revision {
        id: row.get(0)?,
        key_id: row.get(1)?,
        value: row.get(2)?,
        revision_number: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

const CREDENTIAL_COLUMNS: &str = "id, user_id, namespace_id, secret_hash, secret_preview, role, description, created_at, expires_at, deleted";

fn credential_from_row(row: &Row<'_>) -> rusqlite::Result<ScopedCredential> {
    Ok(ScopedCredential {
        id: row.get(0)?,
        user_id: row.get(1)?,
        namespace_id: row.get(2)?,
        secret_hash: row.get(3)?,
        secret_preview: row.get(4)?,
        role: row.get(5)?,
        description: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        expires_at: parse_optional_datetime(row.get(8)?),
        deleted: row.get(9)?,
    })
}

fn query_namespace(conn: &Connection, id: i64) -> rusqlite::Result<Option<Namespace>> {
    conn.query_row(
        &format!("SELECT {NAMESPACE_COLUMNS} FROM namespaces n WHERE n.id = ?1"),
        params![id],
        namespace_from_row,
    )
    .optional()
}

fn query_active_key(conn: &Connection, namespace_id: i64, name: &str) -> rusqlite::Result<Option<Key>> {
    conn.query_row(
        &format!(
            "SELECT {KEY_COLUMNS} FROM keys WHERE namespace_id = ?1 AND name = ?2 AND deleted = 0"
        ),
        params![namespace_id, name],
        key_from_row,
    )
    .optional()
}

fn query_key_view(
    conn: &Connection,
    namespace_id: i64,
    name: &str,
) -> rusqlite::Result<Option<KeyView>> {
    conn.query_row(
        &format!("{KEY_VIEW_SELECT} WHERE k.namespace_id = ?1 AND k.name = ?2 AND k.deleted = 0"),
        params![namespace_id, name],
        key_view_from_row,
    )
    .optional()
}

/// Inserts a revision row. A duplicate number means another writer got there first.
fn insert_revision(
    conn: &Connection,
    key_id: i64,
    value: &str,
    revision_number: i64,
    now: &DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO revisions (key_id, value, revision_number, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![key_id, value, revision_number, format_datetime(now)],
    )
    .on_unique_violation(|| {
        Error::conflict(format!(
            "Revision {revision_number} was written concurrently; retry the update"
        ))
    })?;
    Ok(conn.last_insert_rowid())
}

fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<usize> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(usize::try_from(n).unwrap_or_default())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, username: &str, now: DateTime<Utc>) -> Result<User> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, deleted, created_at) VALUES (?1, 0, ?2)",
                params![username, format_datetime(&now)],
            )
            .on_unique_violation(|| {
                Error::already_exists(format!("User '{username}' already exists"))
            })?;

            Ok(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                deleted: false,
                created_at: now,
            })
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
        })
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1 AND deleted = 0"),
                params![username],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
        })
    }

    fn list_users(&self, after_id: i64, limit: i32) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE deleted = 0 AND id > ?1 ORDER BY id LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![after_id, limit], user_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })
    }

    fn soft_delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let rows = tx.execute(
                "UPDATE users SET deleted = 1 WHERE id = ?1 AND deleted = 0",
                params![id],
            )?;
            if rows == 0 {
                return Ok(false);
            }

            tx.execute(
                "UPDATE credentials SET deleted = 1 WHERE user_id = ?1 AND deleted = 0",
                params![id],
            )?;
            tx.execute("DELETE FROM tokens WHERE user_id = ?1", params![id])?;

            tx.commit()?;
            Ok(true)
        })
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    token.id,
                    token.token_hash,
                    token.token_lookup,
                    token.is_admin,
                    token.user_id,
                    format_datetime(&token.created_at),
                    token.expires_at.as_ref().map(format_datetime),
                    token.last_used_at.as_ref().map(format_datetime),
                ],
            )
            .on_unique_violation(|| Error::TokenLookupCollision)?;
            Ok(())
        })
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1"),
                params![id],
                token_from_row,
            )
            .optional()
            .map_err(Error::from)
        })
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
                params![lookup],
                token_from_row,
            )
            .optional()
            .map_err(Error::from)
        })
    }

    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM tokens WHERE id > ?1 ORDER BY id LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![cursor, limit], token_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })
    }

    fn list_user_tokens(&self, user_id: i64) -> Result<Vec<Token>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM tokens WHERE user_id = ?1 ORDER BY created_at"
            ))?;
            let rows = stmt.query_map(params![user_id], token_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
            Ok(rows > 0)
        })
    }

    fn update_token_last_used(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
                params![format_datetime(&now), id],
            )?;
            Ok(())
        })
    }

    fn has_admin_token(&self) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(count(conn, "SELECT COUNT(*) FROM tokens WHERE is_admin = 1", [])? > 0)
        })
    }

    // Namespace operations

    fn create_namespace(
        &self,
        name: &str,
        description: Option<&str>,
        creator: i64,
        now: DateTime<Utc>,
    ) -> Result<Namespace> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if count(
                &tx,
                "SELECT COUNT(*) FROM users WHERE id = ?1 AND deleted = 0",
                params![creator],
            )? == 0
            {
                return Err(Error::not_found("User not found"));
            }

            tx.execute(
                "INSERT INTO namespaces (name, description, created_by, deleted, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![name, description, creator, format_datetime(&now)],
            )
            .on_unique_violation(|| {
                Error::already_exists(format!("Namespace '{name}' already exists"))
            })?;
            let id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO memberships (user_id, namespace_id, role, granted_at) VALUES (?1, ?2, ?3, ?4)",
                params![creator, id, Role::Admin, format_datetime(&now)],
            )?;

            tx.commit()?;

            Ok(Namespace {
                id,
                name: name.to_string(),
                description: description.map(str::to_string),
                created_by: Some(creator),
                deleted: false,
                created_at: now,
            })
        })
    }

    fn get_namespace(&self, id: i64) -> Result<Option<Namespace>> {
        self.with_conn(|conn| query_namespace(conn, id).map_err(Error::from))
    }

    fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NAMESPACE_COLUMNS} FROM namespaces n WHERE n.deleted = 0 ORDER BY n.id"
            ))?;
            let rows = stmt.query_map([], namespace_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })
    }

    fn list_member_namespaces(&self, user_id: i64) -> Result<Vec<MemberNamespace>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NAMESPACE_COLUMNS}, m.role, m.granted_at
                 FROM memberships m JOIN namespaces n ON n.id = m.namespace_id
                 WHERE m.user_id = ?1 AND n.deleted = 0
                 ORDER BY n.name, n.id"
            ))?;
            let rows = stmt.query_map(params![user_id], |row| {
                Ok(MemberNamespace {
                    namespace: namespace_from_row(row)?,
                    role: row.get(6)?,
                    granted_at: parse_datetime(&row.get::<_, String>(7)?),
                })
            })?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })
    }

    fn update_namespace(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Namespace> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let rows = tx
                .execute(
                    "UPDATE namespaces SET name = ?1, description = COALESCE(?2, description)
                     WHERE id = ?3 AND deleted = 0",
                    params![name, description, id],
                )
                .on_unique_violation(|| {
                    Error::already_exists(format!("Namespace '{name}' already exists"))
                })?;
            if rows == 0 {
                return Err(Error::not_found("Namespace not found"));
            }

            let namespace =
                query_namespace(&tx, id)?.ok_or_else(|| Error::not_found("Namespace not found"))?;
            tx.commit()?;
            Ok(namespace)
        })
    }

    fn soft_delete_namespace(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let rows = tx.execute(
                "UPDATE namespaces SET deleted = 1 WHERE id = ?1 AND deleted = 0",
                params![id],
            )?;
            if rows == 0 {
                return Ok(false);
            }

            let keys = tx.execute(
                "UPDATE keys SET deleted = 1 WHERE namespace_id = ?1 AND deleted = 0",
                params![id],
            )?;
            let credentials = tx.execute(
                "UPDATE credentials SET deleted = 1 WHERE namespace_id = ?1 AND deleted = 0",
                params![id],
            )?;

            tx.commit()?;
            tracing::debug!(namespace_id = id, keys, credentials, "namespace soft-deleted");
            Ok(true)
        })
    }

    // Membership operations

    fn get_membership(&self, user_id: i64, namespace_id: i64) -> Result<Option<Membership>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {MEMBERSHIP_COLUMNS}
                     FROM memberships m JOIN namespaces n ON n.id = m.namespace_id
                     WHERE m.user_id = ?1 AND m.namespace_id = ?2 AND n.deleted = 0"
                ),
                params![user_id, namespace_id],
                membership_from_row,
            )
            .optional()
            .map_err(Error::from)
        })
    }

    fn insert_membership(&self, membership: &Membership) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "INSERT OR IGNORE INTO memberships (user_id, namespace_id, role, granted_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    membership.user_id,
                    membership.namespace_id,
                    membership.role,
                    format_datetime(&membership.granted_at),
                ],
            )?;
            Ok(rows > 0)
        })
    }

    fn delete_membership(&self, user_id: i64, namespace_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "DELETE FROM memberships WHERE user_id = ?1 AND namespace_id = ?2",
                params![user_id, namespace_id],
            )?;
            Ok(rows > 0)
        })
    }

    fn list_memberships(&self, namespace_id: i64) -> Result<Vec<Membership>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MEMBERSHIP_COLUMNS} FROM memberships m
                 WHERE m.namespace_id = ?1 ORDER BY m.granted_at, m.user_id"
            ))?;
            let rows = stmt.query_map(params![namespace_id], membership_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })
    }

    // Key operations

    fn create_key(
        &self,
        namespace_id: i64,
        name: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<KeyView> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if count(
                &tx,
                "SELECT COUNT(*) FROM namespaces WHERE id = ?1 AND deleted = 0",
                params![namespace_id],
            )? == 0
            {
                return Err(Error::not_found("Namespace not found"));
            }

            tx.execute(
                "INSERT INTO keys (namespace_id, name, deleted, created_at) VALUES (?1, ?2, 0, ?3)",
                params![namespace_id, name, format_datetime(&now)],
            )
            .on_unique_violation(|| {
                Error::already_exists(format!("Key '{name}' already exists in this namespace"))
            })?;
            let key_id = tx.last_insert_rowid();

            let revision_id = insert_revision(&tx, key_id, value, 1, &now)?;
            tx.execute(
                "UPDATE keys SET current_revision_id = ?1 WHERE id = ?2",
                params![revision_id, key_id],
            )?;

            let view =
                query_key_view(&tx, namespace_id, name)?.ok_or_else(|| key_not_found(name))?;
            tx.commit()?;
            Ok(view)
        })
    }

    fn add_revision(
        &self,
        namespace_id: i64,
        name: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<KeyView> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let key = query_active_key(&tx, namespace_id, name)?.ok_or_else(|| key_not_found(name))?;

            // Numbering follows the highest revision, not the current one, so a
            // revert never causes a number to be reused.
            let next: i64 = tx.query_row(
                "SELECT COALESCE(MAX(revision_number), 0) + 1 FROM revisions WHERE key_id = ?1",
                params![key.id],
                |row| row.get(0),
            )?;

            let revision_id = insert_revision(&tx, key.id, value, next, &now)?;
            tx.execute(
                "UPDATE keys SET current_revision_id = ?1 WHERE id = ?2",
                params![revision_id, key.id],
            )?;

            let view =
                query_key_view(&tx, namespace_id, name)?.ok_or_else(|| key_not_found(name))?;
            tx.commit()?;
            Ok(view)
        })
    }

    fn revert_key(&self, namespace_id: i64, name: &str, revision_number: i64) -> Result<KeyView> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let key = query_active_key(&tx, namespace_id, name)?.ok_or_else(|| key_not_found(name))?;

            let revision_id: i64 = tx
                .query_row(
                    "SELECT id FROM revisions WHERE key_id = ?1 AND revision_number = ?2",
                    params![key.id, revision_number],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| {
                    Error::not_found(format!(
                        "Revision {revision_number} not found for key '{name}'"
                    ))
                })?;

            if key.current_revision_id != Some(revision_id) {
                tx.execute(
                    "UPDATE keys SET current_revision_id = ?1 WHERE id = ?2",
                    params![revision_id, key.id],
                )?;
            }

            let view =
                query_key_view(&tx, namespace_id, name)?.ok_or_else(|| key_not_found(name))?;
            tx.commit()?;
            Ok(view)
        })
    }

    fn soft_delete_key(&self, namespace_id: i64, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE keys SET deleted = 1 WHERE namespace_id = ?1 AND name = ?2 AND deleted = 0",
                params![namespace_id, name],
            )?;
            Ok(rows > 0)
        })
    }

    fn restore_key(&self, namespace_id: i64, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let already_active = || {
                Error::already_exists(format!(
                    "An active key named '{name}' already exists in this namespace"
                ))
            };

            if query_active_key(&tx, namespace_id, name)?.is_some() {
                return Err(already_active());
            }

            let deleted_id: Option<i64> = tx
                .query_row(
                    "SELECT id FROM keys WHERE namespace_id = ?1 AND name = ?2 AND deleted = 1
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    params![namespace_id, name],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(key_id) = deleted_id else {
                return Ok(false);
            };

            tx.execute("UPDATE keys SET deleted = 0 WHERE id = ?1", params![key_id])
                .on_unique_violation(already_active)?;

            tx.commit()?;
            Ok(true)
        })
    }

    fn get_active_key(&self, namespace_id: i64, name: &str) -> Result<Option<Key>> {
        self.with_conn(|conn| query_active_key(conn, namespace_id, name).map_err(Error::from))
    }

    fn get_key_view(&self, namespace_id: i64, name: &str) -> Result<Option<KeyView>> {
        self.with_conn(|conn| query_key_view(conn, namespace_id, name).map_err(Error::from))
    }

    fn list_key_views(&self, namespace_id: i64) -> Result<Vec<KeyView>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{KEY_VIEW_SELECT} WHERE k.namespace_id = ?1 AND k.deleted = 0 ORDER BY k.name"
            ))?;
            let rows = stmt.query_map(params![namespace_id], key_view_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })
    }

    fn list_revisions(&self, key_id: i64) -> Result<Vec<Revision>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REVISION_COLUMNS} FROM revisions WHERE key_id = ?1
                 ORDER BY revision_number DESC"
            ))?;
            let rows = stmt.query_map(params![key_id], revision_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })
    }

    fn get_revision(&self, key_id: i64, revision_number: i64) -> Result<Option<Revision>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {REVISION_COLUMNS} FROM revisions WHERE key_id = ?1 AND revision_number = ?2"
                ),
                params![key_id, revision_number],
                revision_from_row,
            )
            .optional()
            .map_err(Error::from)
        })
    }

    // Scoped credential operations

    fn create_credential(&self, credential: &NewCredential) -> Result<ScopedCredential> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO credentials (user_id, namespace_id, secret_hash, secret_preview, role, description, created_at, expires_at, deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
                params![
                    credential.user_id,
                    credential.namespace_id,
                    credential.secret_hash,
                    credential.secret_preview,
                    credential.role,
                    credential.description,
                    format_datetime(&credential.created_at),
                    credential.expires_at.as_ref().map(format_datetime),
                ],
            )
            .on_unique_violation(|| Error::already_exists("Credential secret already in use"))?;

            Ok(ScopedCredential {
                id: conn.last_insert_rowid(),
                user_id: credential.user_id,
                namespace_id: credential.namespace_id,
                secret_hash: credential.secret_hash.clone(),
                secret_preview: credential.secret_preview.clone(),
                role: credential.role,
                description: credential.description.clone(),
                created_at: credential.created_at,
                expires_at: credential.expires_at,
                deleted: false,
            })
        })
    }

    fn get_credential(&self, id: i64) -> Result<Option<ScopedCredential>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE id = ?1"),
                params![id],
                credential_from_row,
            )
            .optional()
            .map_err(Error::from)
        })
    }

    fn get_credential_by_hash(&self, secret_hash: &str) -> Result<Option<ScopedCredential>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE secret_hash = ?1"),
                params![secret_hash],
                credential_from_row,
            )
            .optional()
            .map_err(Error::from)
        })
    }

    fn list_user_credentials(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScopedCredential>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CREDENTIAL_COLUMNS} FROM credentials
                 WHERE user_id = ?1 AND deleted = 0 AND (expires_at IS NULL OR expires_at > ?2)
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows =
                stmt.query_map(params![user_id, format_datetime(&now)], credential_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Error::from)
        })
    }

    fn revoke_credential(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE credentials SET deleted = 1 WHERE id = ?1 AND deleted = 0",
                params![id],
            )?;
            Ok(rows > 0)
        })
    }

    // Retention

    fn retention_counts(&self, now: DateTime<Utc>) -> Result<RetentionCounts> {
        self.with_conn(|conn| {
            Ok(RetentionCounts {
                keys: count(conn, "SELECT COUNT(*) FROM keys WHERE deleted = 1", [])?,
                namespaces: count(conn, "SELECT COUNT(*) FROM namespaces WHERE deleted = 1", [])?,
                users: count(conn, "SELECT COUNT(*) FROM users WHERE deleted = 1", [])?,
                credentials: count(conn, "SELECT COUNT(*) FROM credentials WHERE deleted = 1", [])?,
                expired_credentials: count(
                    conn,
                    "SELECT COUNT(*) FROM credentials
                     WHERE deleted = 0 AND expires_at IS NOT NULL AND expires_at <= ?1",
                    params![format_datetime(&now)],
                )?,
            })
        })
    }

    fn purge_deleted_keys(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "UPDATE keys SET current_revision_id = NULL WHERE deleted = 1",
                [],
            )?;
            let purged = tx.execute("DELETE FROM keys WHERE deleted = 1", [])?;
            tx.commit()?;
            Ok(purged)
        })
    }

    fn purge_deleted_namespaces(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "UPDATE keys SET current_revision_id = NULL
                 WHERE namespace_id IN (SELECT id FROM namespaces WHERE deleted = 1)",
                [],
            )?;
            let purged = tx.execute("DELETE FROM namespaces WHERE deleted = 1", [])?;
            tx.commit()?;
            Ok(purged)
        })
    }

    fn purge_deleted_users(&self) -> Result<UserPurge> {
        const OWNS_ACTIVE_NAMESPACE: &str =
            "EXISTS (SELECT 1 FROM namespaces n WHERE n.created_by = u.id AND n.deleted = 0)";

        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let skipped = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT u.id FROM users u WHERE u.deleted = 1 AND {OWNS_ACTIVE_NAMESPACE} ORDER BY u.id"
                ))?;
                let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            };

            let purged = tx.execute(
                "DELETE FROM users WHERE deleted = 1 AND id NOT IN
                 (SELECT created_by FROM namespaces WHERE deleted = 0 AND created_by IS NOT NULL)",
                [],
            )?;

            tx.commit()?;
            Ok(UserPurge { purged, skipped })
        })
    }

    fn purge_dead_credentials(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let purged = tx.execute(
                "DELETE FROM credentials
                 WHERE deleted = 1 OR (expires_at IS NOT NULL AND expires_at <= ?1)",
                params![format_datetime(&now)],
            )?;
            tx.commit()?;
            Ok(purged)
        })
    }

    fn stats(&self) -> Result<StoreStats> {
        self.with_conn(|conn| {
            Ok(StoreStats {
                users: count(conn, "SELECT COUNT(*) FROM users WHERE deleted = 0", [])?,
                namespaces: count(conn, "SELECT COUNT(*) FROM namespaces WHERE deleted = 0", [])?,
                keys: count(conn, "SELECT COUNT(*) FROM keys WHERE deleted = 0", [])?,
                revisions: count(conn, "SELECT COUNT(*) FROM revisions", [])?,
                credentials: count(conn, "SELECT COUNT(*) FROM credentials WHERE deleted = 0", [])?,
                tokens: count(conn, "SELECT COUNT(*) FROM tokens", [])?,
            })
        })
    }
}
