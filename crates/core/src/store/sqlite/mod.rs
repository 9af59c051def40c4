//! SQLite-backed store.

mod catalog;
mod feeds;
mod filters;
mod subscriptions;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{FilterKind, FilterOperatorKind, FilterSetKind, StoreError};

/// Scopes present in every installation.
const DEFAULT_SCOPES: [&str; 2] = ["personal", "family"];

/// Notification types the notifier gateway can deliver to.
const DEFAULT_NOTIFICATION_TYPES: [&str; 1] = ["discord"];

/// SQLite-backed store for every entity of the pipeline.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("{}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                url TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS author_aliases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subscription_scopes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS torrent_categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                scope_id INTEGER NOT NULL REFERENCES subscription_scopes(id),
                media_type TEXT NOT NULL CHECK (media_type IN ('ebook', 'audiobook')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notification_types (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notifiers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                notification_type_id INTEGER NOT NULL REFERENCES notification_types(id),
                url TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS libraries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                path TEXT NOT NULL,
                media_type TEXT NOT NULL CHECK (media_type IN ('ebook', 'audiobook')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS author_subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
                scope_id INTEGER NOT NULL REFERENCES subscription_scopes(id),
                notifier_id INTEGER REFERENCES notifiers(id) ON DELETE SET NULL,
                ebook_library_id INTEGER REFERENCES libraries(id) ON DELETE SET NULL,
                audiobook_library_id INTEGER REFERENCES libraries(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (author_id, scope_id)
            );

            CREATE TABLE IF NOT EXISTS author_subscription_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_subscription_id INTEGER NOT NULL
                    REFERENCES author_subscriptions(id) ON DELETE CASCADE,
                torrent_hash TEXT NOT NULL,
                booksearch_id TEXT NOT NULL UNIQUE,
                media_type TEXT NOT NULL DEFAULT 'ebook',
                title TEXT,
                downloaded_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_subscription_items_hash
                ON author_subscription_items(torrent_hash);

            CREATE TABLE IF NOT EXISTS filter_keys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS filter_operators (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS feed_filter_set_types (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS feed_filters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                torrent_category_id INTEGER REFERENCES torrent_categories(id) ON DELETE SET NULL,
                notifier_id INTEGER REFERENCES notifiers(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS feed_filter_sets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                feed_filter_id INTEGER NOT NULL REFERENCES feed_filters(id) ON DELETE CASCADE,
                set_type_id INTEGER NOT NULL REFERENCES feed_filter_set_types(id)
            );

            CREATE TABLE IF NOT EXISTS feed_filter_set_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                feed_filter_set_id INTEGER NOT NULL
                    REFERENCES feed_filter_sets(id) ON DELETE CASCADE,
                filter_key_id INTEGER NOT NULL REFERENCES filter_keys(id),
                filter_operator_id INTEGER NOT NULL REFERENCES filter_operators(id),
                value_type TEXT NOT NULL,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS feed_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guid TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL,
                pub_date TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Insert the reference rows every installation needs. Safe to call repeatedly.
    pub fn seed_defaults(&self) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = now_str();

        for scope in DEFAULT_SCOPES {
            tx.execute(
                "INSERT OR IGNORE INTO subscription_scopes (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![scope, now],
            )?;
        }
        for kind in DEFAULT_NOTIFICATION_TYPES {
            tx.execute(
                "INSERT OR IGNORE INTO notification_types (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![kind, now],
            )?;
        }
        for key in FilterKind::ALL {
            tx.execute(
                "INSERT OR IGNORE INTO filter_keys (name) VALUES (?1)",
                params![key.as_str()],
            )?;
        }
        for operator in FilterOperatorKind::ALL {
            tx.execute(
                "INSERT OR IGNORE INTO filter_operators (name) VALUES (?1)",
                params![operator.as_str()],
            )?;
        }
        for set_type in FilterSetKind::ALL {
            tx.execute(
                "INSERT OR IGNORE INTO feed_filter_set_types (name) VALUES (?1)",
                params![set_type.as_str()],
            )?;
        }

        tx.commit()?;
        debug!("Default reference data seeded");
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection mutex poisoned".to_string()))
    }
}

fn now_str() -> String {
    Utc::now().to_rfc3339()
}

/// Read an RFC 3339 timestamp column.
fn ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

fn opt_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| parse_ts(idx, &r)).transpose()
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse a text column through `FromStr`, reporting failures as conversion errors.
fn parsed<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = StoreError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: StoreError| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Fail with `NotFound` when an update or delete touched no row.
fn expect_affected(affected: usize, what: impl FnOnce() -> String) -> Result<(), StoreError> {
    if affected == 0 {
        Err(StoreError::NotFound(what()))
    } else {
        Ok(())
    }
}

/// Run a single-row query, mapping "no rows" to `None`.
fn query_opt<T, P, F>(conn: &Connection, sql: &str, params: P, f: F) -> Result<Option<T>, StoreError>
where
    P: rusqlite::Params,
    F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    Ok(conn.query_row(sql, params, f).optional()?)
}
