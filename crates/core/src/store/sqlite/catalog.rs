use rusqlite::params;
use tracing::warn;

use crate::notify::{NotifierKind, NotifierTarget};
use crate::store::{
    Author, AuthorAlias, CatalogStore, Library, MediaType, NewLibrary, NewNotifier,
    NewTorrentCategory, NotificationType, Notifier, StoreError, SubscriptionScope,
    TorrentCategory,
};

use super::{expect_affected, now_str, parsed, query_opt, ts, SqliteStore};

const AUTHOR_COLUMNS: &str = "id, name, created_at, updated_at";
const ALIAS_COLUMNS: &str = "id, author_id, name, created_at, updated_at";
const SCOPE_COLUMNS: &str = "id, name, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, name, scope_id, media_type, created_at, updated_at";
const NOTIFICATION_TYPE_COLUMNS: &str = "id, name, created_at, updated_at";
const NOTIFIER_COLUMNS: &str = "id, name, notification_type_id, url, created_at, updated_at";
const LIBRARY_COLUMNS: &str = "id, name, path, media_type, created_at, updated_at";

pub(super) fn row_to_author(row: &rusqlite::Row) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: ts(row, 2)?,
        updated_at: ts(row, 3)?,
    })
}

fn row_to_alias(row: &rusqlite::Row) -> rusqlite::Result<AuthorAlias> {
    Ok(AuthorAlias {
        id: row.get(0)?,
        author_id: row.get(1)?,
        name: row.get(2)?,
        created_at: ts(row, 3)?,
        updated_at: ts(row, 4)?,
    })
}

pub(super) fn row_to_scope(row: &rusqlite::Row) -> rusqlite::Result<SubscriptionScope> {
    Ok(SubscriptionScope {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: ts(row, 2)?,
        updated_at: ts(row, 3)?,
    })
}

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<TorrentCategory> {
    Ok(TorrentCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        scope_id: row.get(2)?,
        media_type: parsed(row, 3)?,
        created_at: ts(row, 4)?,
        updated_at: ts(row, 5)?,
    })
}

fn row_to_notification_type(row: &rusqlite::Row) -> rusqlite::Result<NotificationType> {
    Ok(NotificationType {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: ts(row, 2)?,
        updated_at: ts(row, 3)?,
    })
}

fn row_to_notifier(row: &rusqlite::Row) -> rusqlite::Result<Notifier> {
    Ok(Notifier {
        id: row.get(0)?,
        name: row.get(1)?,
        notification_type_id: row.get(2)?,
        url: row.get(3)?,
        created_at: ts(row, 4)?,
        updated_at: ts(row, 5)?,
    })
}

pub(super) fn row_to_library(row: &rusqlite::Row) -> rusqlite::Result<Library> {
    Ok(Library {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        media_type: parsed(row, 3)?,
        created_at: ts(row, 4)?,
        updated_at: ts(row, 5)?,
    })
}

/// Build a notifier target from (name, type name, url), skipping unsupported types.
pub(super) fn notifier_target(name: String, kind: &str, url: String) -> Option<NotifierTarget> {
    match kind.parse::<NotifierKind>() {
        Ok(kind) => Some(NotifierTarget { name, kind, url }),
        Err(_) => {
            warn!(notifier = %name, kind = %kind, "Skipping notifier of unsupported type");
            None
        }
    }
}

impl CatalogStore for SqliteStore {
    fn create_author(&self, name: &str) -> Result<Author, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO authors (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!("SELECT {} FROM authors WHERE id = ?1", AUTHOR_COLUMNS),
            params![id],
            row_to_author,
        )?)
    }

    fn get_author_by_name(&self, name: &str) -> Result<Option<Author>, StoreError> {
        let conn = self.conn()?;
        query_opt(
            &conn,
            &format!("SELECT {} FROM authors WHERE name = ?1", AUTHOR_COLUMNS),
            params![name],
            row_to_author,
        )
    }

    fn list_authors(&self) -> Result<Vec<Author>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM authors ORDER BY id", AUTHOR_COLUMNS))?;
        let authors = stmt
            .query_map([], row_to_author)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(authors)
    }

    fn delete_author(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn()?;
        // Aliases, subscriptions and their items go with it through ON DELETE CASCADE.
        let affected = conn.execute("DELETE FROM authors WHERE id = ?1", params![id])?;
        expect_affected(affected, || format!("author {}", id))
    }

    fn add_alias(&self, author_id: i64, name: &str) -> Result<AuthorAlias, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO author_aliases (author_id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![author_id, name, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!("SELECT {} FROM author_aliases WHERE id = ?1", ALIAS_COLUMNS),
            params![id],
            row_to_alias,
        )?)
    }

    fn list_aliases(&self) -> Result<Vec<AuthorAlias>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM author_aliases ORDER BY id",
            ALIAS_COLUMNS
        ))?;
        let aliases = stmt
            .query_map([], row_to_alias)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aliases)
    }

    fn delete_alias(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM author_aliases WHERE id = ?1", params![id])?;
        expect_affected(affected, || format!("alias {}", id))
    }

    fn create_scope(&self, name: &str) -> Result<SubscriptionScope, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO subscription_scopes (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!("SELECT {} FROM subscription_scopes WHERE id = ?1", SCOPE_COLUMNS),
            params![id],
            row_to_scope,
        )?)
    }

    fn get_scope_by_name(&self, name: &str) -> Result<Option<SubscriptionScope>, StoreError> {
        let conn = self.conn()?;
        query_opt(
            &conn,
            &format!("SELECT {} FROM subscription_scopes WHERE name = ?1", SCOPE_COLUMNS),
            params![name],
            row_to_scope,
        )
    }

    fn list_scopes(&self) -> Result<Vec<SubscriptionScope>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM subscription_scopes ORDER BY id",
            SCOPE_COLUMNS
        ))?;
        let scopes = stmt
            .query_map([], row_to_scope)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(scopes)
    }

    fn create_torrent_category(
        &self,
        category: NewTorrentCategory,
    ) -> Result<TorrentCategory, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO torrent_categories (name, scope_id, media_type, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![category.name, category.scope_id, category.media_type.as_str(), now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!("SELECT {} FROM torrent_categories WHERE id = ?1", CATEGORY_COLUMNS),
            params![id],
            row_to_category,
        )?)
    }

    fn list_torrent_categories(&self) -> Result<Vec<TorrentCategory>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM torrent_categories ORDER BY id",
            CATEGORY_COLUMNS
        ))?;
        let categories = stmt
            .query_map([], row_to_category)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn find_torrent_category(
        &self,
        scope_id: i64,
        media_type: MediaType,
    ) -> Result<Option<TorrentCategory>, StoreError> {
        let conn = self.conn()?;
        query_opt(
            &conn,
            &format!(
                "SELECT {} FROM torrent_categories WHERE scope_id = ?1 AND media_type = ?2 ORDER BY id LIMIT 1",
                CATEGORY_COLUMNS
            ),
            params![scope_id, media_type.as_str()],
            row_to_category,
        )
    }

    fn create_notification_type(&self, name: &str) -> Result<NotificationType, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO notification_types (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!(
                "SELECT {} FROM notification_types WHERE id = ?1",
                NOTIFICATION_TYPE_COLUMNS
            ),
            params![id],
            row_to_notification_type,
        )?)
    }

    fn get_notification_type_by_name(
        &self,
        name: &str,
    ) -> Result<Option<NotificationType>, StoreError> {
        let conn = self.conn()?;
        query_opt(
            &conn,
            &format!(
                "SELECT {} FROM notification_types WHERE name = ?1",
                NOTIFICATION_TYPE_COLUMNS
            ),
            params![name],
            row_to_notification_type,
        )
    }

    fn create_notifier(&self, notifier: NewNotifier) -> Result<Notifier, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO notifiers (name, notification_type_id, url, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![notifier.name, notifier.notification_type_id, notifier.url, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!("SELECT {} FROM notifiers WHERE id = ?1", NOTIFIER_COLUMNS),
            params![id],
            row_to_notifier,
        )?)
    }

    fn list_notifiers(&self) -> Result<Vec<Notifier>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM notifiers ORDER BY id", NOTIFIER_COLUMNS))?;
        let notifiers = stmt
            .query_map([], row_to_notifier)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifiers)
    }

    fn list_notifier_targets(&self) -> Result<Vec<NotifierTarget>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT n.name, t.name, n.url FROM notifiers n
             JOIN notification_types t ON t.id = n.notification_type_id
             ORDER BY n.id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(name, kind, url)| notifier_target(name, &kind, url))
            .collect())
    }

    fn create_library(&self, library: NewLibrary) -> Result<Library, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO libraries (name, path, media_type, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![library.name, library.path, library.media_type.as_str(), now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!("SELECT {} FROM libraries WHERE id = ?1", LIBRARY_COLUMNS),
            params![id],
            row_to_library,
        )?)
    }

    fn get_library_by_name(&self, name: &str) -> Result<Option<Library>, StoreError> {
        let conn = self.conn()?;
        query_opt(
            &conn,
            &format!("SELECT {} FROM libraries WHERE name = ?1", LIBRARY_COLUMNS),
            params![name],
            row_to_library,
        )
    }

    fn list_libraries(&self) -> Result<Vec<Library>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM libraries ORDER BY id", LIBRARY_COLUMNS))?;
        let libraries = stmt
            .query_map([], row_to_library)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(libraries)
    }
}
