use rusqlite::{params, Connection};

use crate::store::{
    AuthorSubscription, AuthorSubscriptionItem, NewAuthorSubscription, NewSubscriptionItem,
    StoreError, SubscriptionDetail, SubscriptionItemDetail, SubscriptionStore,
};

use super::catalog::{notifier_target, row_to_author, row_to_library, row_to_scope};
use super::{expect_affected, now_str, parsed, query_opt, ts, SqliteStore};

const SUBSCRIPTION_COLUMNS: &str = "id, author_id, scope_id, notifier_id, ebook_library_id, audiobook_library_id, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, author_subscription_id, torrent_hash, booksearch_id, media_type, title, downloaded_at, created_at, updated_at";

fn row_to_subscription(row: &rusqlite::Row) -> rusqlite::Result<AuthorSubscription> {
    Ok(AuthorSubscription {
        id: row.get(0)?,
        author_id: row.get(1)?,
        scope_id: row.get(2)?,
        notifier_id: row.get(3)?,
        ebook_library_id: row.get(4)?,
        audiobook_library_id: row.get(5)?,
        created_at: ts(row, 6)?,
        updated_at: ts(row, 7)?,
    })
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<AuthorSubscriptionItem> {
    Ok(AuthorSubscriptionItem {
        id: row.get(0)?,
        author_subscription_id: row.get(1)?,
        torrent_hash: row.get(2)?,
        booksearch_id: row.get(3)?,
        media_type: parsed(row, 4)?,
        title: row.get(5)?,
        downloaded_at: ts(row, 6)?,
        created_at: ts(row, 7)?,
        updated_at: ts(row, 8)?,
    })
}

/// Load author, scope, notifier and libraries for a subscription.
fn load_detail(
    conn: &Connection,
    subscription: AuthorSubscription,
) -> Result<SubscriptionDetail, StoreError> {
    let author = conn.query_row(
        "SELECT id, name, created_at, updated_at FROM authors WHERE id = ?1",
        params![subscription.author_id],
        row_to_author,
    )?;
    let scope = conn.query_row(
        "SELECT id, name, created_at, updated_at FROM subscription_scopes WHERE id = ?1",
        params![subscription.scope_id],
        row_to_scope,
    )?;

    let notifier = match subscription.notifier_id {
        Some(notifier_id) => query_opt(
            conn,
            "SELECT n.name, t.name, n.url FROM notifiers n
             JOIN notification_types t ON t.id = n.notification_type_id
             WHERE n.id = ?1",
            params![notifier_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )?
        .and_then(|(name, kind, url)| notifier_target(name, &kind, url)),
        None => None,
    };

    let load_library = |id: Option<i64>| -> Result<_, StoreError> {
        match id {
            Some(id) => query_opt(
                conn,
                "SELECT id, name, path, media_type, created_at, updated_at FROM libraries WHERE id = ?1",
                params![id],
                row_to_library,
            ),
            None => Ok(None),
        }
    };
    let ebook_library = load_library(subscription.ebook_library_id)?;
    let audiobook_library = load_library(subscription.audiobook_library_id)?;

    Ok(SubscriptionDetail {
        subscription,
        author,
        scope,
        notifier,
        ebook_library,
        audiobook_library,
    })
}

impl SubscriptionStore for SqliteStore {
    fn create_subscription(
        &self,
        subscription: NewAuthorSubscription,
    ) -> Result<AuthorSubscription, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO author_subscriptions (author_id, scope_id, notifier_id, ebook_library_id, audiobook_library_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                subscription.author_id,
                subscription.scope_id,
                subscription.notifier_id,
                subscription.ebook_library_id,
                subscription.audiobook_library_id,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!(
                "SELECT {} FROM author_subscriptions WHERE id = ?1",
                SUBSCRIPTION_COLUMNS
            ),
            params![id],
            row_to_subscription,
        )?)
    }

    fn delete_subscription(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let affected =
            conn.execute("DELETE FROM author_subscriptions WHERE id = ?1", params![id])?;
        expect_affected(affected, || format!("subscription {}", id))
    }

    fn list_subscription_details(&self) -> Result<Vec<SubscriptionDetail>, StoreError> {
        let conn = self.conn()?;
        let subscriptions = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM author_subscriptions ORDER BY id",
                SUBSCRIPTION_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], row_to_subscription)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        subscriptions
            .into_iter()
            .map(|s| load_detail(&conn, s))
            .collect()
    }

    fn create_subscription_item(
        &self,
        item: NewSubscriptionItem,
    ) -> Result<AuthorSubscriptionItem, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO author_subscription_items (author_subscription_id, torrent_hash, booksearch_id, media_type, title, downloaded_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                item.author_subscription_id,
                item.torrent_hash,
                item.booksearch_id,
                item.media_type.as_str(),
                item.title,
                item.downloaded_at.to_rfc3339(),
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!(
                "SELECT {} FROM author_subscription_items WHERE id = ?1",
                ITEM_COLUMNS
            ),
            params![id],
            row_to_item,
        )?)
    }

    fn find_item_by_booksearch_id(
        &self,
        booksearch_id: &str,
    ) -> Result<Option<AuthorSubscriptionItem>, StoreError> {
        let conn = self.conn()?;
        query_opt(
            &conn,
            &format!(
                "SELECT {} FROM author_subscription_items WHERE booksearch_id = ?1",
                ITEM_COLUMNS
            ),
            params![booksearch_id],
            row_to_item,
        )
    }

    fn find_item_detail_by_hash(
        &self,
        torrent_hash: &str,
    ) -> Result<Option<SubscriptionItemDetail>, StoreError> {
        let conn = self.conn()?;
        // Hashes are stored lowercase; the newest record wins if a hash was dispatched twice.
        let item = query_opt(
            &conn,
            &format!(
                "SELECT {} FROM author_subscription_items WHERE torrent_hash = ?1 ORDER BY id DESC LIMIT 1",
                ITEM_COLUMNS
            ),
            params![torrent_hash.to_ascii_lowercase()],
            row_to_item,
        )?;

        let Some(item) = item else {
            return Ok(None);
        };

        let subscription = conn.query_row(
            &format!(
                "SELECT {} FROM author_subscriptions WHERE id = ?1",
                SUBSCRIPTION_COLUMNS
            ),
            params![item.author_subscription_id],
            row_to_subscription,
        )?;
        let subscription = load_detail(&conn, subscription)?;

        Ok(Some(SubscriptionItemDetail { item, subscription }))
    }

    fn count_subscription_items(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM author_subscription_items", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}
