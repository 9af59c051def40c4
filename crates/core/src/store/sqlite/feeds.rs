use rusqlite::params;

use crate::store::{Feed, FeedStore, NewFeed, StoreError};

use super::{expect_affected, now_str, query_opt, ts, SqliteStore};

const FEED_COLUMNS: &str = "id, name, url, enabled, created_at, updated_at";

fn row_to_feed(row: &rusqlite::Row) -> rusqlite::Result<Feed> {
    Ok(Feed {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        enabled: row.get(3)?,
        created_at: ts(row, 4)?,
        updated_at: ts(row, 5)?,
    })
}

impl FeedStore for SqliteStore {
    fn create_feed(&self, feed: NewFeed) -> Result<Feed, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO feeds (name, url, enabled, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![feed.name, feed.url, feed.enabled, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!("SELECT {} FROM feeds WHERE id = ?1", FEED_COLUMNS),
            params![id],
            row_to_feed,
        )?)
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>, StoreError> {
        let conn = self.conn()?;
        query_opt(
            &conn,
            &format!("SELECT {} FROM feeds WHERE id = ?1", FEED_COLUMNS),
            params![id],
            row_to_feed,
        )
    }

    fn list_feeds(&self) -> Result<Vec<Feed>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM feeds ORDER BY id", FEED_COLUMNS))?;
        let feeds = stmt
            .query_map([], row_to_feed)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(feeds)
    }

    fn set_feed_enabled(&self, id: i64, enabled: bool) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE feeds SET enabled = ?1, updated_at = ?2 WHERE id = ?3",
            params![enabled, now_str(), id],
        )?;
        expect_affected(affected, || format!("feed {}", id))
    }

    fn delete_feed(&self, id: i64) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        // Cascade explicitly so the whole filter tree goes in one transaction
        // even on connections opened without foreign key enforcement.
        tx.execute(
            "DELETE FROM feed_filter_set_entries WHERE feed_filter_set_id IN (
                SELECT s.id FROM feed_filter_sets s
                JOIN feed_filters f ON f.id = s.feed_filter_id
                WHERE f.feed_id = ?1)",
            params![id],
        )?;
        tx.execute(
            "DELETE FROM feed_filter_sets WHERE feed_filter_id IN (
                SELECT id FROM feed_filters WHERE feed_id = ?1)",
            params![id],
        )?;
        tx.execute("DELETE FROM feed_filters WHERE feed_id = ?1", params![id])?;
        let affected = tx.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;

        expect_affected(affected, || format!("feed {}", id))?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        FilterKind, FilterOperatorKind, FilterSetKind, FilterStore, FilterValue, NewFeedFilter,
    };

    fn create_test_store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.seed_defaults().unwrap();
        store
    }

    #[test]
    fn test_create_and_list_feeds() {
        let store = create_test_store();
        let feed = store
            .create_feed(NewFeed::new("ebooks", "https://tracker/rss/ebooks"))
            .unwrap();
        assert!(feed.enabled);

        store
            .create_feed(NewFeed::new("audiobooks", "https://tracker/rss/audio"))
            .unwrap();

        let names: Vec<String> = store.list_feeds().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["ebooks", "audiobooks"]);
    }

    #[test]
    fn test_feed_name_unique() {
        let store = create_test_store();
        store.create_feed(NewFeed::new("main", "https://a")).unwrap();
        let result = store.create_feed(NewFeed::new("main", "https://b"));
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_set_feed_enabled() {
        let store = create_test_store();
        let feed = store.create_feed(NewFeed::new("main", "https://a")).unwrap();

        store.set_feed_enabled(feed.id, false).unwrap();
        assert!(!store.get_feed(feed.id).unwrap().unwrap().enabled);

        assert!(matches!(
            store.set_feed_enabled(999, true),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_feed_cascades_filters() {
        let store = create_test_store();
        let feed = store.create_feed(NewFeed::new("main", "https://a")).unwrap();
        let filter = store
            .create_feed_filter(NewFeedFilter {
                name: "fantasy".to_string(),
                feed_id: feed.id,
                torrent_category_id: None,
                notifier_id: None,
            })
            .unwrap();
        let set = store.create_filter_set(filter.id, FilterSetKind::All).unwrap();
        store
            .add_filter_set_entry(
                set.id,
                FilterKind::Category,
                FilterOperatorKind::Contains,
                FilterValue::String("Fantasy".to_string()),
            )
            .unwrap();

        store.delete_feed(feed.id).unwrap();

        assert!(store.get_feed(feed.id).unwrap().is_none());
        assert!(store.list_feed_filters(feed.id).unwrap().is_empty());
        assert!(store.list_filter_sets(filter.id).unwrap().is_empty());
        assert!(store.list_filter_set_entries(set.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_feed() {
        let store = create_test_store();
        assert!(matches!(store.delete_feed(42), Err(StoreError::NotFound(_))));
    }
}
