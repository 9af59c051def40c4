use rusqlite::params;

use crate::store::{
    FeedFilter, FeedFilterSet, FeedFilterSetEntry, FeedFilterSetType, FeedItem, FilterKey,
    FilterKind, FilterOperator, FilterOperatorKind, FilterSetKind, FilterStore, FilterValue,
    NewFeedFilter, NewFeedItem, StoreError,
};

use super::{now_str, opt_ts, parsed, ts, SqliteStore};

const FEED_FILTER_COLUMNS: &str =
    "id, name, feed_id, torrent_category_id, notifier_id, created_at, updated_at";
const FEED_ITEM_COLUMNS: &str =
    "id, guid, title, link, category, description, pub_date, created_at";

fn row_to_feed_filter(row: &rusqlite::Row) -> rusqlite::Result<FeedFilter> {
    Ok(FeedFilter {
        id: row.get(0)?,
        name: row.get(1)?,
        feed_id: row.get(2)?,
        torrent_category_id: row.get(3)?,
        notifier_id: row.get(4)?,
        created_at: ts(row, 5)?,
        updated_at: ts(row, 6)?,
    })
}

fn row_to_filter_set(row: &rusqlite::Row) -> rusqlite::Result<FeedFilterSet> {
    Ok(FeedFilterSet {
        id: row.get(0)?,
        feed_filter_id: row.get(1)?,
        set_type: parsed(row, 2)?,
    })
}

fn row_to_feed_item(row: &rusqlite::Row) -> rusqlite::Result<FeedItem> {
    Ok(FeedItem {
        id: row.get(0)?,
        guid: row.get(1)?,
        title: row.get(2)?,
        link: row.get(3)?,
        category: row.get(4)?,
        description: row.get(5)?,
        pub_date: opt_ts(row, 6)?,
        created_at: ts(row, 7)?,
    })
}

/// Resolve a reference-table id by name, failing with `NotFound` if the row is missing.
fn lookup_id(conn: &rusqlite::Connection, table: &str, name: &str) -> Result<i64, StoreError> {
    super::query_opt(
        conn,
        &format!("SELECT id FROM {} WHERE name = ?1", table),
        params![name],
        |row| row.get(0),
    )?
    .ok_or_else(|| StoreError::NotFound(format!("{} '{}'", table, name)))
}

impl FilterStore for SqliteStore {
    fn list_filter_keys(&self) -> Result<Vec<FilterKey>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM filter_keys ORDER BY id")?;
        let keys = stmt
            .query_map([], |row| {
                Ok(FilterKey {
                    id: row.get(0)?,
                    name: parsed(row, 1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn list_filter_operators(&self) -> Result<Vec<FilterOperator>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM filter_operators ORDER BY id")?;
        let operators = stmt
            .query_map([], |row| {
                Ok(FilterOperator {
                    id: row.get(0)?,
                    name: parsed(row, 1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(operators)
    }

    fn list_filter_set_types(&self) -> Result<Vec<FeedFilterSetType>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM feed_filter_set_types ORDER BY id")?;
        let types = stmt
            .query_map([], |row| {
                Ok(FeedFilterSetType {
                    id: row.get(0)?,
                    name: parsed(row, 1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(types)
    }

    fn create_feed_filter(&self, filter: NewFeedFilter) -> Result<FeedFilter, StoreError> {
        let conn = self.conn()?;
        let now = now_str();
        conn.execute(
            "INSERT INTO feed_filters (name, feed_id, torrent_category_id, notifier_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                filter.name,
                filter.feed_id,
                filter.torrent_category_id,
                filter.notifier_id,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!("SELECT {} FROM feed_filters WHERE id = ?1", FEED_FILTER_COLUMNS),
            params![id],
            row_to_feed_filter,
        )?)
    }

    fn list_feed_filters(&self, feed_id: i64) -> Result<Vec<FeedFilter>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM feed_filters WHERE feed_id = ?1 ORDER BY id",
            FEED_FILTER_COLUMNS
        ))?;
        let filters = stmt
            .query_map(params![feed_id], row_to_feed_filter)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(filters)
    }

    fn create_filter_set(
        &self,
        feed_filter_id: i64,
        set_type: FilterSetKind,
    ) -> Result<FeedFilterSet, StoreError> {
        let conn = self.conn()?;
        let set_type_id = lookup_id(&conn, "feed_filter_set_types", set_type.as_str())?;
        conn.execute(
            "INSERT INTO feed_filter_sets (feed_filter_id, set_type_id) VALUES (?1, ?2)",
            params![feed_filter_id, set_type_id],
        )?;
        Ok(FeedFilterSet {
            id: conn.last_insert_rowid(),
            feed_filter_id,
            set_type,
        })
    }

    fn list_filter_sets(&self, feed_filter_id: i64) -> Result<Vec<FeedFilterSet>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.feed_filter_id, t.name FROM feed_filter_sets s
             JOIN feed_filter_set_types t ON t.id = s.set_type_id
             WHERE s.feed_filter_id = ?1 ORDER BY s.id",
        )?;
        let sets = stmt
            .query_map(params![feed_filter_id], row_to_filter_set)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sets)
    }

    fn add_filter_set_entry(
        &self,
        feed_filter_set_id: i64,
        key: FilterKind,
        operator: FilterOperatorKind,
        value: FilterValue,
    ) -> Result<FeedFilterSetEntry, StoreError> {
        let conn = self.conn()?;
        let key_id = lookup_id(&conn, "filter_keys", key.as_str())?;
        let operator_id = lookup_id(&conn, "filter_operators", operator.as_str())?;
        let (value_type, raw) = value.to_columns();

        conn.execute(
            "INSERT INTO feed_filter_set_entries (feed_filter_set_id, filter_key_id, filter_operator_id, value_type, value)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![feed_filter_set_id, key_id, operator_id, value_type, raw],
        )?;

        Ok(FeedFilterSetEntry {
            id: conn.last_insert_rowid(),
            feed_filter_set_id,
            key,
            operator,
            value,
        })
    }

    fn list_filter_set_entries(
        &self,
        feed_filter_set_id: i64,
    ) -> Result<Vec<FeedFilterSetEntry>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT e.id, e.feed_filter_set_id, k.name, o.name, e.value_type, e.value
             FROM feed_filter_set_entries e
             JOIN filter_keys k ON k.id = e.filter_key_id
             JOIN filter_operators o ON o.id = e.filter_operator_id
             WHERE e.feed_filter_set_id = ?1 ORDER BY e.id",
        )?;
        let rows = stmt
            .query_map(params![feed_filter_set_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    parsed::<FilterKind>(row, 2)?,
                    parsed::<FilterOperatorKind>(row, 3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, set_id, key, operator, value_type, raw)| {
                Ok(FeedFilterSetEntry {
                    id,
                    feed_filter_set_id: set_id,
                    key,
                    operator,
                    value: FilterValue::from_columns(&value_type, raw)?,
                })
            })
            .collect()
    }

    fn record_feed_item(&self, item: NewFeedItem) -> Result<FeedItem, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO feed_items (guid, title, link, category, description, pub_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.guid,
                item.title,
                item.link,
                item.category,
                item.description,
                item.pub_date.map(|d| d.to_rfc3339()),
                now_str(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            &format!("SELECT {} FROM feed_items WHERE id = ?1", FEED_ITEM_COLUMNS),
            params![id],
            row_to_feed_item,
        )?)
    }

    fn list_feed_items(&self) -> Result<Vec<FeedItem>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM feed_items ORDER BY id",
            FEED_ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map([], row_to_feed_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }
}
