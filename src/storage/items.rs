use chrono::Utc;

use super::schema::Database;
use super::types::{StoreError, StoredItem};
use super::DataStore;
use crate::feed::FeedItem;

/// [`DataStore`] backed by the `items` table, scoped to one source.
///
/// Records are stored as JSON in the wire field naming, keyed by
/// `(source, guid)`.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
    source: String,
}

impl SqliteStore {
    pub(crate) fn new(db: Database, source: &str) -> Self {
        Self {
            db,
            source: source.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl DataStore for SqliteStore {
    async fn clear(&mut self) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE source = ?")
            .bind(&self.source)
            .execute(&self.db.pool)
            .await?;

        tracing::debug!(
            source = %self.source,
            removed = result.rows_affected(),
            "Cleared stored items"
        );
        Ok(())
    }

    async fn set(&mut self, key: &str, item: &FeedItem) -> Result<(), StoreError> {
        let data = serde_json::to_string(item)?;

        sqlx::query(
            r#"
            INSERT INTO items (source, guid, position, data, stored_at)
            VALUES (
                ?1, ?2,
                (SELECT COALESCE(MAX(position), -1) + 1 FROM items WHERE source = ?1),
                ?3, ?4
            )
            ON CONFLICT(source, guid) DO UPDATE SET
                data = excluded.data,
                stored_at = excluded.stored_at
        "#,
        )
        .bind(&self.source)
        .bind(key)
        .bind(&data)
        .bind(Utc::now().timestamp())
        .execute(&self.db.pool)
        .await?;

        Ok(())
    }
}

impl Database {
    // ========================================================================
    // Item Queries
    // ========================================================================

    /// All records published for `source`, in first-insertion order.
    pub async fn items(&self, source: &str) -> Result<Vec<StoredItem>, StoreError> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT guid, data, stored_at
            FROM items
            WHERE source = ?
            ORDER BY position
        "#,
        )
        .bind(source)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(guid, data, stored_at)| -> Result<StoredItem, StoreError> {
                Ok(StoredItem {
                    guid,
                    item: serde_json::from_str(&data)?,
                    stored_at,
                })
            })
            .collect()
    }

    /// Number of records published for `source`.
    pub async fn count_items(&self, source: &str) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE source = ?")
            .bind(source)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Enclosure;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn item(guid: &str, title: &str) -> FeedItem {
        FeedItem {
            creator: "testuser".to_string(),
            title: title.to_string(),
            link: format!("https://zenn.dev/testuser/articles/{}", guid),
            pub_date: "Mon, 01 Jan 2024 00:00:00 GMT".to_string(),
            enclosure: Enclosure {
                url: "https://example.com/image.png".to_string(),
                length: 12345u64.into(),
                mime_type: "image/png".to_string(),
            },
            dc_creator: "testuser".to_string(),
            content: "<p>body</p>".to_string(),
            content_snippet: "body".to_string(),
            guid: guid.to_string(),
            iso_date: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_set_and_read_back() {
        let db = test_db().await;
        let mut store = db.store("testuser");

        store.set("g1", &item("g1", "First")).await.unwrap();
        store.set("g2", &item("g2", "Second")).await.unwrap();

        let items = db.items("testuser").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].guid, "g1");
        assert_eq!(items[0].item, item("g1", "First"));
        assert_eq!(items[1].item.title, "Second");
        assert!(items[0].stored_at > 0);
    }

    #[tokio::test]
    async fn test_upsert_keeps_position() {
        let db = test_db().await;
        let mut store = db.store("testuser");

        store.set("g1", &item("g1", "Old")).await.unwrap();
        store.set("g2", &item("g2", "Second")).await.unwrap();
        store.set("g1", &item("g1", "New")).await.unwrap();

        let items = db.items("testuser").await.unwrap();
        let guids: Vec<_> = items.iter().map(|s| s.guid.as_str()).collect();
        assert_eq!(guids, vec!["g1", "g2"]);
        assert_eq!(items[0].item.title, "New");
    }

    #[tokio::test]
    async fn test_clear_is_scoped_to_source() {
        let db = test_db().await;
        let mut alice = db.store("alice");
        let mut bob = db.store("bob");

        alice.set("a", &item("a", "A")).await.unwrap();
        bob.set("b", &item("b", "B")).await.unwrap();
        alice.clear().await.unwrap();

        assert_eq!(db.count_items("alice").await.unwrap(), 0);
        assert_eq!(db.count_items("bob").await.unwrap(), 1);
        assert_eq!(alice.source(), "alice");
    }

    #[tokio::test]
    async fn test_positions_restart_after_clear() {
        let db = test_db().await;
        let mut store = db.store("testuser");

        store.set("x", &item("x", "X")).await.unwrap();
        store.clear().await.unwrap();
        store.set("y", &item("y", "Y")).await.unwrap();
        store.set("x", &item("x", "X")).await.unwrap();

        let guids: Vec<_> = db
            .items("testuser")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.guid)
            .collect();
        assert_eq!(guids, vec!["y", "x"]);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_reported() {
        let db = test_db().await;
        sqlx::query(
            "INSERT INTO items (source, guid, position, data, stored_at) VALUES ('u', 'g', 0, '{', 0)",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let result = db.items("u").await;
        assert!(matches!(result, Err(StoreError::Serde(_))));
    }
}
