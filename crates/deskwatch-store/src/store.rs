//! Typed repository over the `regions` table.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{info, warn};

use deskwatch_models::BoundingBox;

use crate::error::{StoreError, StoreResult};

/// One durable record: a region's bbox identity and its committed dwell time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistedRegion {
    pub bbox: BoundingBox,
    pub dwell_seconds: f64,
}

/// Repository for region dwell-time records.
///
/// The table is keyed by the bbox serialized as four space-separated
/// integers. Duplicate regions are legal and store one row each; delete and
/// update match every row with the given bbox text.
#[derive(Clone)]
pub struct RegionStore {
    pool: SqlitePool,
}

impl RegionStore {
    /// Open (and create if missing) the database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS regions (
                bbox TEXT NOT NULL,
                dwell_seconds REAL NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await?;

        info!(path = %path.as_ref().display(), "Region store opened");
        Ok(Self { pool })
    }

    /// Insert a new record for a freshly created region.
    pub async fn insert(&self, bbox: &BoundingBox, dwell_seconds: f64) -> StoreResult<()> {
        sqlx::query("INSERT INTO regions (bbox, dwell_seconds) VALUES (?, ?)")
            .bind(bbox.to_string())
            .bind(dwell_seconds)
            .execute(&self.pool)
            .await?;
        info!(bbox = %bbox, "Created region record");
        Ok(())
    }

    /// Delete every record matching `bbox`.
    ///
    /// Returns `true` when at least one row was removed.
    pub async fn delete(&self, bbox: &BoundingBox) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM regions WHERE bbox = ?")
            .bind(bbox.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the committed dwell time for every record matching `bbox`.
    pub async fn update_dwell(&self, bbox: &BoundingBox, dwell_seconds: f64) -> StoreResult<()> {
        sqlx::query("UPDATE regions SET dwell_seconds = ? WHERE bbox = ?")
            .bind(dwell_seconds)
            .bind(bbox.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Full-table scan, in rowid order.
    ///
    /// Rows whose bbox text no longer parses are logged and skipped so a
    /// damaged record cannot block startup rehydration.
    pub async fn load_all(&self) -> StoreResult<Vec<PersistedRegion>> {
        let rows = sqlx::query("SELECT bbox, dwell_seconds FROM regions ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match parse_row(row.try_get("bbox")?, row.try_get("dwell_seconds")?) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable region record: {}", e),
            }
        }
        Ok(records)
    }

    /// Cheap connectivity probe for readiness checks.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_row(bbox: String, dwell_seconds: f64) -> StoreResult<PersistedRegion> {
    let bbox = BoundingBox::from_str(&bbox)
        .map_err(|e| StoreError::corrupt_record(format!("{bbox:?}: {e}")))?;
    if !dwell_seconds.is_finite() || dwell_seconds < 0.0 {
        return Err(StoreError::corrupt_record(format!(
            "{bbox}: dwell_seconds = {dwell_seconds}"
        )));
    }
    Ok(PersistedRegion {
        bbox,
        dwell_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (RegionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RegionStore::open(dir.path().join("regions.db"))
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_insert_and_load_preserves_insertion_order() {
        let (store, _dir) = temp_store().await;
        let a = BoundingBox::new(10, 10, 110, 110);
        let b = BoundingBox::new(200, 50, 300, 150);

        store.insert(&a, 0.0).await.unwrap();
        store.insert(&b, 3.0).await.unwrap();

        let records = store.load_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].bbox, a);
        assert_eq!(records[0].dwell_seconds, 0.0);
        assert_eq!(records[1].bbox, b);
        assert_eq!(records[1].dwell_seconds, 3.0);
    }

    #[tokio::test]
    async fn test_update_dwell() {
        let (store, _dir) = temp_store().await;
        let bbox = BoundingBox::new(10, 10, 110, 110);

        store.insert(&bbox, 0.0).await.unwrap();
        store.update_dwell(&bbox, 12.0).await.unwrap();

        let records = store.load_all().await.unwrap();
        assert_eq!(records[0].dwell_seconds, 12.0);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_a_row_existed() {
        let (store, _dir) = temp_store().await;
        let bbox = BoundingBox::new(10, 10, 110, 110);

        store.insert(&bbox, 1.0).await.unwrap();
        assert!(store.delete(&bbox).await.unwrap());
        assert!(!store.delete(&bbox).await.unwrap());
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_regions_store_one_row_each() {
        let (store, _dir) = temp_store().await;
        let bbox = BoundingBox::new(10, 10, 110, 110);

        store.insert(&bbox, 0.0).await.unwrap();
        store.insert(&bbox, 0.0).await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 2);

        // Delete removes every row with the same identity.
        assert!(store.delete(&bbox).await.unwrap());
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.db");
        let bbox = BoundingBox::new(0, 0, 64, 48);

        {
            let store = RegionStore::open(&path).await.unwrap();
            store.insert(&bbox, 7.0).await.unwrap();
            store.close().await;
        }

        let store = RegionStore::open(&path).await.unwrap();
        let records = store.load_all().await.unwrap();
        assert_eq!(records, vec![PersistedRegion { bbox, dwell_seconds: 7.0 }]);
    }
}
