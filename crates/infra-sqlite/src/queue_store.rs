// SQLite QueueStore Implementation

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{debug, warn};
use wwa_core::application::KeyedLocks;
use wwa_core::domain::{LinkSet, NormalizedUrl, RequesterKey};
use wwa_core::error::{AppError, Result};
use wwa_core::port::{AddOutcome, QueueStore, TimeProvider};

// Helper to convert sqlx::Error to AppError with structured information
fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            Some(code) if code.as_ref() == "5" => AppError::Database(format!(
                "Database locked (SQLITE_BUSY): {}",
                db_err.message()
            )),
            Some(code) if code.as_ref() == "13" => {
                AppError::Database(format!("Database full: {}", db_err.message()))
            }
            Some(code) => AppError::Database(format!(
                "Database error [{}]: {}",
                code.as_ref(),
                db_err.message()
            )),
            None => AppError::Database(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        _ => AppError::Database(err.to_string()),
    }
}

/// Durable per-requester link queue.
///
/// Every read-modify-write holds the key's in-process lock and runs inside a
/// `BEGIN IMMEDIATE` transaction, so concurrent `add` calls for one key never
/// lose links and other processes sharing the file wait on SQLite's lock.
/// That lock is database-wide: writers for different keys queue behind each
/// other for the length of one short transaction (bounded by `busy_timeout`).
/// `list` of a well-formed row is a plain read and never takes it.
pub struct SqliteQueueStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    locks: KeyedLocks<RequesterKey>,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
            locks: KeyedLocks::new(),
        }
    }

    /// Delete every row whose value is not a JSON array of strings.
    ///
    /// Returns the number of rows removed.
    pub async fn purge_malformed(&self) -> Result<usize> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT requester_key, urls FROM link_queue")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let mut purged = 0;
        for (key, urls) in rows {
            if decode(&urls).is_some() {
                continue;
            }
            warn!(requester = %key, "Purging malformed queue entry");
            sqlx::query("DELETE FROM link_queue WHERE requester_key = ?")
                .bind(&key)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            purged += 1;
        }
        Ok(purged)
    }

    /// Acquire a connection and open a write transaction on it.
    async fn begin(&self) -> Result<PoolConnection<Sqlite>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(conn)
    }
}

/// Commit on success, roll back on failure.
async fn finish<T>(conn: &mut SqliteConnection, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            sqlx::query("COMMIT")
                .execute(&mut *conn)
                .await
                .map_err(map_sqlx_error)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

/// Parse a stored value; `None` when it is not a JSON array of strings.
fn decode(raw: &str) -> Option<Vec<String>> {
    serde_json::from_str::<Vec<String>>(raw).ok()
}

/// Stored items re-normalized; items that no longer parse are skipped.
fn revalidate(key: &RequesterKey, items: Vec<String>) -> LinkSet {
    let (set, dropped) = LinkSet::from_stored(items);
    if dropped > 0 {
        warn!(requester = %key, dropped, "Dropped queued links that no longer normalize");
    }
    set
}

/// Current queue for `key`, dropping a malformed row in place.
async fn load(conn: &mut SqliteConnection, key: &RequesterKey) -> Result<LinkSet> {
    let raw: Option<String> =
        sqlx::query_scalar("SELECT urls FROM link_queue WHERE requester_key = ?")
            .bind(key.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

    let Some(raw) = raw else {
        return Ok(LinkSet::new());
    };

    match decode(&raw) {
        Some(items) => Ok(revalidate(key, items)),
        None => {
            warn!(requester = %key, "Queue entry is malformed, discarding it");
            delete(conn, key).await?;
            Ok(LinkSet::new())
        }
    }
}

async fn save(conn: &mut SqliteConnection, key: &RequesterKey, links: &LinkSet, now: i64) -> Result<()> {
    if links.is_empty() {
        return delete(conn, key).await;
    }
    let urls = serde_json::to_string(&links.to_strings())?;
    sqlx::query(
        r#"
        INSERT INTO link_queue (requester_key, urls, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(requester_key) DO UPDATE SET urls = excluded.urls, updated_at = excluded.updated_at
        "#,
    )
    .bind(key.as_str())
    .bind(&urls)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

async fn delete(conn: &mut SqliteConnection, key: &RequesterKey) -> Result<()> {
    sqlx::query("DELETE FROM link_queue WHERE requester_key = ?")
        .bind(key.as_str())
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn add(&self, key: &RequesterKey, urls: &[NormalizedUrl]) -> Result<AddOutcome> {
        let _guard = self.locks.lock(key).await;
        let now = self.time_provider.now_millis();
        let mut conn = self.begin().await?;

        let result: Result<AddOutcome> = async {
            let mut links = load(&mut conn, key).await?;
            let added = links.extend(urls.iter().cloned());
            if added > 0 {
                save(&mut conn, key, &links, now).await?;
            }
            Ok(AddOutcome {
                added,
                total: links.len(),
            })
        }
        .await;

        let outcome = finish(&mut conn, result).await?;
        debug!(requester = %key, added = outcome.added, total = outcome.total, "Links queued");
        Ok(outcome)
    }

    async fn list(&self, key: &RequesterKey) -> Result<LinkSet> {
        let _guard = self.locks.lock(key).await;

        // Plain read first; the write lock is only needed to discard a malformed row
        let raw: Option<String> =
            sqlx::query_scalar("SELECT urls FROM link_queue WHERE requester_key = ?")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        match raw.as_deref().map(decode) {
            None => return Ok(LinkSet::new()),
            Some(Some(items)) => return Ok(revalidate(key, items)),
            Some(None) => {}
        }

        let mut conn = self.begin().await?;
        let result = load(&mut conn, key).await;
        finish(&mut conn, result).await
    }

    async fn clear(&self, key: &RequesterKey) -> Result<()> {
        let _guard = self.locks.lock(key).await;
        let mut conn = self.begin().await?;
        let result = delete(&mut conn, key).await;
        finish(&mut conn, result).await?;
        debug!(requester = %key, "Queue cleared");
        Ok(())
    }

    async fn take(&self, key: &RequesterKey, retain: bool) -> Result<LinkSet> {
        let _guard = self.locks.lock(key).await;
        let mut conn = self.begin().await?;

        let result: Result<LinkSet> = async {
            let links = load(&mut conn, key).await?;
            if !retain && !links.is_empty() {
                delete(&mut conn, key).await?;
            }
            Ok(links)
        }
        .await;

        finish(&mut conn, result).await
    }
}
