// Migration Runner

use sqlx::SqlitePool;
use tracing::info;
use wwa_core::error::{AppError, Result};

fn db_err(e: sqlx::Error) -> AppError {
    AppError::Database(e.to_string())
}

/// Ordered schema migrations: (version, label, SQL)
const MIGRATIONS: &[(i64, &str, &str)] = &[(
    1,
    "link queue",
    include_str!("../migrations/001_link_queue.sql"),
)];

/// Bring the queue schema up to the latest version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current = current_version(pool).await?;
    info!(current_version = current, "Checking queue schema");

    for (version, label, sql) in MIGRATIONS.iter().filter(|(v, _, _)| *v > current) {
        info!(version, label, "Applying migration");
        apply_migration(pool, sql).await?;
    }
    Ok(())
}

async fn current_version(pool: &SqlitePool) -> Result<i64> {
    let has_table: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
    )
    .fetch_one(pool)
    .await
    .map_err(db_err)?;
    if !has_table {
        return Ok(0);
    }

    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(db_err)?;
    Ok(version.unwrap_or(0))
}

/// Statements run in one transaction; `--` comment lines are skipped.
async fn apply_migration(pool: &SqlitePool, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(db_err)?;

    let statements = sql.split(';').map(|chunk| {
        chunk
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n")
    });
    for statement in statements {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
    }

    tx.commit().await.map_err(db_err)
}
