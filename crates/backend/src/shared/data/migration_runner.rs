use sqlx::sqlite::SqlitePool;
use std::path::PathBuf;

fn candidate_migrations_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.join("migrations"));
        }
    }

    dirs.push(PathBuf::from("migrations"));
    dirs.push(PathBuf::from("../../migrations"));
    dirs.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../migrations"));

    dirs
}

async fn count_applied(pool: &SqlitePool) -> anyhow::Result<i64> {
    let has_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if has_table == 0 {
        return Ok(0);
    }
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;
    Ok(applied)
}

/// Применяет SQL-миграции из каталога `migrations/`
pub async fn run_migrations(db_url: &str) -> anyhow::Result<()> {
    let pool = SqlitePool::connect(db_url).await?;

    let migrations_dir = candidate_migrations_dirs()
        .into_iter()
        .find(|p| p.exists() && p.is_dir())
        .ok_or_else(|| anyhow::anyhow!("migrations directory not found"))?;

    tracing::info!("Using migrations directory: {}", migrations_dir.display());

    let before = count_applied(&pool).await?;
    let migrator = sqlx::migrate::Migrator::new(migrations_dir.as_path()).await?;
    migrator.run(&pool).await?;
    let after = count_applied(&pool).await?;

    tracing::info!(
        "Database migrations applied ({} new, {} total)",
        after - before,
        after
    );
    pool.close().await;
    Ok(())
}
