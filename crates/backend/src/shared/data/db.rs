use once_cell::sync::OnceCell;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;

use super::migration_runner;

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

/// sqlite URL для файла БД (учитывает Windows-пути вида C:/...)
pub fn build_sqlite_url(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    format!("sqlite://{}{}?mode=rwc", prefix, normalized)
}

/// Открывает БД, применяет миграции и сохраняет глобальное подключение.
/// Повторный вызов после успешной инициализации ничего не делает.
pub async fn initialize_database(db_file: &Path) -> anyhow::Result<()> {
    if DB_CONN.get().is_some() {
        tracing::debug!("Database already initialized");
        return Ok(());
    }

    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_file.is_absolute() {
        db_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_file)
    };
    let db_url = build_sqlite_url(&absolute_path);

    migration_runner::run_migrations(&db_url).await?;

    let mut options = ConnectOptions::new(db_url);
    options.sqlx_logging(false);
    let conn = Database::connect(options).await?;

    if DB_CONN.set(conn).is_err() {
        tracing::warn!("Database connection was initialized concurrently");
    }
    tracing::info!("Database ready: {}", absolute_path.display());
    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}
