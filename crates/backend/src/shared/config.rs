use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "target/db/salesapp.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Пустая строка означает "взять секрет из sys_settings"
    #[serde(default)]
    pub jwt_secret: String,
}

/// Лимиты мастера импорта
#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    #[serde(default = "default_validation_row_cap")]
    pub validation_row_cap: usize,
}

fn default_max_rows() -> usize {
    100_000
}

fn default_chunk_size() -> usize {
    500
}

fn default_preview_rows() -> usize {
    5
}

fn default_validation_row_cap() -> usize {
    5_000
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            chunk_size: default_chunk_size(),
            preview_rows: default_preview_rows(),
            validation_row_cap: default_validation_row_cap(),
        }
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/salesapp.db"

[server]
port = 3000
"#;

/// Load configuration.
///
/// Search order:
/// 1. `SALESAPP_CONFIG` environment variable
/// 2. config.toml next to the executable
/// 3. embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    if let Ok(explicit) = std::env::var("SALESAPP_CONFIG") {
        tracing::info!("Loading config from SALESAPP_CONFIG: {}", explicit);
        return load_config_from(Path::new(&explicit));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");
            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                return load_config_from(&config_path);
            }
            tracing::warn!("config.toml not found at: {}", config_path.display());
        }
    }

    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

/// Get the database file path from configuration.
/// Relative paths resolve against the executable directory.
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    Ok(PathBuf::from(db_path_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config: Result<Config, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config.database.path, "target/db/salesapp.db");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.import.max_rows, 100_000);
        assert_eq!(config.import.chunk_size, 500);
        assert!(config.auth.jwt_secret.is_empty());
    }

    #[test]
    fn test_partial_import_section() {
        let config: Config = toml::from_str(
            r#"
            [database]
            path = "/tmp/x.db"

            [import]
            max_rows = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.import.max_rows, 10);
        assert_eq!(config.import.preview_rows, 5);
        assert_eq!(config.import.validation_row_cap, 5_000);
    }
}
