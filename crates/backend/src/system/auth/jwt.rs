use anyhow::{Context, Result};
use chrono::Utc;
use contracts::system::auth::TokenClaims;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::OnceCell;
use rand::Rng;

use crate::shared::data::db::get_connection;

const ACCESS_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Секрет из config.toml; если не задан, используется sys_settings
static CONFIGURED_SECRET: OnceCell<String> = OnceCell::new();

pub fn configure_secret(secret: &str) {
    if secret.trim().is_empty() {
        return;
    }
    if CONFIGURED_SECRET.set(secret.to_string()).is_err() {
        tracing::debug!("JWT secret already configured");
    }
}

/// Issue an access token. Tokens are normally issued by the auth service;
/// this is used by tooling and integration tests.
pub async fn generate_access_token(
    user_id: &str,
    username: &str,
    role: &str,
    perms: Vec<String>,
) -> Result<String> {
    let now = Utc::now();
    let exp = (now + chrono::Duration::hours(ACCESS_TOKEN_LIFETIME_HOURS)).timestamp() as usize;
    let iat = now.timestamp() as usize;

    let claims = TokenClaims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role: role.to_string(),
        perms,
        exp,
        iat,
    };

    let secret = get_jwt_secret().await?;
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to encode JWT token")
}

/// Validate JWT token and extract claims
pub async fn validate_token(token: &str) -> Result<TokenClaims> {
    let secret = get_jwt_secret().await?;

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("Failed to decode JWT token")?;

    Ok(token_data.claims)
}

pub async fn get_jwt_secret() -> Result<String> {
    if let Some(secret) = CONFIGURED_SECRET.get() {
        return Ok(secret.clone());
    }
    match get_jwt_secret_from_db().await {
        Ok(Some(secret)) => Ok(secret),
        Ok(None) | Err(_) => {
            let secret = generate_jwt_secret();
            save_jwt_secret_to_db(&secret).await?;
            tracing::info!("Generated new JWT secret in sys_settings");
            Ok(secret)
        }
    }
}

/// 256-битный случайный секрет в base64
fn generate_jwt_secret() -> String {
    use base64::{engine::general_purpose, Engine as _};
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen::<u8>()).collect();
    general_purpose::STANDARD.encode(&random_bytes)
}

async fn get_jwt_secret_from_db() -> Result<Option<String>> {
    use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

    let row = get_connection()
        .query_one(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT value FROM sys_settings WHERE key = ?",
            ["jwt_secret".into()],
        ))
        .await?;

    match row {
        Some(row) => Ok(Some(row.try_get("", "value")?)),
        None => Ok(None),
    }
}

async fn save_jwt_secret_to_db(secret: &str) -> Result<()> {
    use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

    let now = Utc::now().to_rfc3339();
    get_connection()
        .execute(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "INSERT OR REPLACE INTO sys_settings (key, value, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            [
                "jwt_secret".into(),
                secret.to_string().into(),
                "Auto-generated JWT secret for authentication".into(),
                now.clone().into(),
                now.into(),
            ],
        ))
        .await?;
    Ok(())
}
