use anyhow::Context;
use chrono::Utc;
use contracts::domain::a001_user::aggregate::{User, UserRole};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

use super::repository::{self, NewUser};
use crate::system::auth::password;

/// Пользователь, созданный импортом, вместе с временным паролем
pub struct CreatedUser {
    pub user: User,
    pub temporary_password: String,
}

/// Простая проверка формата email: одна `@`, непустая локальная часть, домен с точкой
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

/// Создаёт пользователя с временным паролем (argon2)
pub async fn create_imported_user<C: ConnectionTrait>(
    db: &C,
    name: String,
    surname: Option<String>,
    email: String,
    role: UserRole,
    parent_user_id: Option<String>,
    import_session_id: i32,
) -> anyhow::Result<CreatedUser> {
    let temporary_password = password::generate_password();
    let password_hash = password::hash_password(&temporary_password)?;

    let user = repository::insert(
        db,
        NewUser {
            name,
            surname,
            email,
            role,
            parent_user_id,
            password_hash,
            import_session_id: Some(import_session_id),
        },
    )
    .await
    .context("Failed to insert user")?;

    Ok(CreatedUser {
        user,
        temporary_password,
    })
}

/// Ставит приветственное письмо в очередь sys_email_outbox
pub async fn queue_welcome_email<C: ConnectionTrait>(
    db: &C,
    created: &CreatedUser,
    import_session_id: i32,
) -> anyhow::Result<()> {
    let body = format!(
        "Hello {},\n\nAn account was created for you.\nLogin: {}\nTemporary password: {}\n\nPlease change it after the first sign-in.",
        created.user.display_name(),
        created.user.email,
        created.temporary_password
    );

    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO sys_email_outbox (recipient, subject, body, import_session_id, created_at)
         VALUES (?, ?, ?, ?, ?)",
        [
            created.user.email.clone().into(),
            "Welcome to SalesApp".into(),
            body.into(),
            import_session_id.into(),
            Utc::now().to_rfc3339().into(),
        ],
    ))
    .await
    .context("Failed to queue welcome email")?;

    tracing::debug!("Queued welcome email for {}", created.user.email);
    Ok(())
}
