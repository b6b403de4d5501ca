use chrono::Utc;
use sqlx::SqlitePool;

use crate::{error::AppResult, utils::auth::Session};

/// Refreshes the cached profile for the session's user. Empty claims keep the
/// stored name and image.
pub async fn upsert_user(pool: &SqlitePool, session: &Session) -> AppResult<()> {
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users (id, name, image, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            name = COALESCE(excluded.name, users.name),
            image = COALESCE(excluded.image, users.image),
            role = excluded.role,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&session.user_id)
    .bind(&session.name)
    .bind(&session.image)
    .bind(session.role.as_code())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}
