use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppResult, DBError};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: String,
    pub email: String,
    pub active: bool,
    #[serde(skip)]
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Created,
    Reactivated,
}

/// Subscribes `email`. The unique email constraint decides between a new row
/// and an existing one; an existing inactive row is switched back on.
pub async fn subscribe(pool: &SqlitePool, email: &str) -> AppResult<Subscription> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO subscribers (id, email, active, token, created_at, updated_at)
        VALUES (?, ?, 1, ?, ?, ?)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(uuid::Uuid::new_v4().simple().to_string())
    .bind(email)
    .bind(uuid::Uuid::new_v4().simple().to_string())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted == 1 {
        tx.commit().await?;
        return Ok(Subscription::Created);
    }

    let reactivated =
        sqlx::query("UPDATE subscribers SET active = 1, updated_at = ? WHERE email = ? AND active = 0")
            .bind(now)
            .bind(email)
            .execute(&mut *tx)
            .await?
            .rows_affected();

    tx.commit().await?;

    match reactivated {
        0 => Err(DBError::AlreadySubscribed.into()),
        _ => Ok(Subscription::Reactivated),
    }
}

/// Deactivates the subscriber owning `token` and returns it.
pub async fn unsubscribe(pool: &SqlitePool, token: &str) -> AppResult<Subscriber> {
    let subscriber = find_subscriber_by_token(pool, token)
        .await?
        .ok_or(DBError::InvalidUnsubscribeToken)?;

    let updated =
        sqlx::query("UPDATE subscribers SET active = 0, updated_at = ? WHERE token = ? AND active = 1")
            .bind(Utc::now())
            .bind(token)
            .execute(pool)
            .await?
            .rows_affected();

    match updated {
        0 => Err(DBError::AlreadyUnsubscribed.into()),
        _ => Ok(subscriber),
    }
}

pub async fn find_subscriber_by_token(
    pool: &SqlitePool,
    token: &str,
) -> AppResult<Option<Subscriber>> {
    Ok(
        sqlx::query_as::<_, Subscriber>("SELECT * FROM subscribers WHERE token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn find_subscriber_by_email(
    pool: &SqlitePool,
    email: &str,
) -> AppResult<Option<Subscriber>> {
    Ok(
        sqlx::query_as::<_, Subscriber>("SELECT * FROM subscribers WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn active_subscribers(pool: &SqlitePool) -> AppResult<Vec<Subscriber>> {
    Ok(sqlx::query_as::<_, Subscriber>(
        "SELECT * FROM subscribers WHERE active = 1 ORDER BY created_at, rowid",
    )
    .fetch_all(pool)
    .await?)
}
