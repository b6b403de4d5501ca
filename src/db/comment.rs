use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::{
    error::{AppResult, DBError},
    utils::auth::Session,
};

use super::{find_article, upsert_user};

const SELECT_COMMENT: &str = r#"
    SELECT
        comments.id,
        comments.content,
        comments.article_id,
        comments.parent_id,
        comments.created_at,
        comments.updated_at,
        comments.author_id,
        users.name AS author_name,
        users.image AS author_image
    FROM comments
    LEFT JOIN users ON users.id = comments.author_id
"#;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub article_id: String,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub author: CommentAuthor,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommentAuthor {
    #[sqlx(rename = "author_id")]
    pub id: String,
    #[sqlx(rename = "author_name")]
    pub name: Option<String>,
    #[sqlx(rename = "author_image")]
    pub image: Option<String>,
}

/// Ownership and visibility of a comment, enough to authorize a delete.
#[derive(Debug, Clone, FromRow)]
pub struct CommentOwner {
    pub author_id: String,
    pub is_deleted: bool,
}

pub async fn list_comments(pool: &SqlitePool, article_id: &str) -> AppResult<Vec<Comment>> {
    let query = format!(
        "{SELECT_COMMENT} WHERE comments.article_id = ? AND comments.is_deleted = 0 \
         ORDER BY comments.created_at DESC, comments.rowid DESC"
    );

    Ok(sqlx::query_as::<_, Comment>(&query)
        .bind(article_id)
        .fetch_all(pool)
        .await?)
}

pub async fn insert_comment(
    pool: &SqlitePool,
    author: &Session,
    article_id: &str,
    content: &str,
    parent_id: Option<&str>,
) -> AppResult<Comment> {
    if find_article(pool, article_id).await?.is_none() {
        return Err(DBError::ArticleNotFound.into());
    }

    upsert_user(pool, author).await?;

    let id = uuid::Uuid::new_v4().simple().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO comments (id, content, article_id, author_id, parent_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(content)
    .bind(article_id)
    .bind(&author.user_id)
    .bind(parent_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let query = format!("{SELECT_COMMENT} WHERE comments.id = ?");
    Ok(sqlx::query_as::<_, Comment>(&query)
        .bind(&id)
        .fetch_one(pool)
        .await?)
}

pub async fn find_comment_owner(pool: &SqlitePool, id: &str) -> AppResult<Option<CommentOwner>> {
    Ok(sqlx::query_as::<_, CommentOwner>(
        "SELECT author_id, is_deleted FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

/// Hides a comment. The row stays for history.
pub async fn soft_delete_comment(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let now = Utc::now();

    let updated = sqlx::query(
        r#"
        UPDATE comments
        SET is_deleted = 1, deleted_at = ?, updated_at = ?
        WHERE id = ? AND is_deleted = 0
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    match updated {
        0 => Err(DBError::CommentNotFound.into()),
        _ => Ok(()),
    }
}
