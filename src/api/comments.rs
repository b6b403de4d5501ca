use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::info;
use validator::Validate;

use crate::{
    db,
    error::{AppError, AppResult, DBError},
    utils::auth::{self, AuthHeader},
};

use super::{reply, reply_msg, required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsQuery {
    #[serde(default)]
    article_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddComment {
    #[serde(default)]
    article_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000, message = "comment is too long"))]
    content: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteComment {
    #[serde(default)]
    id: Option<String>,
}

// GET /api/articles/comments
pub async fn get_comments(
    State(pool): State<SqlitePool>,
    query: Result<Query<CommentsQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let Query(query) = query?;
    let article_id = required(query.article_id, "Article id is required")?;

    let comments = db::list_comments(&pool, &article_id).await?;
    Ok(reply(comments))
}

// POST /api/articles/comments
pub async fn create_comment(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    token: AuthHeader,
    payload: Result<Json<AddComment>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let session = auth::require_session(token, &key)?;
    let Json(comment) = payload?;
    comment.validate()?;

    let article_id = required(comment.article_id, "Article id and content are required")?;
    let content = required(comment.content, "Article id and content are required")?;
    let parent_id = comment.parent_id.filter(|id| !id.is_empty());

    let comment = db::insert_comment(
        &pool,
        &session,
        &article_id,
        &content,
        parent_id.as_deref(),
    )
    .await?;

    info!(comment_id = %comment.id, article_id = %article_id, "comment added");
    Ok(reply(comment))
}

// DELETE /api/articles/comments
pub async fn delete_comment(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    token: AuthHeader,
    payload: Result<Json<DeleteComment>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let session = auth::require_session(token, &key)?;
    let Json(request) = payload?;
    let id = required(request.id, "Comment id is required")?;

    let owner = db::find_comment_owner(&pool, &id)
        .await?
        .filter(|owner| !owner.is_deleted)
        .ok_or(DBError::CommentNotFound)?;

    if owner.author_id != session.user_id && !session.is_admin() {
        return Err(AppError::Forbidden("You are not allowed to delete this comment"));
    }

    db::soft_delete_comment(&pool, &id).await?;
    info!(comment_id = %id, by = %session.user_id, "comment deleted");

    Ok(reply_msg("Comment deleted", Value::Null))
}
