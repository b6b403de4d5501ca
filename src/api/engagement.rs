use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::{
    db::{self, Engagement, EngagementState},
    error::AppResult,
    utils::auth::{self, AuthHeader},
};

use super::{reply, required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleQuery {
    #[serde(default)]
    article_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    #[serde(default)]
    article_id: Option<String>,
}

// GET /api/articles/likes
pub async fn get_likes(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    query: Result<Query<ArticleQuery>, QueryRejection>,
    token: AuthHeader,
) -> AppResult<Json<Value>> {
    let Query(query) = query?;
    status(Engagement::Like, &pool, &key, query, token).await
}

// POST /api/articles/likes
pub async fn toggle_like(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    token: AuthHeader,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    toggle(Engagement::Like, &pool, &key, token, payload).await
}

// GET /api/articles/favorites
pub async fn get_favorites(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    query: Result<Query<ArticleQuery>, QueryRejection>,
    token: AuthHeader,
) -> AppResult<Json<Value>> {
    let Query(query) = query?;
    status(Engagement::Favorite, &pool, &key, query, token).await
}

// POST /api/articles/favorites
pub async fn toggle_favorite(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    token: AuthHeader,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    toggle(Engagement::Favorite, &pool, &key, token, payload).await
}

async fn status(
    kind: Engagement,
    pool: &SqlitePool,
    key: &DecodingKey,
    query: ArticleQuery,
    token: AuthHeader,
) -> AppResult<Json<Value>> {
    let article_id = required(query.article_id, "Article id is required")?;
    let session = auth::optional_session(token, key)?;

    let state = db::engagement_status(
        pool,
        kind,
        session.as_ref().map(|s| s.user_id.as_str()),
        &article_id,
    )
    .await?;

    Ok(reply(body(kind, state, false)))
}

async fn toggle(
    kind: Engagement,
    pool: &SqlitePool,
    key: &DecodingKey,
    token: AuthHeader,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    // No store access before the caller is known.
    let session = auth::require_session(token, key)?;
    let Json(request) = payload?;
    let article_id = required(request.article_id, "Article id is required")?;

    let state = db::toggle_engagement(pool, kind, &session.user_id, &article_id).await?;
    info!(
        user_id = %session.user_id,
        article_id = %article_id,
        action = kind.action(state.active),
        count = state.count,
        "engagement changed"
    );

    Ok(reply(body(kind, state, true)))
}

fn body(kind: Engagement, state: EngagementState, with_action: bool) -> Value {
    let mut body = match kind {
        Engagement::Like => json!({ "isLiked": state.active, "count": state.count }),
        Engagement::Favorite => json!({ "isFavorited": state.active, "count": state.count }),
    };

    if with_action {
        body["action"] = json!(kind.action(state.active));
    }
    body
}
