use std::sync::Arc;

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
use tracing::{error, info};
use validator::Validate;

use crate::{
    config::NotifySettings,
    db::{self, Article, ArticleChanges, ArticleFilter, ArticleStatus, NewArticle},
    error::AppResult,
    mail::Mailer,
    notify,
    utils::auth::{self, AuthHeader},
};

use super::{notify::report_data, reply, reply_msg, required};

const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticle {
    #[serde(default)]
    #[validate(length(max = 200, message = "title is too long"))]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    classify: String,
    #[serde(default)]
    cover_img: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "summary is too long"))]
    summary: String,
    #[serde(default)]
    status: Option<ArticleStatus>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticle {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "title must be 1 to 200 characters"))]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    classify: Option<String>,
    #[serde(default)]
    cover_img: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "summary is too long"))]
    summary: Option<String>,
    #[serde(default)]
    status: Option<ArticleStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListArticlesQuery {
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    page_size: Option<i64>,
    #[serde(default)]
    search_term: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    classify: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    #[serde(default)]
    id: Option<String>,
}

// POST /api/articles/add
pub async fn create_article(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(mailer): State<Arc<dyn Mailer>>,
    State(settings): State<NotifySettings>,
    token: AuthHeader,
    payload: Result<Json<CreateArticle>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let session = auth::require_admin(token, &key)?;
    let Json(article) = payload?;
    article.validate()?;

    let title = required(article.title, "Title is required")?;
    let content = required(article.content, "Content is required")?;

    let article = db::insert_article(
        &pool,
        &session.user_id,
        NewArticle {
            title,
            content,
            classify: article.classify,
            cover_img: article.cover_img,
            summary: article.summary,
            status: article.status.unwrap_or(ArticleStatus::Published),
        },
    )
    .await?;
    info!(article_id = %article.id, status = %article.status, "article created");

    let notification = notify_if_published(&pool, mailer.as_ref(), &settings, false, &article).await;

    Ok(reply(json!({ "article": article, "notification": notification })))
}

// PUT /api/articles/update
pub async fn update_article(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(mailer): State<Arc<dyn Mailer>>,
    State(settings): State<NotifySettings>,
    token: AuthHeader,
    payload: Result<Json<UpdateArticle>, JsonRejection>,
) -> AppResult<Json<Value>> {
    auth::require_admin(token, &key)?;
    let Json(update) = payload?;
    update.validate()?;

    let id = required(update.id, "Article id is required")?;
    let changes = ArticleChanges {
        title: update.title,
        content: update.content,
        classify: update.classify,
        cover_img: update.cover_img,
        summary: update.summary,
        status: update.status,
    };

    let (before, after) = db::update_article(&pool, &id, changes).await?;
    info!(article_id = %id, status = %after.status, "article updated");

    let notification =
        notify_if_published(&pool, mailer.as_ref(), &settings, before.is_published(), &after).await;

    Ok(reply_msg(
        "Article updated",
        json!({ "article": after, "notification": notification }),
    ))
}

// GET /api/articles/list
pub async fn list_articles(
    State(pool): State<SqlitePool>,
    query: Result<Query<ListArticlesQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let Query(params) = query?;
    let filter = ArticleFilter {
        search_term: params.search_term.unwrap_or_default(),
        status: params.status.filter(|s| !s.is_empty()),
        classify: params.classify.filter(|s| !s.is_empty()),
        source: params.source.filter(|s| !s.is_empty()),
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };

    let (articles, total) = db::list_articles(&pool, &filter).await?;
    let page_size = filter.page_size();

    Ok(reply(json!({
        "articles": articles,
        "totalArticles": total,
        "currentPage": filter.page(),
        "totalPages": (total + page_size - 1) / page_size,
    })))
}

// GET /api/articles/all
pub async fn all_articles(State(pool): State<SqlitePool>) -> AppResult<Json<Value>> {
    let articles = db::all_articles(&pool).await?;
    Ok(reply(articles))
}

// GET /api/articles/details?id=
pub async fn get_article(
    State(pool): State<SqlitePool>,
    query: Result<Query<DetailsQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let Query(query) = query?;
    let id = required(query.id, "Article id is required")?;

    let article = db::record_view(&pool, &id).await?;
    Ok(reply(article))
}

/// Runs the subscriber fan-out when `article` has just become published.
/// The article change is already committed, so a failed fan-out is only
/// logged and reported as `null`.
async fn notify_if_published(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    settings: &NotifySettings,
    was_published: bool,
    article: &Article,
) -> Option<Value> {
    if !notify::is_publish_transition(was_published, article.is_published()) {
        return None;
    }

    match notify::announce_article(pool, mailer, settings, &article.id).await {
        Ok(report) => Some(report_data(&report)),
        Err(err) => {
            error!(article_id = %article.id, error = ?err, "article notification failed");
            None
        }
    }
}
