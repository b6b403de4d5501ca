use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::{AppResult, DBError};

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub classify: String,
    pub cover_img: String,
    pub summary: String,
    pub status: String,
    pub source: String,
    pub views: i64,
    pub likes: i64,
    pub favorites: i64,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn is_published(&self) -> bool {
        ArticleStatus::from_code(&self.status) == Some(ArticleStatus::Published)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArticleStatus {
    #[serde(rename = "00")]
    Draft,
    #[serde(rename = "01")]
    Published,
}

impl ArticleStatus {
    pub fn as_code(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "00",
            ArticleStatus::Published => "01",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "00" => Some(ArticleStatus::Draft),
            "01" => Some(ArticleStatus::Published),
            _ => None,
        }
    }
}

/// Where an article came from. Synced articles are imported from an external
/// platform and never written through this API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArticleSource {
    #[serde(rename = "00")]
    Original,
    #[serde(rename = "01")]
    Synced,
}

impl ArticleSource {
    pub fn as_code(&self) -> &'static str {
        match self {
            ArticleSource::Original => "00",
            ArticleSource::Synced => "01",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub classify: String,
    pub cover_img: String,
    pub summary: String,
    pub status: ArticleStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub classify: Option<String>,
    pub cover_img: Option<String>,
    pub summary: Option<String>,
    pub status: Option<ArticleStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub search_term: String,
    pub status: Option<String>,
    pub classify: Option<String>,
    pub source: Option<String>,
    pub page: i64,
    pub page_size: i64,
}

impl ArticleFilter {
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.page_size())
    }
}

pub async fn insert_article(
    pool: &SqlitePool,
    author_id: &str,
    article: NewArticle,
) -> AppResult<Article> {
    let id = uuid::Uuid::new_v4().simple().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO articles
            (id, title, content, classify, cover_img, summary, status, source, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.classify)
    .bind(&article.cover_img)
    .bind(&article.summary)
    .bind(article.status.as_code())
    .bind(ArticleSource::Original.as_code())
    .bind(author_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    retrieve_article(pool, &id).await
}

pub async fn find_article(pool: &SqlitePool, id: &str) -> AppResult<Option<Article>> {
    Ok(
        sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn retrieve_article(pool: &SqlitePool, id: &str) -> AppResult<Article> {
    find_article(pool, id)
        .await?
        .ok_or_else(|| DBError::ArticleNotFound.into())
}

/// Applies a partial update and returns the article as it was before and after.
pub async fn update_article(
    pool: &SqlitePool,
    id: &str,
    changes: ArticleChanges,
) -> AppResult<(Article, Article)> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    // Write first so the transaction holds the write lock before reading.
    let touched = sqlx::query("UPDATE articles SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if touched == 0 {
        return Err(DBError::ArticleNotFound.into());
    }

    let before = sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        UPDATE articles
        SET title = COALESCE(?, title),
            content = COALESCE(?, content),
            classify = COALESCE(?, classify),
            cover_img = COALESCE(?, cover_img),
            summary = COALESCE(?, summary),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(changes.title)
    .bind(changes.content)
    .bind(changes.classify)
    .bind(changes.cover_img)
    .bind(changes.summary)
    .bind(changes.status.map(|status| status.as_code()))
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let after = sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((before, after))
}

/// Bumps the view counter and returns the article with the new count.
pub async fn record_view(pool: &SqlitePool, id: &str) -> AppResult<Article> {
    let updated = sqlx::query("UPDATE articles SET views = views + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(DBError::ArticleNotFound.into());
    }

    retrieve_article(pool, id).await
}

pub async fn all_articles(pool: &SqlitePool) -> AppResult<Vec<Article>> {
    Ok(sqlx::query_as::<_, Article>(
        "SELECT * FROM articles ORDER BY created_at DESC, rowid DESC",
    )
    .fetch_all(pool)
    .await?)
}

/// One page of articles matching `filter`, plus the total match count.
pub async fn list_articles(
    pool: &SqlitePool,
    filter: &ArticleFilter,
) -> AppResult<(Vec<Article>, i64)> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM articles");
    push_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM articles");
    push_filters(&mut select, filter);
    select
        .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
        .push_bind(filter.page_size())
        .push(" OFFSET ")
        .push_bind(filter.offset());

    let articles = select.build_query_as::<Article>().fetch_all(pool).await?;
    Ok((articles, total))
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ArticleFilter) {
    builder
        .push(" WHERE title LIKE ")
        .push_bind(format!("%{}%", escape_like(&filter.search_term)))
        .push(" ESCAPE '\\'");

    if let Some(status) = &filter.status {
        builder.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(classify) = &filter.classify {
        builder.push(" AND classify = ").push_bind(classify.clone());
    }
    if let Some(source) = &filter.source {
        builder.push(" AND source = ").push_bind(source.clone());
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("rust"), "rust");
    }

    #[test]
    fn paging_is_clamped() {
        let filter = ArticleFilter {
            page: 0,
            page_size: 1000,
            ..Default::default()
        };

        assert_eq!(filter.page(), 1);
        assert_eq!(filter.page_size(), MAX_PAGE_SIZE);
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn huge_page_saturates_offset() {
        let filter = ArticleFilter {
            page: i64::MAX,
            page_size: 10,
            ..Default::default()
        };

        assert_eq!(filter.offset(), i64::MAX);
    }
}
