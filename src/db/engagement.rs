//! Likes and favorites. The relation row is the truth; the counter on
//! `articles` follows it inside the same transaction.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{AppResult, DBError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    Like,
    Favorite,
}

struct RelationSql {
    remove: &'static str,
    insert: &'static str,
    adjust: &'static str,
    counter: &'static str,
    member: &'static str,
    rows: &'static str,
    reconcile: &'static str,
}

static LIKE_SQL: RelationSql = RelationSql {
    remove: "DELETE FROM user_likes WHERE user_id = ? AND article_id = ?",
    insert: "INSERT INTO user_likes (user_id, article_id, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, article_id) DO NOTHING",
    adjust: "UPDATE articles SET likes = likes + ? WHERE id = ?",
    counter: "SELECT likes FROM articles WHERE id = ?",
    member: "SELECT COUNT(*) FROM user_likes WHERE user_id = ? AND article_id = ?",
    rows: "SELECT COUNT(*) FROM user_likes WHERE article_id = ?",
    reconcile: "UPDATE articles \
                SET likes = (SELECT COUNT(*) FROM user_likes WHERE article_id = articles.id) \
                WHERE likes != (SELECT COUNT(*) FROM user_likes WHERE article_id = articles.id)",
};

static FAVORITE_SQL: RelationSql = RelationSql {
    remove: "DELETE FROM user_favorites WHERE user_id = ? AND article_id = ?",
    insert: "INSERT INTO user_favorites (user_id, article_id, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, article_id) DO NOTHING",
    adjust: "UPDATE articles SET favorites = favorites + ? WHERE id = ?",
    counter: "SELECT favorites FROM articles WHERE id = ?",
    member: "SELECT COUNT(*) FROM user_favorites WHERE user_id = ? AND article_id = ?",
    rows: "SELECT COUNT(*) FROM user_favorites WHERE article_id = ?",
    reconcile: "UPDATE articles \
                SET favorites = (SELECT COUNT(*) FROM user_favorites WHERE article_id = articles.id) \
                WHERE favorites != (SELECT COUNT(*) FROM user_favorites WHERE article_id = articles.id)",
};

impl Engagement {
    pub const ALL: [Engagement; 2] = [Engagement::Like, Engagement::Favorite];

    fn sql(self) -> &'static RelationSql {
        match self {
            Engagement::Like => &LIKE_SQL,
            Engagement::Favorite => &FAVORITE_SQL,
        }
    }

    /// Name of the action that led to `active`.
    pub fn action(self, active: bool) -> &'static str {
        match (self, active) {
            (Engagement::Like, true) => "like",
            (Engagement::Like, false) => "unlike",
            (Engagement::Favorite, true) => "favorite",
            (Engagement::Favorite, false) => "unfavorite",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngagementState {
    pub active: bool,
    pub count: i64,
}

/// Flips the user's membership for `article_id` and returns the new state.
pub async fn toggle_engagement(
    pool: &SqlitePool,
    kind: Engagement,
    user_id: &str,
    article_id: &str,
) -> AppResult<EngagementState> {
    let sql = kind.sql();
    let mut tx = pool.begin().await?;

    // Write first so the transaction holds the write lock from here on.
    let removed = sqlx::query(sql.remove)
        .bind(user_id)
        .bind(article_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let exists = sqlx::query_scalar::<_, i64>(sql.counter)
        .bind(article_id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();

    if !exists {
        // dropping `tx` rolls back
        return Err(DBError::ArticleNotFound.into());
    }

    let (active, delta) = if removed > 0 {
        (false, -(removed as i64))
    } else {
        let inserted = sqlx::query(sql.insert)
            .bind(user_id)
            .bind(article_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // A concurrent insert that won the race already counted itself.
        (true, inserted as i64)
    };

    if delta != 0 {
        sqlx::query(sql.adjust)
            .bind(delta)
            .bind(article_id)
            .execute(&mut *tx)
            .await?;
    }

    let count = sqlx::query_scalar::<_, i64>(sql.counter)
        .bind(article_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::debug!(?kind, user_id, article_id, active, count, "engagement toggled");
    Ok(EngagementState { active, count })
}

/// Current membership and counter. Without a user the membership is `false`;
/// an unknown article reads as a zero count.
pub async fn engagement_status(
    pool: &SqlitePool,
    kind: Engagement,
    user_id: Option<&str>,
    article_id: &str,
) -> AppResult<EngagementState> {
    let sql = kind.sql();

    let count = sqlx::query_scalar::<_, i64>(sql.counter)
        .bind(article_id)
        .fetch_optional(pool)
        .await?
        .unwrap_or(0);

    let active = match user_id {
        Some(user_id) => {
            sqlx::query_scalar::<_, i64>(sql.member)
                .bind(user_id)
                .bind(article_id)
                .fetch_one(pool)
                .await?
                > 0
        }
        None => false,
    };

    Ok(EngagementState { active, count })
}

/// Number of relation rows pointing at `article_id`.
pub async fn engagement_rows(
    pool: &SqlitePool,
    kind: Engagement,
    article_id: &str,
) -> AppResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>(kind.sql().rows)
        .bind(article_id)
        .fetch_one(pool)
        .await?)
}

/// Rewrites every counter that disagrees with its relation table. Returns the
/// number of articles corrected.
pub async fn reconcile_counters(pool: &SqlitePool) -> AppResult<u64> {
    let mut fixed = 0;
    for kind in Engagement::ALL {
        fixed += sqlx::query(kind.sql().reconcile)
            .execute(pool)
            .await?
            .rows_affected();
    }
    Ok(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_in_memory, insert_article, prepare_db, ArticleStatus, NewArticle};

    async fn setup() -> (SqlitePool, String) {
        let pool = connect_in_memory().await.unwrap();
        prepare_db(&pool).await.unwrap();

        let article = insert_article(
            &pool,
            "admin",
            NewArticle {
                title: "Ownership".into(),
                content: "body".into(),
                classify: "rust".into(),
                cover_img: String::new(),
                summary: String::new(),
                status: ArticleStatus::Published,
            },
        )
        .await
        .unwrap();

        (pool, article.id)
    }

    #[tokio::test]
    async fn double_toggle_restores_state() {
        let (pool, article_id) = setup().await;

        let first = toggle_engagement(&pool, Engagement::Like, "u1", &article_id)
            .await
            .unwrap();
        assert_eq!(first, EngagementState { active: true, count: 1 });

        let second = toggle_engagement(&pool, Engagement::Like, "u1", &article_id)
            .await
            .unwrap();
        assert_eq!(second, EngagementState { active: false, count: 0 });
        assert_eq!(
            engagement_rows(&pool, Engagement::Like, &article_id)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn likes_and_favorites_are_independent() {
        let (pool, article_id) = setup().await;

        toggle_engagement(&pool, Engagement::Like, "u1", &article_id)
            .await
            .unwrap();
        let favorite = engagement_status(&pool, Engagement::Favorite, Some("u1"), &article_id)
            .await
            .unwrap();

        assert_eq!(favorite, EngagementState { active: false, count: 0 });
    }

    #[tokio::test]
    async fn unknown_article_is_not_found_and_leaves_no_row() {
        let (pool, _) = setup().await;

        let result = toggle_engagement(&pool, Engagement::Favorite, "u1", "missing").await;
        assert!(matches!(
            result,
            Err(crate::error::AppError::DBError(DBError::ArticleNotFound))
        ));
        assert_eq!(
            engagement_rows(&pool, Engagement::Favorite, "missing")
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn concurrent_toggles_keep_counter_in_sync() {
        let (pool, article_id) = setup().await;

        let tasks = (0..12).map(|i| {
            let pool = pool.clone();
            let article_id = article_id.clone();
            // users 0-3 toggle twice, users 4-7 once
            let user = format!("user-{}", i % 8);
            tokio::spawn(async move {
                toggle_engagement(&pool, Engagement::Like, &user, &article_id).await
            })
        });

        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let rows = engagement_rows(&pool, Engagement::Like, &article_id)
            .await
            .unwrap();
        let status = engagement_status(&pool, Engagement::Like, None, &article_id)
            .await
            .unwrap();

        assert_eq!(rows, 4);
        assert_eq!(status.count, rows);
    }

    #[tokio::test]
    async fn reconcile_repairs_drifted_counters() {
        let (pool, article_id) = setup().await;

        toggle_engagement(&pool, Engagement::Favorite, "u1", &article_id)
            .await
            .unwrap();
        sqlx::query("UPDATE articles SET favorites = 7, likes = 3 WHERE id = ?")
            .bind(&article_id)
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(reconcile_counters(&pool).await.unwrap(), 2);

        let favorites = engagement_status(&pool, Engagement::Favorite, None, &article_id)
            .await
            .unwrap();
        let likes = engagement_status(&pool, Engagement::Like, None, &article_id)
            .await
            .unwrap();
        assert_eq!(favorites.count, 1);
        assert_eq!(likes.count, 0);
    }
}
