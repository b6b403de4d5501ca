use blog_backend::db::{self, ArticleChanges, ArticleStatus, Engagement, NewArticle};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// File-backed pool with several connections, so transactions really overlap.
async fn file_pool() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("blog.db").display());

    let pool = db::connect(&url).await.unwrap();
    db::prepare_db(&pool).await.unwrap();
    (dir, pool)
}

async fn article(pool: &SqlitePool) -> String {
    db::insert_article(
        pool,
        "admin",
        NewArticle {
            title: "Send and Sync".into(),
            content: "body".into(),
            classify: "rust".into(),
            cover_img: String::new(),
            summary: String::new(),
            status: ArticleStatus::Draft,
        },
    )
    .await
    .unwrap()
    .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn overlapping_toggles_keep_counter_equal_to_rows() {
    let (_dir, pool) = file_pool().await;
    let article_id = article(&pool).await;

    // 40 users toggle five times each, so every one of them ends up liking.
    let tasks = (0..200).map(|i| {
        let pool = pool.clone();
        let article_id = article_id.clone();
        let user = format!("user-{}", i % 40);
        tokio::spawn(async move {
            db::toggle_engagement(&pool, Engagement::Like, &user, &article_id).await
        })
    });

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let rows = db::engagement_rows(&pool, Engagement::Like, &article_id)
        .await
        .unwrap();
    let article = db::retrieve_article(&pool, &article_id).await.unwrap();

    assert_eq!(rows, 40);
    assert_eq!(article.likes, rows);
    assert_eq!(db::reconcile_counters(&pool).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn article_updates_survive_concurrent_toggles() {
    let (_dir, pool) = file_pool().await;
    let article_id = article(&pool).await;

    let tasks = (0..100).map(|i| {
        let pool = pool.clone();
        let article_id = article_id.clone();
        tokio::spawn(async move {
            if i % 2 == 0 {
                let status = if i % 4 == 0 {
                    ArticleStatus::Published
                } else {
                    ArticleStatus::Draft
                };
                let changes = ArticleChanges {
                    status: Some(status),
                    ..Default::default()
                };
                db::update_article(&pool, &article_id, changes)
                    .await
                    .map(|_| ())
            } else {
                db::toggle_engagement(&pool, Engagement::Favorite, &format!("u{i}"), &article_id)
                    .await
                    .map(|_| ())
            }
        })
    });

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let rows = db::engagement_rows(&pool, Engagement::Favorite, &article_id)
        .await
        .unwrap();
    let article = db::retrieve_article(&pool, &article_id).await.unwrap();

    assert_eq!(rows, 50);
    assert_eq!(article.favorites, rows);
}
