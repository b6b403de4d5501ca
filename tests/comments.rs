mod common;

use axum::http::{Method, StatusCode};
use blog_backend::db::ArticleStatus;
use serde_json::json;

use common::{admin, member, TestApp};

async fn comment(app: &TestApp, token: &str, article_id: &str, content: &str) -> String {
    let (status, body) = app
        .post(
            "/api/articles/comments",
            Some(token),
            json!({ "articleId": article_id, "content": content }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn delete(app: &TestApp, token: &str, id: &str) -> (StatusCode, serde_json::Value) {
    app.request(
        Method::DELETE,
        "/api/articles/comments",
        Some(token),
        Some(json!({ "id": id })),
    )
    .await
}

#[tokio::test]
async fn only_the_author_deletes_their_comment() {
    let app = TestApp::new().await;
    let article_id = app.article("Closures", ArticleStatus::Published).await;
    let author = member("author");
    let id = comment(&app, &author, &article_id, "nice post").await;

    let (status, body) = delete(&app, &member("stranger"), &id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);

    let uri = format!("/api/articles/comments?articleId={article_id}");
    let (_, listed) = app.get(&uri, None).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["author"]["id"], "author");

    let (status, body) = delete(&app, &author, &id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Comment deleted");

    let (_, listed) = app.get(&uri, None).await;
    assert!(listed["data"].as_array().unwrap().is_empty());

    let (status, _) = delete(&app, &author, &id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admins_may_delete_any_comment() {
    let app = TestApp::new().await;
    let article_id = app.article("Macros", ArticleStatus::Published).await;
    let id = comment(&app, &member("author"), &article_id, "spam").await;

    let (status, _) = delete(&app, &admin(), &id).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn commenting_requires_a_session_and_content() {
    let app = TestApp::new().await;
    let article_id = app.article("Generics", ArticleStatus::Published).await;

    let (status, body) = app
        .post(
            "/api/articles/comments",
            None,
            json!({ "articleId": article_id, "content": "hi" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);

    let (status, body) = app
        .post(
            "/api/articles/comments",
            Some(&member("u1")),
            json!({ "articleId": article_id, "content": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], -1);

    let (status, _) = app
        .post(
            "/api/articles/comments",
            Some(&member("u1")),
            json!({ "articleId": "missing", "content": "hi" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_are_listed_newest_first() {
    let app = TestApp::new().await;
    let article_id = app.article("Iterators", ArticleStatus::Published).await;
    let reader = member("reader");

    comment(&app, &reader, &article_id, "first").await;
    comment(&app, &reader, &article_id, "second").await;

    let (_, listed) = app
        .get(&format!("/api/articles/comments?articleId={article_id}"), None)
        .await;
    let contents: Vec<_> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["second", "first"]);
}
