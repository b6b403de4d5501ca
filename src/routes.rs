use axum::{
    error_handling::HandleErrorLayer,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, StatusCode,
    },
    response::IntoResponse,
    routing::{get, post, put},
    BoxError, Json, Router,
};
use serde_json::json;
use std::time::Duration;
use tower::{buffer::BufferLayer, limit::RateLimitLayer, ServiceBuilder};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{api, AppState};

/// Bare API routes without middleware.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        // ==== ARTICLES ==== //
        .route("/api/articles/add", post(api::articles::create_article))
        .route("/api/articles/update", put(api::articles::update_article))
        .route("/api/articles/list", get(api::articles::list_articles))
        .route("/api/articles/all", get(api::articles::all_articles))
        .route("/api/articles/details", get(api::articles::get_article))
        // ==== LIKES & FAVORITES ==== //
        .route(
            "/api/articles/likes",
            get(api::engagement::get_likes).post(api::engagement::toggle_like),
        )
        .route(
            "/api/articles/favorites",
            get(api::engagement::get_favorites).post(api::engagement::toggle_favorite),
        )
        // ==== COMMENTS ==== //
        .route(
            "/api/articles/comments",
            get(api::comments::get_comments)
                .post(api::comments::create_comment)
                .delete(api::comments::delete_comment),
        )
        // ==== SUBSCRIBERS ==== //
        .route(
            "/api/articles/sendNotification",
            post(api::notify::send_notification),
        )
        .route("/api/subscribe", post(api::subscribe::subscribe))
        .route("/api/subscribe/unsubscribe", get(api::subscribe::unsubscribe))
        .fallback(handler_404)
        .with_state(state)
}

pub fn generate_routes(state: AppState, rate_limit_per_sec: u64) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    api_router(state)
        .layer(CompressionLayer::new())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: BoxError| async move {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Unhandled error: {}", err),
                    )
                }))
                .layer(BufferLayer::new(1024))
                .layer(RateLimitLayer::new(
                    rate_limit_per_sec.max(1),
                    Duration::from_secs(1),
                )),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "code": -1, "msg": "nothing to see here" })),
    )
}
