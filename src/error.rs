use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum DBError {
    #[error("Article not found")]
    ArticleNotFound,

    #[error("Comment not found")]
    CommentNotFound,

    #[error("This email is already subscribed")]
    AlreadySubscribed,

    #[error("This email has already unsubscribed")]
    AlreadyUnsubscribed,

    #[error("Invalid unsubscribe link")]
    InvalidUnsubscribeToken,
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Any error: {0:?}")]
    Anyhow(#[from] anyhow::Error),

    #[error("DB Error: {0:?}")]
    DBError(#[from] DBError),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Please sign in first")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] JsonRejection),

    #[error("Malformed query: {0}")]
    MalformedQuery(#[from] QueryRejection),

    #[error("SQL failed: {0:?}")]
    Sqlx(#[from] sqlx::Error),

    #[error("JWT error: {0:?}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid request: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl AppError {
    /// Status and envelope `code` for this error. Internal failures share a
    /// generic message; their detail only goes to the log.
    fn parts(&self) -> (StatusCode, i32, String) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, 401, self.to_string()),
            AppError::JwtError(_) => (StatusCode::UNAUTHORIZED, 401, "Invalid session".into()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, 403, self.to_string()),
            AppError::BadRequest(_) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, -1, self.to_string())
            }
            AppError::MalformedPayload(_) => {
                (StatusCode::BAD_REQUEST, -1, "Malformed payload".into())
            }
            AppError::MalformedQuery(_) => {
                (StatusCode::BAD_REQUEST, -1, "Malformed query".into())
            }
            AppError::DBError(db_error) => {
                let message = db_error.to_string();

                match db_error {
                    DBError::ArticleNotFound | DBError::CommentNotFound => {
                        (StatusCode::NOT_FOUND, -1, message)
                    }
                    _ => (StatusCode::BAD_REQUEST, -1, message),
                }
            }
            AppError::Anyhow(_) | AppError::Sqlx(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                -1,
                "Internal server error, please try again later".into(),
            ),
        }
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::warn!(%status, "request rejected: {}", self);
        }

        (status, Json(json!({ "code": code, "msg": msg }))).into_response()
    }
}
