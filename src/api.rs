pub mod articles;
pub mod comments;
pub mod engagement;
pub mod notify;
pub mod subscribe;

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};

/// Success envelope: `{ code: 0, data }`.
pub(crate) fn reply<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "code": 0, "data": data }))
}

/// Success envelope with a human readable message.
pub(crate) fn reply_msg<T: Serialize>(msg: impl Into<String>, data: T) -> Json<Value> {
    Json(json!({ "code": 0, "msg": msg.into(), "data": data }))
}

/// Unwraps an id-like field that must be present and non-blank.
pub(crate) fn required(value: Option<String>, message: &'static str) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::BadRequest(message))
}
