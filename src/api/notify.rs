use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    config::NotifySettings,
    error::AppResult,
    mail::Mailer,
    notify::{self, FanoutReport},
    utils::auth::{self, AuthHeader},
};

use super::{reply_msg, required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotification {
    #[serde(default)]
    article_id: Option<String>,
}

// POST /api/articles/sendNotification
pub async fn send_notification(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(mailer): State<Arc<dyn Mailer>>,
    State(settings): State<NotifySettings>,
    token: AuthHeader,
    payload: Result<Json<SendNotification>, JsonRejection>,
) -> AppResult<Json<Value>> {
    auth::require_admin(token, &key)?;
    let Json(request) = payload?;
    let article_id = required(request.article_id, "Article id is required")?;

    let report = notify::announce_article(&pool, mailer.as_ref(), &settings, &article_id).await?;
    Ok(report_reply(&report))
}

pub(crate) fn report_reply(report: &FanoutReport) -> Json<Value> {
    let msg = match report.recipients {
        0 => "No active subscribers".to_string(),
        _ => format!("Sent {} notification emails", report.sent),
    };

    reply_msg(msg, report_data(report))
}

pub(crate) fn report_data(report: &FanoutReport) -> Value {
    json!({
        "sentCount": report.sent,
        "failedCount": report.failures.len(),
    })
}
