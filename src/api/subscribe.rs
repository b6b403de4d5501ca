use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::{
    db::{self, Subscription},
    error::{AppError, AppResult},
    mail::{subscription_confirmation_mail, Mailer},
};

use super::{reply_msg, required};

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    #[serde(default)]
    token: Option<String>,
}

// POST /api/subscribe
pub async fn subscribe(
    State(pool): State<SqlitePool>,
    State(mailer): State<Arc<dyn Mailer>>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(request) = payload?;
    let email = required(request.email, "Please enter an email address")?.to_lowercase();

    if !validator::validate_email(&email) {
        return Err(AppError::BadRequest("Invalid email address"));
    }

    let outcome = db::subscribe(&pool, &email).await?;
    info!(email = %email, ?outcome, "subscription recorded");

    // The subscription stands even if the confirmation bounces.
    if let Err(err) = mailer.send(subscription_confirmation_mail(&email)).await {
        warn!(email = %email, error = %err, "failed to send subscription confirmation");
    }

    let msg = match outcome {
        Subscription::Created => "Subscribed",
        Subscription::Reactivated => "Subscription reactivated",
    };
    Ok(reply_msg(msg, Value::Null))
}

// GET /api/subscribe/unsubscribe?token=
pub async fn unsubscribe(
    State(pool): State<SqlitePool>,
    query: Result<Query<UnsubscribeQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let Query(query) = query?;
    let token = required(query.token, "Invalid unsubscribe link")?;

    let subscriber = db::unsubscribe(&pool, &token).await?;
    info!(email = %subscriber.email, "unsubscribed");

    Ok(reply_msg("Unsubscribed", Value::Null))
}
