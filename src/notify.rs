//! New-article notification fan-out to active subscribers.

use futures::{stream, StreamExt};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::{
    config::NotifySettings,
    db::{active_subscribers, retrieve_article, Article, Subscriber},
    error::AppResult,
    mail::{new_article_mail, Mailer},
};

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanoutReport {
    pub recipients: usize,
    pub sent: usize,
    pub failures: Vec<DeliveryFailure>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryFailure {
    pub email: String,
    pub reason: String,
}

/// True only when an article goes from not published to published.
pub fn is_publish_transition(was_published: bool, will_be_published: bool) -> bool {
    !was_published && will_be_published
}

/// Mails `article` to every subscriber in `subscribers`.
pub async fn fan_out(
    mailer: &dyn Mailer,
    settings: &NotifySettings,
    article: &Article,
    subscribers: &[Subscriber],
) -> FanoutReport {
    // Sends are lazy; `buffer_unordered` decides how many run at once.
    let sends: Vec<_> = subscribers
        .iter()
        .map(|subscriber| {
            let mail = new_article_mail(settings, article, &subscriber.email, &subscriber.token);
            let send = mailer.send(mail);
            async move { (subscriber, send.await) }
        })
        .collect();

    let outcomes = stream::iter(sends)
        .buffer_unordered(settings.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut report = FanoutReport {
        recipients: subscribers.len(),
        ..Default::default()
    };
    for (subscriber, outcome) in outcomes {
        match outcome {
            Ok(()) => report.sent += 1,
            Err(err) => {
                warn!(email = %subscriber.email, error = %err, "failed to send article notification");
                report.failures.push(DeliveryFailure {
                    email: subscriber.email.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}

/// Loads the article and the active subscribers, then fans out.
pub async fn announce_article(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    settings: &NotifySettings,
    article_id: &str,
) -> AppResult<FanoutReport> {
    let article = retrieve_article(pool, article_id).await?;
    let subscribers = active_subscribers(pool).await?;

    if subscribers.is_empty() {
        info!(article_id, "no active subscribers to notify");
        return Ok(FanoutReport::default());
    }

    let report = fan_out(mailer, settings, &article, &subscribers).await;
    info!(
        article_id,
        sent = report.sent,
        failed = report.failures.len(),
        "article notification finished"
    );

    Ok(report)
}
