use crate::{config::NotifySettings, db::Article};

use super::OutgoingMail;

pub fn article_url(settings: &NotifySettings, article_id: &str) -> String {
    format!("{}/articles/{}", settings.app_url, article_id)
}

pub fn unsubscribe_url(settings: &NotifySettings, token: &str) -> String {
    format!("{}/api/subscribe/unsubscribe?token={}", settings.app_url, token)
}

/// New-article notice for one subscriber, carrying their own unsubscribe link.
pub fn new_article_mail(
    settings: &NotifySettings,
    article: &Article,
    to: &str,
    unsubscribe_token: &str,
) -> OutgoingMail {
    let summary = match article.summary.trim() {
        "" => String::new(),
        summary => format!(
            r#"<p style="margin: 0;">{}</p>"#,
            escape_html(summary)
        ),
    };

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>New article published</h2>
  <p>The blog you subscribed to has a new article:</p>
  <div style="background-color: #f5f5f5; padding: 15px; border-radius: 5px; margin: 20px 0;">
    <h3 style="margin: 0 0 10px 0;">{title}</h3>
    {summary}
  </div>
  <p>
    <a href="{article_url}" style="background-color: #0070f3; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px; display: inline-block;">Read the article</a>
  </p>
  <hr style="margin: 30px 0; border: none; border-top: 1px solid #eaeaea;" />
  <p style="color: #666; font-size: 12px;">
    Don't want these notices any more? <a href="{unsubscribe_url}" style="color: #666;">Unsubscribe</a>
  </p>
</div>"#,
        title = escape_html(&article.title),
        article_url = article_url(settings, &article.id),
        unsubscribe_url = unsubscribe_url(settings, unsubscribe_token),
    );

    OutgoingMail {
        to: to.to_string(),
        subject: format!("New article: {}", article.title),
        html,
    }
}

pub fn subscription_confirmation_mail(to: &str) -> OutgoingMail {
    let html = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>Subscription confirmed</h2>
  <p>Thanks for subscribing!</p>
  <p>You will get an email every time a new article is published.</p>
</div>"#;

    OutgoingMail {
        to: to.to_string(),
        subject: "Subscription confirmed".to_string(),
        html: html.to_string(),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
