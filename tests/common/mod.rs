#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use blog_backend::{
    config::NotifySettings,
    db::{self, ArticleStatus, NewArticle},
    mail::{MailError, Mailer, OutgoingMail},
    routes,
    utils::{
        auth::{Role, Session},
        jwt,
    },
    AppState,
};
use jsonwebtoken::EncodingKey;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

pub const SECRET: &str = "integration-secret";

/// Records every mail it is asked to send. Addresses on `bounce.test` fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    pub fn recipients(&self) -> Vec<String> {
        let mut to: Vec<_> = self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect();
        to.sort();
        to
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.subject.clone()).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let to = mail.to.clone();
        self.sent.lock().unwrap().push(mail);

        if to.ends_with("@bounce.test") {
            return Err(MailError::Rejected(to));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub mailer: Arc<RecordingMailer>,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::connect_in_memory().await.unwrap();
        db::prepare_db(&pool).await.unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(
            pool.clone(),
            SECRET,
            mailer.clone(),
            NotifySettings::default(),
        );

        Self {
            pool,
            mailer,
            router: routes::api_router(state),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Inserts an article directly, bypassing the admin routes.
    pub async fn article(&self, title: &str, status: ArticleStatus) -> String {
        db::insert_article(
            &self.pool,
            "admin",
            NewArticle {
                title: title.into(),
                content: format!("{title} body"),
                classify: "rust".into(),
                cover_img: String::new(),
                summary: format!("{title} summary"),
                status,
            },
        )
        .await
        .unwrap()
        .id
    }
}

pub fn token(user_id: &str, role: Role) -> String {
    jwt::issue_token(
        &Session::new(user_id, role),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn member(user_id: &str) -> String {
    token(user_id, Role::Member)
}

pub fn admin() -> String {
    token("admin", Role::Admin)
}
