pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod mail;
pub mod notify;
pub mod routes;
pub mod utils;

use std::sync::Arc;

use axum::extract::FromRef;
use jsonwebtoken::DecodingKey;
use sqlx::SqlitePool;

use crate::{config::NotifySettings, mail::Mailer};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub decoding_key: DecodingKey,
    pub mailer: Arc<dyn Mailer>,
    pub notify: NotifySettings,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        jwt_secret: &str,
        mailer: Arc<dyn Mailer>,
        notify: NotifySettings,
    ) -> Self {
        Self {
            pool,
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            mailer,
            notify,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> SqlitePool {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for DecodingKey {
    fn from_ref(app_state: &AppState) -> DecodingKey {
        app_state.decoding_key.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Mailer> {
    fn from_ref(app_state: &AppState) -> Arc<dyn Mailer> {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for NotifySettings {
    fn from_ref(app_state: &AppState) -> NotifySettings {
        app_state.notify.clone()
    }
}
