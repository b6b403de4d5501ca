use axum::{headers::Authorization, TypedHeader};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

use super::jwt::{self, SessionToken};

pub type UserId = String;

/// Optional bearer token as extracted by handlers.
pub type AuthHeader = Option<TypedHeader<Authorization<SessionToken>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "00")]
    Admin,
    #[serde(rename = "01")]
    Member,
}

impl Role {
    pub fn as_code(&self) -> &'static str {
        match self {
            Role::Admin => "00",
            Role::Member => "01",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "00" => Some(Role::Admin),
            "01" => Some(Role::Member),
            _ => None,
        }
    }
}

/// Identity injected by the auth provider's token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub role: Role,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            name: None,
            image: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn require_session(header: AuthHeader, key: &DecodingKey) -> AppResult<Session> {
    let Some(TypedHeader(Authorization(token))) = header else {
        return Err(AppError::Unauthorized);
    };

    jwt::verify_token(&token.0, key)
}

pub fn optional_session(header: AuthHeader, key: &DecodingKey) -> AppResult<Option<Session>> {
    header
        .map(|TypedHeader(Authorization(token))| jwt::verify_token(&token.0, key))
        .transpose()
}

pub fn require_admin(header: AuthHeader, key: &DecodingKey) -> AppResult<Session> {
    let session = require_session(header, key)?;

    if !session.is_admin() {
        return Err(AppError::Forbidden("Permission denied"));
    }

    Ok(session)
}
