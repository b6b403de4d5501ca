use axum::{headers::authorization::Credentials, http::HeaderValue};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

use super::auth::{Role, Session, UserId};

const TOKEN_TTL_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub exp: i64,
}

/// Raw token from an `Authorization: Bearer <token>` header.
#[derive(Debug)]
pub struct SessionToken(pub String);

impl Credentials for SessionToken {
    const SCHEME: &'static str = "Bearer";

    fn decode(value: &HeaderValue) -> Option<Self> {
        let mut it = value.to_str().ok()?.split_whitespace();
        let scheme = it.next()?;
        let token = it.next()?;

        if !scheme.eq_ignore_ascii_case(Self::SCHEME) || it.next().is_some() {
            None?
        }

        Some(Self(token.to_string()))
    }

    fn encode(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("{} {}", Self::SCHEME, self.0))
            .unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

pub fn verify_token(token: &str, key: &DecodingKey) -> AppResult<Session> {
    let claims = verify_jwt(token, key)?;
    Ok(Session {
        user_id: claims.sub,
        role: claims.role,
        name: claims.name,
        image: claims.image,
    })
}

pub fn verify_jwt(token: &str, key: &DecodingKey) -> AppResult<Claims> {
    let claims =
        jsonwebtoken::decode::<Claims>(token, key, &Validation::new(Algorithm::HS256))?.claims;
    Ok(claims)
}

/// Mints a session token. Sessions normally come from the external auth
/// provider; this exists for operators and tests.
pub fn issue_token(session: &Session, key: &EncodingKey) -> AppResult<String> {
    let exp = (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp();
    let claims = Claims {
        sub: session.user_id.clone(),
        role: session.role,
        name: session.name.clone(),
        image: session.image.clone(),
        exp,
    };

    let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, key)?;
    Ok(token)
}
