use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderValue},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::SessionConfig, error::AppError, state::AppState};

pub const SESSION_COOKIE: &str = "session";

/// Payload of the session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub exp: usize,  // expires at (unix timestamp)
    pub iat: usize,  // issued at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Signing material and cookie settings for sessions.
#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
    pub secure: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let SessionConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            cookie_secure,
        } = state.config.session.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs(ttl_minutes.max(0) as u64 * 60),
            secure: cookie_secure,
        }
    }
}

impl SessionKeys {
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// `Set-Cookie` value that signs `user_id` in.
    pub fn login_cookie(&self, user_id: Uuid) -> anyhow::Result<HeaderValue> {
        let token = self.sign(user_id)?;
        let value = self.cookie(&token, self.ttl.as_secs());
        Ok(HeaderValue::from_str(&value)?)
    }

    /// `Set-Cookie` value that drops the session.
    pub fn logout_cookie(&self) -> HeaderValue {
        if self.secure {
            HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure")
        } else {
            HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
        }
    }

    fn cookie(&self, value: &str, max_age: u64) -> String {
        let mut cookie =
            format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

fn session_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// The caller's session; `user_id` is `None` when nobody is signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Session {
    pub user_id: Option<Uuid>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(parts) else {
            return Ok(Session::default());
        };
        let keys = SessionKeys::from_ref(state);
        match keys.verify(token) {
            Ok(claims) => Ok(Session {
                user_id: Some(claims.sub),
            }),
            Err(e) => {
                warn!(error = %e, "ignoring invalid session cookie");
                Ok(Session::default())
            }
        }
    }
}

/// A signed-in user's ID; rejects with 401 otherwise.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .unwrap_or_default();
        session.user_id.map(AuthUser).ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn keys(secret: &str, issuer: &str) -> SessionKeys {
        SessionKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience: "test-aud".into(),
            ttl: Duration::from_secs(300),
            secure: false,
        }
    }

    fn parts_with_cookie(cookie: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(header::COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn sign_and_verify_session_token() {
        let keys = keys("dev-secret", "test-issuer");
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[test]
    fn verify_rejects_other_issuer() {
        let token = keys("same", "good-iss").sign(Uuid::new_v4()).unwrap();
        assert!(keys("same", "bad-iss").verify(&token).is_err());
    }

    #[test]
    fn login_and_logout_cookies() {
        let keys = keys("dev-secret", "iss");
        let login = keys.login_cookie(Uuid::new_v4()).unwrap();
        let login = login.to_str().unwrap();
        assert!(login.starts_with("session=ey"));
        assert!(login.contains("HttpOnly"));
        assert!(login.contains("Max-Age=300"));

        let logout = keys.logout_cookie();
        assert_eq!(
            logout.to_str().unwrap(),
            "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }

    #[test]
    fn secure_flag_is_appended() {
        let mut keys = keys("dev-secret", "iss");
        keys.secure = true;
        assert!(keys.logout_cookie().to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn finds_session_among_other_cookies() {
        let parts = parts_with_cookie("theme=dark; session=abc.def.ghi; lang=en");
        assert_eq!(session_token(&parts), Some("abc.def.ghi"));
    }

    #[test]
    fn empty_session_cookie_is_ignored() {
        let parts = parts_with_cookie("session=");
        assert_eq!(session_token(&parts), None);
    }
}
