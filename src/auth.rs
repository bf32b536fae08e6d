use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SessionConfig;

/// Cookie carrying the signed session token
pub const SESSION_COOKIE: &str = "token";
/// Cookie remembering which account awaits its one-time code
pub const OTP_USER_COOKIE: &str = "otp_user";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session token expired")]
    Expired,

    #[error("Invalid session token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("Failed to sign session token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Session token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Expiration time (as Unix timestamp)
    pub exp: u64,
    /// Issued at (as Unix timestamp)
    pub iat: u64,
}

impl Claims {
    /// Create new claims with given subject and expiration duration in seconds
    pub fn new(subject: String, expires_in_secs: u64) -> Self {
        let now = Utc::now().timestamp().max(0) as u64;

        Self {
            sub: subject,
            iat: now,
            exp: now + expires_in_secs,
        }
    }
}

/// The authenticated user of a request, set by the user status middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub username: String,
}

/// Signs and verifies session tokens (HS256)
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
    secure: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_secs: u64, secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
            secure,
        }
    }

    pub fn from_conf(config: &SessionConfig) -> Self {
        Self::new(&config.secret, config.ttl_seconds, config.secure_cookie)
    }

    /// Issue a token for `username`
    pub fn issue(&self, username: &str) -> Result<String, SessionError> {
        let claims = Claims::new(username.to_string(), self.ttl_secs);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(SessionError::Signing)
    }

    /// Verify a token; expired, tampered or foreign tokens are rejected
    pub fn verify(&self, token: &str) -> Result<SessionUser, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid(err),
            })?;
        Ok(SessionUser {
            username: token_data.claims.sub,
        })
    }

    /// Cookie holding a freshly issued session token
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .max_age(time::Duration::seconds(self.ttl_secs as i64))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build()
    }

    /// Short-lived cookie naming the account awaiting confirmation
    pub fn otp_user_cookie(&self, username: String) -> Cookie<'static> {
        Cookie::build((OTP_USER_COOKIE, username))
            .path("/u")
            .max_age(time::Duration::hours(24))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build()
    }
}

/// Cookie that makes the browser drop `name`
pub fn removal_cookie(name: &'static str, path: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path(path)
        .max_age(time::Duration::seconds(0))
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-secret", 3600, false)
    }

    #[test]
    fn test_issued_token_verifies_to_user() {
        let keys = keys();
        let token = keys.issue("alice").unwrap();

        assert_eq!(
            keys.verify(&token).unwrap(),
            SessionUser {
                username: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = SessionKeys::new("other-secret", 3600, false)
            .issue("mallory")
            .unwrap();

        assert!(matches!(
            keys().verify(&token),
            Err(SessionError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: "alice".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = keys().verify(&token).unwrap_err();
        assert!(matches!(err, SessionError::Expired));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let keys = keys();
        let token = keys.issue("alice").unwrap();
        let forged_payload = {
            use base64::Engine;
            let claims = Claims::new("admin".to_string(), 3600);
            base64::engine::general_purpose::URL_SAFE_NO_PAD
                .encode(serde_json::to_vec(&claims).unwrap())
        };
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_payload;

        assert!(keys.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = SessionKeys::new("s", 60, true).session_cookie("abc".to_string());

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(60)));
    }
}
