use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::AppError, models::TokenRequest};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Fixed validity window of an issued token.
pub const TOKEN_TTL_HOURS: i64 = 5;

/// Claims
///
/// Payload of the signed session token. The subject is the user's email, which is also
/// the ownership key of items and recoveries.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's email.
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch. Always `iat + 5h`.
    pub exp: usize,
}

/// AuthUser
///
/// The resolved identity of a request that carried a valid session cookie.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub email: String,
    pub name: Option<String>,
}

/// issue_token
///
/// Signs a token for `identity`, valid for `TOKEN_TTL_HOURS` from now.
pub fn issue_token(
    secret: &str,
    identity: &TokenRequest,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue_token_at(secret, identity, Utc::now())
}

/// issue_token_at
///
/// Same as `issue_token`, with an explicit issue time.
pub fn issue_token_at(
    secret: &str,
    identity: &TokenRequest,
    issued_at: DateTime<Utc>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expires_at = issued_at + Duration::hours(TOKEN_TTL_HOURS);
    let claims = Claims {
        sub: identity.email.clone(),
        email: identity.email.clone(),
        name: identity.name.clone(),
        iat: issued_at.timestamp().max(0) as usize,
        exp: expires_at.timestamp().max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// verify_token
///
/// Checks signature and expiry. Any failure (malformed, expired, bad signature, empty
/// subject) collapses into `AppError::Unauthorized`.
pub fn verify_token(secret: &str, token: &str) -> Result<AuthUser, AppError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => tracing::debug!("rejected expired session token"),
            other => tracing::debug!("rejected session token: {:?}", other),
        }
        AppError::Unauthorized
    })?;

    if data.claims.sub.is_empty() {
        return Err(AppError::Unauthorized);
    }

    Ok(AuthUser {
        email: data.claims.sub,
        name: data.claims.name,
    })
}

/// authenticate
///
/// The cookie half of the Access Guard: a missing cookie fails immediately, without
/// attempting verification.
pub fn authenticate(jar: &CookieJar, secret: &str) -> Result<AuthUser, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or(AppError::Unauthorized)?;
    verify_token(secret, token)
}

/// session_cookie
///
/// HTTP-only cookie carrying `token`. In production the front-end lives on another site,
/// so the cookie must be `Secure` and `SameSite=None`; locally it is `SameSite=Strict`.
pub fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    let same_site = if config.is_production() {
        SameSite::None
    } else {
        SameSite::Strict
    };
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(config.is_production())
        .same_site(same_site)
        .path("/")
        .build()
}

/// AuthUser Extractor
///
/// Reuses the identity the Access Guard stored in the request extensions. When a handler
/// is mounted without the guard it verifies the session cookie itself, so the extractor
/// alone is always sufficient to protect a handler.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let config = AppConfig::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let user = authenticate(&jar, &config.jwt_secret)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Env;

    const SECRET: &str = "unit-test-secret";

    fn identity(email: &str) -> TokenRequest {
        TokenRequest {
            email: email.to_string(),
            name: Some("Alice".to_string()),
        }
    }

    #[test]
    fn issued_token_verifies_to_its_subject() {
        let token = issue_token(SECRET, &identity("a@x.com")).unwrap();
        let user = verify_token(SECRET, &token).unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.name.as_deref(), Some("Alice"));
    }

    #[test]
    fn token_expires_after_five_hours() {
        let issued_at = Utc::now() - Duration::hours(TOKEN_TTL_HOURS) - Duration::minutes(10);
        let token = issue_token_at(SECRET, &identity("a@x.com"), issued_at).unwrap();
        assert!(matches!(
            verify_token(SECRET, &token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token("another-secret", &identity("a@x.com")).unwrap();
        assert!(verify_token(SECRET, &token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_token(SECRET, "not.a.jwt").is_err());
    }

    #[test]
    fn missing_cookie_is_unauthorized() {
        let jar = CookieJar::new();
        assert!(matches!(
            authenticate(&jar, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn cookie_flags_follow_environment() {
        let mut config = AppConfig::default();
        let local = session_cookie(&config, "t".to_string());
        assert_eq!(local.http_only(), Some(true));
        assert_eq!(local.secure(), Some(false));
        assert_eq!(local.same_site(), Some(SameSite::Strict));

        config.env = Env::Production;
        let prod = session_cookie(&config, "t".to_string());
        assert_eq!(prod.secure(), Some(true));
        assert_eq!(prod.same_site(), Some(SameSite::None));
    }
}
