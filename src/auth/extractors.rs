use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::TokenService;
use crate::error::AppError;

/// Pulls the raw token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Recovers the authenticated subject. Every failure, including a missing
/// token, collapses into [`AppError::Unauthenticated`].
pub fn resolve(tokens: &TokenService, raw: Option<&str>) -> Result<Uuid, AppError> {
    let raw = raw.ok_or(AppError::Unauthenticated)?;
    match tokens.validate(raw) {
        Ok(claims) => Ok(claims.sub),
        Err(e) => {
            warn!(reason = %e, "token rejected");
            Err(AppError::Unauthenticated)
        }
    }
}

/// Authenticated subject of the current request, passed explicitly to services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);
        resolve(&tokens, bearer_token(&parts.headers)).map(AuthUser)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use time::{Duration, OffsetDateTime};

    use super::*;
    use crate::auth::jwt::tests::{jwt_config, TestClock};

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn resolve_returns_subject_for_valid_token() {
        let tokens = TokenService::new(&jwt_config("dev-secret"));
        let user_id = Uuid::new_v4();
        let token = tokens.issue(user_id).unwrap();
        assert_eq!(resolve(&tokens, Some(&token)).unwrap(), user_id);
    }

    #[test]
    fn every_failure_is_unauthenticated() {
        let tokens = TokenService::new(&jwt_config("dev-secret"));
        let foreign = TokenService::new(&jwt_config("other-secret"))
            .issue(Uuid::new_v4())
            .unwrap();

        for raw in [None, Some("garbage"), Some(foreign.as_str())] {
            assert!(matches!(resolve(&tokens, raw), Err(AppError::Unauthenticated)));
        }
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let clock = TestClock::at(OffsetDateTime::now_utc());
        let tokens = TokenService::with_clock(&jwt_config("dev-secret"), clock.clone());
        let user_id = Uuid::new_v4();
        let token = tokens.issue(user_id).unwrap();

        clock.advance(Duration::hours(24));
        assert_eq!(resolve(&tokens, Some(&token)).unwrap(), user_id);

        clock.advance(Duration::seconds(1));
        assert!(matches!(
            resolve(&tokens, Some(&token)),
            Err(AppError::Unauthenticated)
        ));
    }
}
