use std::sync::Arc;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

/// Source of "now" for issuing and expiring tokens.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// JWT payload. `sub` is the user's id, never the username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: i64,    // issued at (unix timestamp)
    pub exp: i64,    // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Why a token was refused. Callers outside `auth` only ever see "unauthenticated".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
}

/// Issues and validates HS256 tokens. Stateless: any instance built from the
/// same secret accepts tokens issued by any other.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl TokenService {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::seconds(cfg.ttl_minutes.saturating_mul(60)),
            clock,
        }
    }

    pub fn issue(&self, subject: Uuid) -> anyhow::Result<String> {
        let now = self.clock.now();
        let exp = now
            .checked_add(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("token ttl {} overflows the clock", self.ttl))?;
        let claims = Claims {
            sub: subject,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = self.sign(&claims)?;
        debug!(user_id = %subject, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    /// Signature first, then expiry against our own clock with zero leeway.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        if self.clock.now().unix_timestamp() > data.claims.exp {
            return Err(TokenError::Expired);
        }
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    pub(crate) struct TestClock(Mutex<OffsetDateTime>);

    impl TestClock {
        pub(crate) fn at(t: OffsetDateTime) -> Arc<Self> {
            Arc::new(Self(Mutex::new(t)))
        }

        pub(crate) fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> OffsetDateTime {
            *self.0.lock().unwrap()
        }
    }

    pub(crate) fn jwt_config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60 * 24,
        }
    }

    fn service_with_clock() -> (TokenService, Arc<TestClock>) {
        let clock = TestClock::at(OffsetDateTime::now_utc());
        let svc = TokenService::with_clock(&jwt_config("dev-secret"), clock.clone());
        (svc, clock)
    }

    #[test]
    fn issue_then_validate_returns_subject() {
        let svc = TokenService::new(&jwt_config("dev-secret"));
        let user_id = Uuid::new_v4();
        let token = svc.issue(user_id).expect("issue");
        let claims = svc.validate(&token).expect("validate");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn token_is_url_safe() {
        let svc = TokenService::new(&jwt_config("dev-secret"));
        let token = svc.issue(Uuid::new_v4()).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')));
    }

    #[test]
    fn token_expires_after_ttl_without_leeway() {
        let (svc, clock) = service_with_clock();
        let token = svc.issue(Uuid::new_v4()).unwrap();

        clock.advance(Duration::hours(24));
        assert!(svc.validate(&token).is_ok(), "still valid at exp");

        clock.advance(Duration::seconds(1));
        assert_eq!(svc.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn oversized_ttl_fails_to_issue() {
        let mut cfg = jwt_config("dev-secret");
        for ttl_minutes in [10_000_000_000, i64::MAX] {
            cfg.ttl_minutes = ttl_minutes;
            let svc = TokenService::new(&cfg);
            assert!(svc.issue(Uuid::new_v4()).is_err(), "ttl {ttl_minutes}");
        }
    }

    #[test]
    fn already_expired_claims_are_rejected() {
        let (svc, clock) = service_with_clock();
        let now = clock.now().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: now - 3600,
            exp: now - 1,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = svc.sign(&claims).unwrap();
        assert_eq!(svc.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn any_single_bit_flip_in_signature_is_rejected() {
        const B64URL: &[u8] =
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
        let (svc, _) = service_with_clock();
        let token = svc.issue(Uuid::new_v4()).unwrap();
        let (signed_part, sig) = token.rsplit_once('.').unwrap();

        for pos in 0..sig.len() {
            let idx = B64URL
                .iter()
                .position(|c| *c == sig.as_bytes()[pos])
                .expect("base64url char");
            for bit in 0..6 {
                let mut bytes = sig.as_bytes().to_vec();
                bytes[pos] = B64URL[idx ^ (1 << bit)];
                let forged = format!("{}.{}", signed_part, String::from_utf8(bytes).unwrap());
                assert!(
                    svc.validate(&forged).is_err(),
                    "bit {bit} at {pos} accepted"
                );
            }
        }
    }

    #[test]
    fn swapped_payload_fails_signature_check() {
        let (svc, _) = service_with_clock();
        let alice = svc.issue(Uuid::new_v4()).unwrap();
        let bob = svc.issue(Uuid::new_v4()).unwrap();

        let a: Vec<&str> = alice.split('.').collect();
        let b: Vec<&str> = bob.split('.').collect();
        let forged = format!("{}.{}.{}", a[0], b[1], a[2]);
        assert_eq!(svc.validate(&forged), Err(TokenError::SignatureMismatch));
    }

    #[test]
    fn other_secret_is_a_signature_mismatch() {
        let ours = TokenService::new(&jwt_config("secret-a"));
        let theirs = TokenService::new(&jwt_config("secret-b"));
        let token = theirs.issue(Uuid::new_v4()).unwrap();
        assert_eq!(ours.validate(&token), Err(TokenError::SignatureMismatch));
    }

    #[test]
    fn same_secret_validates_across_instances() {
        let a = TokenService::new(&jwt_config("shared"));
        let b = TokenService::new(&jwt_config("shared"));
        let user_id = Uuid::new_v4();
        let token = a.issue(user_id).unwrap();
        assert_eq!(b.validate(&token).unwrap().sub, user_id);
    }

    #[test]
    fn wrong_issuer_is_malformed() {
        let ours = TokenService::new(&jwt_config("shared"));
        let mut cfg = jwt_config("shared");
        cfg.issuer = "someone-else".into();
        let theirs = TokenService::new(&cfg);
        let token = theirs.issue(Uuid::new_v4()).unwrap();
        assert_eq!(ours.validate(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn garbage_is_malformed() {
        let svc = TokenService::new(&jwt_config("dev-secret"));
        for raw in ["", "abc", "a.b", "a.b.c", "....", "Bearer x"] {
            assert_eq!(svc.validate(raw), Err(TokenError::Malformed), "{raw:?}");
        }
    }
}
