use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};

use crate::{
    auth::{
        jwt::TokenService,
        password::{burn_verification, hash_password, verify_password},
        repo::UserStore,
        repo_types::{StoreError, User},
    },
    error::AppError,
    state::AppState,
};

const MAX_PASSWORD_BYTES: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("username already taken")]
    DuplicateUsername,
    /// Unknown user and wrong password both end up here.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidInput(msg) => AppError::BadRequest(msg.into()),
            AuthError::DuplicateUsername => AppError::DuplicateUsername,
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::Internal(e) => AppError::Internal(e),
        }
    }
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{1,64}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

fn check_credentials_shape(username: &str, password: &str) -> Result<(), AuthError> {
    if !is_valid_username(username) {
        return Err(AuthError::InvalidInput("Invalid username"));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidInput("Password must not be empty"));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::InvalidInput("Password too long"));
    }
    Ok(())
}

/// Turns username/password pairs into verified identities and tokens.
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
}

impl FromRef<AppState> for Authenticator {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), state.tokens.clone())
    }
}

impl Authenticator {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }

    /// The only path that creates a user.
    pub async fn register(&self, username: &str, password: &str) -> Result<(User, String), AuthError> {
        check_credentials_shape(username, password)?;

        if self.users.find_by_username(username).await?.is_some() {
            warn!(%username, "username already registered");
            return Err(AuthError::DuplicateUsername);
        }

        let hash = hash_password(password)?;
        let user = match self.users.create(username, &hash).await {
            Ok(u) => u,
            // Lost a race against a concurrent registration.
            Err(StoreError::Duplicate) => {
                warn!(%username, "username already registered");
                return Err(AuthError::DuplicateUsername);
            }
            Err(StoreError::Other(e)) => {
                error!(error = %e, "create user failed");
                return Err(AuthError::Internal(e));
            }
        };

        let token = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok((user, token))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(User, String), AuthError> {
        if !is_valid_username(username) || password.len() > MAX_PASSWORD_BYTES {
            burn_verification(password);
            return Err(AuthError::InvalidCredentials);
        }

        let Some(user) = self.users.find_by_username(username).await? else {
            burn_verification(password);
            warn!(%username, "login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                warn!(%username, user_id = %user.id, "login rejected");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, "stored password hash unreadable");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let token = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok((user, token))
    }
}
