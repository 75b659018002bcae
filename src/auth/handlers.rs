use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        extractors::AuthUser,
        services::Authenticator,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(auth, payload))]
pub async fn register(
    State(auth): State<Authenticator>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (user, token) = auth.register(&payload.username, &payload.password).await?;
    Ok(Json(AuthResponse {
        token,
        id: user.id,
        username: user.username,
    }))
}

#[instrument(skip(auth, payload))]
pub async fn login(
    State(auth): State<Authenticator>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (user, token) = auth.login(&payload.username, &payload.password).await?;
    Ok(Json(AuthResponse {
        token,
        id: user.id,
        username: user.username,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        // Valid signature for a user that no longer resolves.
        error!(user_id = %user_id, "user not found");
        AppError::Unauthenticated
    })?;

    Ok(Json(PublicUser {
        id: user.id,
        username: user.username,
    }))
}
