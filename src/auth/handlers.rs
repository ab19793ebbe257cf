use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
        error::AuthError,
        extractors::{AuthorizationHeader, JsonBody},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let auth = state.auth.clone();
    // argon2 is CPU bound; keep it off the async workers
    let user = tokio::task::spawn_blocking(move || {
        auth.register(&payload.name, &payload.email, &payload.password)
    })
    .await
    .map_err(anyhow::Error::from)??;

    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let auth = state.auth.clone();
    let token = tokio::task::spawn_blocking(move || auth.login(&payload.email, &payload.password))
        .await
        .map_err(anyhow::Error::from)??;

    Ok(Json(LoginResponse {
        message: "login successful",
        token,
    }))
}

#[instrument(skip(state, header))]
pub async fn profile(
    State(state): State<AppState>,
    AuthorizationHeader(header): AuthorizationHeader,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state.auth.profile(header.as_deref())?;
    Ok(Json(user))
}
