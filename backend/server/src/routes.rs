use std::sync::Arc;

use axum::{
    Json,
    extract::{self, Query, rejection::JsonRejection},
    http::HeaderMap,
};
use progress::{ProgressSnapshot, level_from_xp, progress_from_xp, start_of_level};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::AppError,
    models::{LeaderboardEntry, NewProfile, Profile},
    state::State,
    utils::{bearer_token, non_empty, require_credentials, sanitize_username, validate_email},
};

type AppState = extract::State<Arc<State>>;

#[derive(Deserialize)]
pub struct SignupRequest {
    email: Option<String>,
    password: Option<String>,
    username: Option<String>,
    character: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
pub struct ProfileQuery {
    user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AddXpRequest {
    user_id: Option<String>,

    #[serde(default)]
    xp: i64,
}

#[derive(Serialize)]
pub struct SignupResponse {
    message: &'static str,
    user_id: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    message: &'static str,
    user_id: String,
    access_token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    profile: Profile,
    progress: ProgressSnapshot,
}

#[derive(Serialize)]
pub struct ProgressResponse {
    xp: i64,
    level: i64,
    progress: ProgressSnapshot,
}

impl ProgressResponse {
    fn from_xp(xp: i64) -> Self {
        let progress = progress_from_xp(xp);

        Self {
            xp,
            level: progress.current_level,
            progress,
        }
    }
}

pub async fn home_handler() -> &'static str {
    "Quest backend working"
}

pub async fn signup_handler(
    extract::State(state): AppState,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<SignupResponse>, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;

    let (email, password) = require_credentials(payload.email, payload.password)?;
    validate_email(&email)?;

    let username = payload.username.as_deref().and_then(sanitize_username);
    let character = non_empty(payload.character);

    let user_id = state.backend.sign_up(&email, &password).await?;

    state
        .backend
        .insert_profile(&NewProfile::fresh(user_id.clone(), email, username, character))
        .await?;

    info!("Signed up {user_id}");

    Ok(Json(SignupResponse {
        message: "Signup successful",
        user_id,
    }))
}

pub async fn login_handler(
    extract::State(state): AppState,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;

    let (email, password) = require_credentials(payload.email, payload.password)?;

    let session = state.backend.sign_in(&email, &password).await?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        user_id: session.user_id,
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        expires_in: session.expires_in,
    }))
}

pub async fn profile_handler(
    extract::State(state): AppState,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user_id = non_empty(query.user_id).ok_or(AppError::MissingUserId)?;

    let mut profile = state.backend.fetch_profile(&user_id).await?;
    // the computed field wins over a column of the same name
    profile.extra.remove("progress");

    let progress = progress_from_xp(profile.xp);
    profile.level = progress.current_level;

    Ok(Json(ProfileResponse { profile, progress }))
}

pub async fn add_xp_handler(
    extract::State(state): AppState,
    payload: Result<Json<AddXpRequest>, JsonRejection>,
) -> Result<Json<ProgressResponse>, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedPayload)?;

    let user_id = non_empty(payload.user_id).ok_or(AppError::MissingUserId)?;

    let profile = state.backend.fetch_profile(&user_id).await?;
    let new_xp = profile.xp.saturating_add(payload.xp).max(0);

    let response = ProgressResponse::from_xp(new_xp);

    state
        .backend
        .update_progress(&user_id, response.xp, response.level)
        .await?;

    if response.level != level_from_xp(profile.xp) {
        info!(
            "{user_id} moved from level {} to {}",
            level_from_xp(profile.xp),
            response.level
        );
    }

    Ok(Json(response))
}

/// Levels follow xp, so moving up a level means jumping to the first xp
/// value of the next band.
pub async fn change_level_handler(
    extract::State(state): AppState,
    headers: HeaderMap,
) -> Result<Json<ProgressResponse>, AppError> {
    let token = bearer_token(&headers)?;
    let user_id = state.backend.user_from_token(token).await?;

    let profile = state.backend.fetch_profile(&user_id).await?;

    let next_level = level_from_xp(profile.xp).saturating_add(1);
    let response = ProgressResponse::from_xp(start_of_level(next_level));

    state
        .backend
        .update_progress(&user_id, response.xp, response.level)
        .await?;

    info!("{user_id} advanced to level {}", response.level);

    Ok(Json(response))
}

pub async fn leaderboard_handler(
    extract::State(state): AppState,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let entries = state
        .backend
        .top_profiles(state.config.leaderboard_limit)
        .await?
        .into_iter()
        .map(|entry| LeaderboardEntry {
            level: level_from_xp(entry.xp),
            ..entry
        })
        .collect();

    Ok(Json(entries))
}
