use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{ProfileResponse, UpdateProfileRequest};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// A user who never filled in the profile gets an empty, incomplete one.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state
        .profiles
        .get_profile(&auth_user.id)
        .await?
        .unwrap_or_default();

    Ok(Json(ProfileResponse::from(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    body.validate()?;
    if body.is_empty() {
        return Err(AppError::Validation("No profile fields provided".into()));
    }

    let profile = state
        .profiles
        .upsert_profile(&auth_user.id, &body.into_patch())
        .await?;

    tracing::info!(
        user_id = %auth_user.id,
        complete = profile.is_complete(),
        "Profile updated"
    );

    Ok(Json(ProfileResponse::from(profile)))
}
