use axum::{Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::dto::MeResponse;

pub async fn me(Extension(auth_user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        id: auth_user.id,
        email: auth_user.email,
        email_verified: auth_user.email_verified,
    })
}
