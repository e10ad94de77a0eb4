use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::users::{CurrentUserResponse, UserResponse},
    auth::current_user::AuthenticatedUser,
    db,
    errors::Error,
};

/// List all users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "All users, ascending by id", body = [UserResponse]),
        (status = 401, description = "No valid session"),
    ),
    security(("SessionCookie" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = current_user.user_id))]
pub async fn list_users(State(state): State<AppState>, current_user: AuthenticatedUser) -> Result<Json<Vec<UserResponse>>, Error> {
    let users = db::bounded(state.config.store_timeout, state.users.list_users()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Identity of the logged-in user
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "users",
    responses(
        (status = 200, description = "The session's user id", body = CurrentUserResponse),
        (status = 401, description = "No valid session"),
    ),
    security(("SessionCookie" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_current_user(current_user: AuthenticatedUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        user_id: current_user.user_id,
    })
}
