//! User management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::{Action, Resource},
    services::user::{CreateUserInput, UpdateUserInput, UserService},
    AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::User, Action::View)?;
    let service = UserService::new(state.db);
    let users = service.list_users(user.company_id).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::User, Action::View)?;
    let service = UserService::new(state.db);
    let found = service.get_user(user.company_id, user_id).await?;
    Ok(Json(found))
}

/// Add a staff account to the company
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::User, Action::Create)?;
    let service = UserService::new(state.db);
    let created = service.create_user(user.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::User, Action::Edit)?;
    let service = UserService::new(state.db);
    let updated = service
        .update_user(user.company_id, user_id, user.user_id, input)
        .await?;
    Ok(Json(updated))
}
