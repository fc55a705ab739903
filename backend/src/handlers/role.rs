//! HTTP handlers for roles and the permission catalogue

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{Action, Resource},
    services::{
        role::{CreateRoleInput, Permission, UpdateRoleInput},
        RoleService,
    },
    AppState,
};

/// Permissions of one resource, as the role editor shows them
#[derive(Debug, Serialize)]
pub struct PermissionGroup {
    pub resource: String,
    pub permissions: Vec<Permission>,
}

/// Group a resource-ordered catalogue into one entry per resource
fn group_by_resource(permissions: Vec<Permission>) -> Vec<PermissionGroup> {
    let mut groups: Vec<PermissionGroup> = Vec::new();
    for permission in permissions {
        match groups.last_mut() {
            Some(group) if group.resource == permission.resource => group.permissions.push(permission),
            _ => groups.push(PermissionGroup {
                resource: permission.resource.clone(),
                permissions: vec![permission],
            }),
        }
    }
    groups
}

/// A user may rename their own role but not change what it grants
fn ensure_not_own_permissions(caller_role: Uuid, role_id: Uuid, input: &UpdateRoleInput) -> AppResult<()> {
    if caller_role == role_id && input.permission_ids.is_some() {
        return Err(AppError::validation(
            "permission_ids",
            "Cannot change the permissions of your own role",
        ));
    }
    Ok(())
}

pub async fn list_roles(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Role, Action::View)?;
    let roles = RoleService::new(state.db).get_roles(user.company_id).await?;
    Ok(Json(roles))
}

pub async fn get_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(role_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Role, Action::View)?;
    let role = RoleService::new(state.db)
        .get_role_with_permissions(user.company_id, role_id)
        .await?;
    Ok(Json(role))
}

/// Every `resource:action` a role can be granted, grouped by resource
pub async fn list_permissions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Role, Action::View)?;
    let permissions = RoleService::new(state.db).get_all_permissions().await?;
    Ok(Json(group_by_resource(permissions)))
}

pub async fn create_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateRoleInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Role, Action::Create)?;
    let role = RoleService::new(state.db)
        .create_role(user.company_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn update_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(role_id): Path<Uuid>,
    Json(input): Json<UpdateRoleInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Role, Action::Edit)?;
    ensure_not_own_permissions(user.role_id, role_id, &input)?;
    let role = RoleService::new(state.db)
        .update_role(user.company_id, role_id, input)
        .await?;
    Ok(Json(role))
}

/// Delete a custom role nobody holds
pub async fn delete_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(role_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Role, Action::Delete)?;
    RoleService::new(state.db)
        .delete_role(user.company_id, role_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
