//! HTTP handlers for the company profile and its branches

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
    services::company::{CompanyService, CreateBranchInput, UpdateBranchInput, UpdateCompanyInput},
    AppState,
};

/// Get the caller's company
pub async fn get_company(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Company, Action::View)?;
    let service = CompanyService::new(state.db);
    let company = service.get_company(user.company_id).await?;
    Ok(Json(company))
}

pub async fn update_company(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<UpdateCompanyInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Company, Action::Edit)?;
    let service = CompanyService::new(state.db);
    let company = service.update_company(user.company_id, input).await?;
    Ok(Json(company))
}

/// List branches
pub async fn list_branches(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Branch, Action::View)?;
    let service = CompanyService::new(state.db);
    let branches = service.list_branches(user.company_id).await?;
    Ok(Json(branches))
}

pub async fn get_branch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Branch, Action::View)?;
    let service = CompanyService::new(state.db);
    let branch = service.get_branch(user.company_id, branch_id).await?;
    Ok(Json(branch))
}

pub async fn create_branch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateBranchInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Branch, Action::Create)?;
    let service = CompanyService::new(state.db);
    let branch = service.create_branch(user.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

pub async fn update_branch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
    Json(input): Json<UpdateBranchInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Branch, Action::Edit)?;
    let service = CompanyService::new(state.db);
    let branch = service.update_branch(user.company_id, branch_id, input).await?;
    Ok(Json(branch))
}

/// Deactivate a branch; its history stays
pub async fn delete_branch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Branch, Action::Delete)?;
    let service = CompanyService::new(state.db);
    service.deactivate_branch(user.company_id, branch_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
