//! HTTP handlers for production stage tracking

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
    services::production::{
        CreateTemplateInput, ProductionService, StageActionInput, UpdateTemplateInput,
    },
    AppState,
};

pub async fn list_templates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Production, Action::View)?;
    let service = ProductionService::new(state.db);
    let templates = service.list_templates(user.company_id).await?;
    Ok(Json(templates))
}

pub async fn create_template(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateTemplateInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Production, Action::Create)?;
    let service = ProductionService::new(state.db);
    let template = service.create_template(user.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn update_template(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(template_id): Path<Uuid>,
    Json(input): Json<UpdateTemplateInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Production, Action::Edit)?;
    let service = ProductionService::new(state.db);
    let template = service
        .update_template(user.company_id, template_id, input)
        .await?;
    Ok(Json(template))
}

/// Jobs that still have unfinished stages
pub async fn list_jobs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Production, Action::View)?;
    let service = ProductionService::new(state.db);
    let jobs = service.list_open_jobs(user.company_id).await?;
    Ok(Json(jobs))
}

/// Start production for an invoice
pub async fn create_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Production, Action::Create)?;
    let service = ProductionService::new(state.db);
    let job = service.create_job(user.company_id, invoice_id).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn get_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Production, Action::View)?;
    let service = ProductionService::new(state.db);
    let job = service.get_job(user.company_id, invoice_id).await?;
    Ok(Json(job))
}

/// Apply start/complete/approve/hold/resume/skip to a stage
pub async fn apply_stage_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(stage_id): Path<Uuid>,
    Json(input): Json<StageActionInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Production, input.action.required_permission())?;
    let service = ProductionService::new(state.db);
    let stage = service
        .apply_action(user.company_id, stage_id, user.user_id, input)
        .await?;
    Ok(Json(stage))
}
