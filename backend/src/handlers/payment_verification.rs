//! HTTP handlers for payment verification

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::{Action, Resource},
    services::payment_verification::{
        PaymentVerificationService, RejectVerificationInput, SubmitVerificationInput,
        VerificationQuery,
    },
    AppState,
};

pub async fn list_verifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<VerificationQuery>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PaymentVerification, Action::View)?;
    let service = PaymentVerificationService::new(state.db);
    let verifications = service.list(user.company_id, query).await?;
    Ok(Json(verifications))
}

pub async fn get_verification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(verification_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PaymentVerification, Action::View)?;
    let service = PaymentVerificationService::new(state.db);
    let verification = service.get(user.company_id, verification_id).await?;
    Ok(Json(verification))
}

/// Submit a claimed bank transfer for review
pub async fn submit_verification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SubmitVerificationInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PaymentVerification, Action::Create)?;
    let service = PaymentVerificationService::new(state.db);
    let verification = service
        .submit(user.company_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(verification)))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(verification_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PaymentVerification, Action::Verify)?;
    let service = PaymentVerificationService::new(state.db);
    let verification = service
        .verify(user.company_id, verification_id, user.user_id)
        .await?;
    Ok(Json(verification))
}

pub async fn reject_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(verification_id): Path<Uuid>,
    Json(input): Json<RejectVerificationInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PaymentVerification, Action::Verify)?;
    let service = PaymentVerificationService::new(state.db);
    let verification = service
        .reject(user.company_id, verification_id, user.user_id, input)
        .await?;
    Ok(Json(verification))
}
