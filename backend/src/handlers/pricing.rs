//! HTTP handlers for weight pricing tiers and delivery quotes

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
    services::{
        delivery::{DeliveryService, QuoteRequest},
        pricing_tier::{CreateTierInput, PricingTierService, UpdateTierInput},
    },
    AppState,
};

/// List the company's tiers, active and inactive
pub async fn list_tiers(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PricingTier, Action::View)?;
    let service = PricingTierService::new(state.db);
    let tiers = service.list_tiers(user.company_id).await?;
    Ok(Json(tiers))
}

pub async fn get_tier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tier_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PricingTier, Action::View)?;
    let service = PricingTierService::new(state.db);
    let tier = service.get_tier(user.company_id, tier_id).await?;
    Ok(Json(tier))
}

pub async fn create_tier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateTierInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PricingTier, Action::Create)?;
    let service = PricingTierService::new(state.db);
    let tier = service.create_tier(user.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(tier)))
}

pub async fn update_tier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tier_id): Path<Uuid>,
    Json(input): Json<UpdateTierInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PricingTier, Action::Edit)?;
    let service = PricingTierService::new(state.db);
    let tier = service.update_tier(user.company_id, tier_id, input).await?;
    Ok(Json(tier))
}

/// Flip a tier between active and inactive
pub async fn toggle_tier_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tier_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PricingTier, Action::Edit)?;
    let service = PricingTierService::new(state.db);
    let tier = service.toggle_status(user.company_id, tier_id).await?;
    Ok(Json(tier))
}

pub async fn delete_tier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tier_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PricingTier, Action::Delete)?;
    let service = PricingTierService::new(state.db);
    service.delete_tier(user.company_id, tier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Quote the delivery charge for a weight
pub async fn quote_delivery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<QuoteRequest>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::PricingTier, Action::View)?;
    let service = DeliveryService::new(state.db);
    let quote = service.quote(user.company_id, request).await?;
    Ok(Json(quote))
}
