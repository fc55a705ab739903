//! HTTP handlers for the product catalog

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
    services::product::{
        CreateProductInput, PricePreviewInput, ProductQuery, ProductService, UpdateProductInput,
    },
    AppState,
};

pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ProductQuery>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Product, Action::View)?;
    let service = ProductService::new(state.db);
    let products = service.list_products(user.company_id, query).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Product, Action::View)?;
    let service = ProductService::new(state.db);
    let product = service.get_product(user.company_id, product_id).await?;
    Ok(Json(product))
}

/// Create a product; a missing tax rate falls back to the configured default
pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Product, Action::Create)?;
    let service = ProductService::new(state.db.clone());
    let product = service
        .create_product(user.company_id, state.config.pricing.default_tax_rate, input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Product, Action::Edit)?;
    let service = ProductService::new(state.db);
    let product = service
        .update_product(user.company_id, product_id, input)
        .await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Product, Action::Delete)?;
    let service = ProductService::new(state.db);
    service.deactivate_product(user.company_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Price a quantity of the product including delivery and tax
pub async fn price_preview(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<PricePreviewInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Product, Action::View)?;
    let service = ProductService::new(state.db);
    let preview = service
        .price_preview(user.company_id, product_id, input)
        .await?;
    Ok(Json(preview))
}
