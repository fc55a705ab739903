//! HTTP handlers for customer management

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
    services::customer::{CreateCustomerInput, CustomerQuery, CustomerService, UpdateCustomerInput},
    AppState,
};

/// List customers with search and paging
pub async fn list_customers(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CustomerQuery>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Customer, Action::View)?;
    let service = CustomerService::new(state.db);
    let customers = service.list_customers(user.company_id, query).await?;
    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Customer, Action::View)?;
    let service = CustomerService::new(state.db);
    let customer = service.get_customer(user.company_id, customer_id).await?;
    Ok(Json(customer))
}

pub async fn create_customer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateCustomerInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Customer, Action::Create)?;
    let service = CustomerService::new(state.db);
    let customer = service.create_customer(user.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<UpdateCustomerInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Customer, Action::Edit)?;
    let service = CustomerService::new(state.db);
    let customer = service
        .update_customer(user.company_id, customer_id, input)
        .await?;
    Ok(Json(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Customer, Action::Delete)?;
    let service = CustomerService::new(state.db);
    service.deactivate_customer(user.company_id, customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
