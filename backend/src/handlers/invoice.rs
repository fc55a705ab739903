//! HTTP handlers for invoices and invoice payments

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
    services::invoice::{CreateInvoiceInput, InvoiceQuery, InvoiceService, RecordPaymentInput},
    AppState,
};

pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<InvoiceQuery>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Invoice, Action::View)?;
    let service = InvoiceService::new(state.db);
    let invoices = service.list_invoices(user.company_id, query).await?;
    Ok(Json(invoices))
}

/// Get an invoice with its lines and payments
pub async fn get_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Invoice, Action::View)?;
    let service = InvoiceService::new(state.db);
    let invoice = service.get_invoice(user.company_id, invoice_id).await?;
    Ok(Json(invoice))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateInvoiceInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Invoice, Action::Create)?;
    let service = InvoiceService::new(state.db.clone());
    let invoice = service
        .create_invoice(
            user.company_id,
            user.user_id,
            state.config.pricing.default_tax_rate,
            input,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Issue a draft invoice
pub async fn issue_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Invoice, Action::Edit)?;
    let service = InvoiceService::new(state.db);
    let invoice = service.issue_invoice(user.company_id, invoice_id).await?;
    Ok(Json(invoice))
}

pub async fn record_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Json(input): Json<RecordPaymentInput>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Payment, Action::Create)?;
    let service = InvoiceService::new(state.db);
    let invoice = service
        .record_payment(user.company_id, invoice_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Invoice, Action::Delete)?;
    let service = InvoiceService::new(state.db);
    let invoice = service.cancel_invoice(user.company_id, invoice_id).await?;
    Ok(Json(invoice))
}
