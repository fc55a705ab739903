//! Reporting handlers for dashboard and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{Action, Resource};
use crate::services::reporting::{ExportFilter, ExportFormat, ReportingService};
use crate::AppState;

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db.clone());
    let metrics = service.get_dashboard_metrics(user.company_id).await?;
    Ok(Json(metrics))
}

/// Export invoices as CSV or JSON
pub async fn export_invoices(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ExportFilter>,
) -> AppResult<impl IntoResponse> {
    user.require(Resource::Report, Action::Export)?;
    let service = ReportingService::new(state.db.clone());
    let data = service.export_invoices(user.company_id, &filter).await?;

    if filter.format == ExportFormat::Csv {
        let csv = ReportingService::export_to_csv(&data)?;
        Ok((
            [(header::CONTENT_TYPE, "text/csv"), (header::CONTENT_DISPOSITION, "attachment; filename=\"invoices.csv\"")],
            csv,
        ).into_response())
    } else {
        Ok(Json(data).into_response())
    }
}
