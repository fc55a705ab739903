//! Reporting service for dashboard metrics and invoice export

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::InvoiceStatus;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub unpaid_invoices: i64,
    pub partially_paid_invoices: i64,
    pub paid_invoices: i64,
    pub total_invoiced: Decimal,
    pub total_collected: Decimal,
    pub outstanding: Decimal,
    pub pending_verifications: i64,
    pub stages_in_progress: i64,
    pub stages_awaiting_approval: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceTotalsRow {
    unpaid: i64,
    partially_paid: i64,
    paid: i64,
    total_invoiced: Decimal,
    total_collected: Decimal,
}

/// One exported invoice line
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InvoiceExportRow {
    pub invoice_number: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub customer_name: String,
    pub status: String,
    pub payment_status: String,
    pub subtotal: Decimal,
    pub delivery_total: Decimal,
    pub tax_total: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

/// Report filter parameters
#[derive(Debug, Default, Deserialize)]
pub struct ExportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub format: ExportFormat,
}

/// What an export selects: one invoice status and an inclusive, possibly
/// open-ended date range
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportScope {
    status: InvoiceStatus,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl ExportFilter {
    /// Only issued invoices carry money figures
    fn scope(&self) -> AppResult<ExportScope> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(AppError::validation("start_date", "start_date must not be after end_date"));
            }
        }
        Ok(ExportScope {
            status: InvoiceStatus::Issued,
            start: self.start_date,
            end: self.end_date,
        })
    }
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get dashboard metrics; cancelled invoices are left out of every figure
    pub async fn get_dashboard_metrics(&self, company_id: Uuid) -> AppResult<DashboardMetrics> {
        let totals = sqlx::query_as::<_, InvoiceTotalsRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE payment_status = 'unpaid') AS unpaid,
                COUNT(*) FILTER (WHERE payment_status = 'partially_paid') AS partially_paid,
                COUNT(*) FILTER (WHERE payment_status = 'paid') AS paid,
                COALESCE(SUM(total_amount), 0) AS total_invoiced,
                COALESCE(SUM(amount_paid), 0) AS total_collected
            FROM invoices
            WHERE company_id = $1 AND status = 'issued'
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        let outstanding: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(GREATEST(total_amount - amount_paid, 0)), 0)
            FROM invoices
            WHERE company_id = $1 AND status = 'issued'
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        let pending_verifications: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payment_verifications WHERE company_id = $1 AND status = 'pending'",
        )
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        let (stages_in_progress, stages_awaiting_approval): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'in_progress'),
                COUNT(*) FILTER (WHERE status = 'requires_approval')
            FROM production_stages
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardMetrics {
            unpaid_invoices: totals.unpaid,
            partially_paid_invoices: totals.partially_paid,
            paid_invoices: totals.paid,
            total_invoiced: totals.total_invoiced,
            total_collected: totals.total_collected,
            outstanding,
            pending_verifications,
            stages_in_progress,
            stages_awaiting_approval,
        })
    }

    /// Issued invoices created within the filter's date range, by number
    pub async fn export_invoices(
        &self,
        company_id: Uuid,
        filter: &ExportFilter,
    ) -> AppResult<Vec<InvoiceExportRow>> {
        let scope = filter.scope()?;

        let rows = sqlx::query_as::<_, InvoiceExportRow>(
            r#"
            SELECT i.invoice_number, i.issued_at, c.name AS customer_name,
                   i.status, i.payment_status, i.subtotal, i.delivery_total,
                   i.tax_total, i.total_amount, i.amount_paid
            FROM invoices i
            JOIN customers c ON c.id = i.customer_id
            WHERE i.company_id = $1
              AND i.status = $2
              AND ($3::date IS NULL OR i.created_at::date >= $3)
              AND ($4::date IS NULL OR i.created_at::date <= $4)
            ORDER BY i.invoice_number ASC
            "#,
        )
        .bind(company_id)
        .bind(scope.status.as_str())
        .bind(scope.start)
        .bind(scope.end)
        .fetch_all(&self.db)
        .await?;

        tracing::info!(%company_id, rows = rows.len(), format = ?filter.format, "Invoices exported");

        Ok(rows)
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn csv_has_header_and_rows() {
        let rows = vec![InvoiceExportRow {
            invoice_number: "INV-2026-00001".into(),
            issued_at: None,
            customer_name: "Acme, Ltd".into(),
            status: "issued".into(),
            payment_status: "partially_paid".into(),
            subtotal: dec!(100.00),
            delivery_total: dec!(15.00),
            tax_total: dec!(8.05),
            total_amount: dec!(123.05),
            amount_paid: dec!(50.00),
        }];

        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("invoice_number,issued_at,customer_name"));
        assert_eq!(
            lines.next().unwrap(),
            "INV-2026-00001,,\"Acme, Ltd\",issued,partially_paid,100.00,15.00,8.05,123.05,50.00"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let filter = ExportFilter {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            format: ExportFormat::Csv,
        };
        assert!(matches!(filter.scope(), Err(AppError::Validation { .. })));
    }

    #[test]
    fn empty_query_exports_every_issued_invoice() {
        let filter: ExportFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter.format, ExportFormat::Csv);
        assert_eq!(
            filter.scope().unwrap(),
            ExportScope { status: InvoiceStatus::Issued, start: None, end: None }
        );
    }

    #[test]
    fn half_open_range_keeps_missing_end_unbounded() {
        let filter = ExportFilter {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            end_date: None,
            format: ExportFormat::Json,
        };
        let scope = filter.scope().unwrap();
        assert_eq!(scope.start, NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(scope.end, None);
        assert_eq!(scope.status.as_str(), "issued");
    }

    #[test]
    fn single_day_range_is_allowed() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 14);
        let filter = ExportFilter { start_date: day, end_date: day, format: ExportFormat::Csv };
        assert!(filter.scope().is_ok());
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn export_without_dates_returns_only_issued_invoices() {
        let Some(pool) = crate::services::test_support::pool().await else {
            return;
        };
        let tenant = crate::services::test_support::tenant(&pool).await;
        for (number, status) in [
            ("INV-2026-00001", "issued"),
            ("INV-2026-00002", "draft"),
            ("INV-2026-00003", "cancelled"),
        ] {
            crate::services::test_support::invoice(&pool, &tenant, number, status, dec!(100)).await;
        }

        let service = ReportingService::new(pool);
        let rows = service
            .export_invoices(tenant.company_id, &ExportFilter::default())
            .await
            .unwrap();

        let numbers: Vec<_> = rows.iter().map(|r| r.invoice_number.as_str()).collect();
        assert_eq!(numbers, ["INV-2026-00001"]);
        assert!(rows.iter().all(|r| r.status == "issued"));

        let past = ExportFilter {
            start_date: NaiveDate::from_ymd_opt(2000, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2000, 12, 31),
            format: ExportFormat::Json,
        };
        assert!(service.export_invoices(tenant.company_id, &past).await.unwrap().is_empty());
    }
}
