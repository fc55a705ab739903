//! Invoice service: pricing lines, numbering, payments and balances
//!
//! Every line is priced with [`shared::compose_line_total`] against the
//! company's active weight tiers. Header totals are the unrounded line sums,
//! rounded once. Issued invoices move the customer's balance; payments move
//! it back.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{parse_status, Invoice, InvoiceStatus, PaymentMethod, PaymentStatus, Product};
use crate::services::customer::adjust_balance;
use crate::services::{PricingTierService, ProductService};
use shared::{
    compose_line_total, format_invoice_number, rollup_payment_status, sum_lines,
    DeliveryCalculation, DocumentTotals, LineItemInput, PaginatedResponse, Pagination, WeightUnit,
};

#[derive(Clone)]
pub struct InvoiceService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    company_id: Uuid,
    branch_id: Option<Uuid>,
    customer_id: Uuid,
    invoice_number: String,
    status: String,
    payment_status: String,
    subtotal: Decimal,
    delivery_total: Decimal,
    tax_total: Decimal,
    total_amount: Decimal,
    amount_paid: Decimal,
    issued_at: Option<DateTime<Utc>>,
    due_date: Option<NaiveDate>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = AppError;

    fn try_from(row: InvoiceRow) -> AppResult<Self> {
        Ok(Invoice {
            status: parse_status("invoices.status", &row.status, InvoiceStatus::from_str)?,
            payment_status: parse_status(
                "invoices.payment_status",
                &row.payment_status,
                PaymentStatus::from_str,
            )?,
            id: row.id,
            company_id: row.company_id,
            branch_id: row.branch_id,
            customer_id: row.customer_id,
            invoice_number: row.invoice_number,
            subtotal: row.subtotal,
            delivery_total: row.delivery_total,
            tax_total: row.tax_total,
            total_amount: row.total_amount,
            amount_paid: row.amount_paid,
            issued_at: row.issued_at,
            due_date: row.due_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A priced invoice line as stored
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub line_no: i32,
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub weight_per_unit: Decimal,
    pub weight_unit: String,
    pub tax_rate: Decimal,
    pub base_price: Decimal,
    pub delivery_charge: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub tier_id: Option<Uuid>,
    pub tier_name: Option<String>,
}

/// Money received against an invoice
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InvoicePayment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Invoice with its lines and payments
#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub customer_name: String,
    pub balance_due: Decimal,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<InvoicePayment>,
}

/// Invoice row in list views
#[derive(Debug, Serialize)]
pub struct InvoiceListItem {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub customer_name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceListRow {
    #[sqlx(flatten)]
    invoice: InvoiceRow,
    customer_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub customer_id: Option<Uuid>,
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// One requested line. With a `product_id` the product supplies any field
/// left out; without one, `description` and `unit_price` are required.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvoiceItemInput {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 500, message = "Description must be 1-500 characters"))]
    pub description: Option<String>,
    pub quantity: Decimal,
    #[validate(custom = "shared::check_non_negative")]
    pub unit_price: Option<Decimal>,
    #[validate(custom = "shared::check_non_negative")]
    pub weight_per_unit: Option<Decimal>,
    pub weight_unit: Option<WeightUnit>,
    #[validate(custom = "shared::check_tax_rate")]
    pub tax_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceInput {
    pub customer_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Issue immediately (default) or keep as a draft
    #[serde(default = "default_issue")]
    pub issue: bool,
    #[validate(length(min = 1, message = "An invoice needs at least one line"))]
    pub items: Vec<InvoiceItemInput>,
}

fn default_issue() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentInput {
    #[validate(custom = "shared::check_payment_amount")]
    pub amount: Decimal,
    #[serde(default)]
    pub method: PaymentMethod,
    #[validate(length(max = 100, message = "Reference is too long"))]
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// A line ready to be priced and stored
#[derive(Debug, Clone)]
struct ResolvedLine {
    product_id: Option<Uuid>,
    description: String,
    input: LineItemInput,
}

/// Fill a requested line from its product and the company default tax rate
fn resolve_line(
    item: &InvoiceItemInput,
    product: Option<&Product>,
    default_tax_rate: Decimal,
) -> AppResult<ResolvedLine> {
    let (description, unit_price) = match product {
        Some(product) => (
            item.description.clone().unwrap_or_else(|| product.name.clone()),
            item.unit_price.unwrap_or(product.base_price),
        ),
        None => (
            item.description
                .clone()
                .ok_or_else(|| AppError::validation("description", "Description is required"))?,
            item.unit_price
                .ok_or_else(|| AppError::validation("unit_price", "Unit price is required"))?,
        ),
    };

    Ok(ResolvedLine {
        product_id: product.map(|p| p.id),
        description,
        input: LineItemInput {
            unit_price,
            quantity: item.quantity,
            weight_per_unit: item
                .weight_per_unit
                .or(product.map(|p| p.weight_per_unit))
                .unwrap_or(Decimal::ZERO),
            weight_unit: item
                .weight_unit
                .or(product.map(|p| p.weight_unit))
                .unwrap_or_default(),
            tax_rate: item
                .tax_rate
                .or(product.map(|p| p.tax_rate))
                .unwrap_or(default_tax_rate),
        },
    })
}

/// Price every line and add them up
fn price_lines(
    lines: &[ResolvedLine],
    tiers: &[shared::WeightPricingTier],
) -> AppResult<(Vec<DeliveryCalculation>, DocumentTotals)> {
    let calculations = lines
        .iter()
        .map(|line| compose_line_total(&line.input, tiers))
        .collect::<Result<Vec<_>, _>>()?;
    let totals = sum_lines(&calculations)?;
    Ok((calculations, totals))
}

const INVOICE_COLUMNS: &str = "i.id, i.company_id, i.branch_id, i.customer_id, i.invoice_number, \
     i.status, i.payment_status, i.subtotal, i.delivery_total, i.tax_total, i.total_amount, \
     i.amount_paid, i.issued_at, i.due_date, i.notes, i.created_at, i.updated_at";

/// Lock an invoice row for the rest of the transaction.
///
/// Anything that also locks rows of an invoice's verifications takes this
/// lock first.
pub(crate) async fn lock_invoice(conn: &mut PgConnection, company_id: Uuid, invoice_id: Uuid) -> AppResult<Invoice> {
    sqlx::query_as::<_, InvoiceRow>(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices i WHERE i.id = $1 AND i.company_id = $2 FOR UPDATE"
    ))
    .bind(invoice_id)
    .bind(company_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?
    .try_into()
}

/// Record a payment inside the caller's transaction and roll up the invoice.
///
/// Returns the new payment id. Used directly by the payment endpoint and by
/// payment verification.
pub async fn record_payment_in_tx(
    conn: &mut PgConnection,
    company_id: Uuid,
    invoice_id: Uuid,
    recorded_by: Uuid,
    input: &RecordPaymentInput,
) -> AppResult<Uuid> {
    let invoice = lock_invoice(&mut *conn, company_id, invoice_id).await?;
    invoice.status.ensure_accepts_payment()?;

    let payment_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO invoice_payments (company_id, invoice_id, amount, method, reference, paid_at, notes, recorded_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(company_id)
    .bind(invoice_id)
    .bind(input.amount)
    .bind(input.method.as_str())
    .bind(&input.reference)
    .bind(input.paid_at.unwrap_or_else(Utc::now))
    .bind(&input.notes)
    .bind(recorded_by)
    .fetch_one(&mut *conn)
    .await?;

    let amount_paid = invoice.amount_paid + input.amount;
    let payment_status = rollup_payment_status(invoice.total_amount, amount_paid);

    sqlx::query(
        r#"
        UPDATE invoices
        SET amount_paid = $1, payment_status = $2, updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(amount_paid)
    .bind(payment_status.as_str())
    .bind(invoice_id)
    .execute(&mut *conn)
    .await?;

    adjust_balance(&mut *conn, company_id, invoice.customer_id, -input.amount).await?;

    tracing::info!(
        %invoice_id,
        %payment_id,
        amount = %input.amount,
        payment_status = payment_status.as_str(),
        "Payment recorded"
    );

    Ok(payment_id)
}

impl InvoiceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Price, number and store a new invoice
    pub async fn create_invoice(
        &self,
        company_id: Uuid,
        created_by: Uuid,
        default_tax_rate: Decimal,
        input: CreateInvoiceInput,
    ) -> AppResult<InvoiceDetail> {
        input.validate()?;
        for item in &input.items {
            item.validate()?;
        }

        let customer_active = sqlx::query_scalar::<_, bool>(
            "SELECT is_active FROM customers WHERE id = $1 AND company_id = $2",
        )
        .bind(input.customer_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        if !customer_active {
            return Err(AppError::validation("customer_id", "Customer is inactive"));
        }

        let products = ProductService::new(self.db.clone());
        let mut lines = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let product = match item.product_id {
                Some(product_id) => Some(products.get_product(company_id, product_id).await?),
                None => None,
            };
            lines.push(resolve_line(item, product.as_ref(), default_tax_rate)?);
        }

        let tiers = PricingTierService::new(self.db.clone())
            .active_tiers(company_id)
            .await?;
        let (calculations, totals) = price_lines(&lines, &tiers)?;

        let status = if input.issue {
            InvoiceStatus::Issued
        } else {
            InvoiceStatus::Draft
        };
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        let sequence = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO invoice_sequences (company_id, year, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (company_id, year)
            DO UPDATE SET last_value = invoice_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(company_id)
        .bind(now.year())
        .fetch_one(&mut *tx)
        .await?;
        let invoice_number = format_invoice_number(now.year(), sequence);

        let invoice_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO invoices (
                company_id, branch_id, customer_id, invoice_number, status, payment_status,
                subtotal, delivery_total, tax_total, total_amount, amount_paid, total_weight_kg,
                issued_at, due_date, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, 'unpaid', $6, $7, $8, $9, 0, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(input.branch_id)
        .bind(input.customer_id)
        .bind(&invoice_number)
        .bind(status.as_str())
        .bind(totals.subtotal)
        .bind(totals.delivery_total)
        .bind(totals.tax_total)
        .bind(totals.total_amount)
        .bind(totals.total_weight_kg)
        .bind(input.issue.then_some(now))
        .bind(input.due_date)
        .bind(&input.notes)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        for (index, (line, calculation)) in lines.iter().zip(&calculations).enumerate() {
            let priced = calculation.rounded();
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    invoice_id, line_no, product_id, description, quantity, unit_price,
                    weight_per_unit, weight_unit, tax_rate, base_price, delivery_charge,
                    tax_amount, total_amount, tier_id, tier_name
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                "#,
            )
            .bind(invoice_id)
            .bind(index as i32 + 1)
            .bind(line.product_id)
            .bind(&line.description)
            .bind(line.input.quantity)
            .bind(line.input.unit_price)
            .bind(line.input.weight_per_unit)
            .bind(line.input.weight_unit.as_str())
            .bind(line.input.tax_rate)
            .bind(priced.base_price)
            .bind(priced.delivery_charge)
            .bind(priced.tax_amount)
            .bind(priced.total_amount)
            .bind(priced.tier_used.as_ref().map(|t| t.id))
            .bind(priced.tier_used.as_ref().map(|t| t.name.clone()))
            .execute(&mut *tx)
            .await?;
        }

        if status == InvoiceStatus::Issued {
            adjust_balance(&mut *tx, company_id, input.customer_id, totals.total_amount).await?;
        }

        tx.commit().await?;

        tracing::info!(
            %company_id,
            %invoice_id,
            %invoice_number,
            total = %totals.total_amount,
            status = status.as_str(),
            "Invoice created"
        );

        self.get_invoice(company_id, invoice_id).await
    }

    pub async fn list_invoices(
        &self,
        company_id: Uuid,
        query: InvoiceQuery,
    ) -> AppResult<PaginatedResponse<InvoiceListItem>> {
        let page = Pagination::from_query(query.page, query.per_page);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let filter = r#"
            FROM invoices i
            JOIN customers c ON c.id = i.customer_id
            WHERE i.company_id = $1
              AND ($2::text IS NULL OR i.status = $2)
              AND ($3::text IS NULL OR i.payment_status = $3)
              AND ($4::uuid IS NULL OR i.customer_id = $4)
              AND ($5::text IS NULL OR i.invoice_number ILIKE $5 OR c.name ILIKE $5)
              AND ($6::date IS NULL OR i.created_at::date >= $6)
              AND ($7::date IS NULL OR i.created_at::date <= $7)
        "#;

        let status = query.status.map(|s| s.as_str());
        let payment_status = query.payment_status.map(|s| s.as_str());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {filter}"))
            .bind(company_id)
            .bind(status)
            .bind(payment_status)
            .bind(query.customer_id)
            .bind(&search)
            .bind(query.start_date)
            .bind(query.end_date)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, InvoiceListRow>(&format!(
            "SELECT {INVOICE_COLUMNS}, c.name AS customer_name {filter} \
             ORDER BY i.created_at DESC LIMIT $8 OFFSET $9"
        ))
        .bind(company_id)
        .bind(status)
        .bind(payment_status)
        .bind(query.customer_id)
        .bind(&search)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(|row| {
                Ok(InvoiceListItem {
                    invoice: row.invoice.try_into()?,
                    customer_name: row.customer_name,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(data, &page, total as u64))
    }

    pub async fn get_invoice(&self, company_id: Uuid, invoice_id: Uuid) -> AppResult<InvoiceDetail> {
        let row = sqlx::query_as::<_, InvoiceListRow>(&format!(
            "SELECT {INVOICE_COLUMNS}, c.name AS customer_name \
             FROM invoices i JOIN customers c ON c.id = i.customer_id \
             WHERE i.id = $1 AND i.company_id = $2"
        ))
        .bind(invoice_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT id, invoice_id, line_no, product_id, description, quantity, unit_price,
                   weight_per_unit, weight_unit, tax_rate, base_price, delivery_charge,
                   tax_amount, total_amount, tier_id, tier_name
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY line_no ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.db)
        .await?;

        let payments = sqlx::query_as::<_, InvoicePayment>(
            r#"
            SELECT id, invoice_id, amount, method, reference, paid_at, notes, recorded_by, created_at
            FROM invoice_payments
            WHERE invoice_id = $1
            ORDER BY paid_at ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.db)
        .await?;

        let invoice: Invoice = row.invoice.try_into()?;
        Ok(InvoiceDetail {
            balance_due: invoice.balance_due(),
            invoice,
            customer_name: row.customer_name,
            items,
            payments,
        })
    }

    /// Issue a draft; the customer now owes the total
    pub async fn issue_invoice(&self, company_id: Uuid, invoice_id: Uuid) -> AppResult<InvoiceDetail> {
        let mut tx = self.db.begin().await?;
        let invoice = lock_invoice(&mut tx, company_id, invoice_id).await?;
        let next = invoice.status.issue()?;

        sqlx::query(
            "UPDATE invoices SET status = $1, issued_at = NOW(), updated_at = NOW() WHERE id = $2",
        )
        .bind(next.as_str())
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

        adjust_balance(&mut tx, company_id, invoice.customer_id, invoice.total_amount).await?;
        tx.commit().await?;

        tracing::info!(%invoice_id, "Invoice issued");

        self.get_invoice(company_id, invoice_id).await
    }

    pub async fn record_payment(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        recorded_by: Uuid,
        input: RecordPaymentInput,
    ) -> AppResult<InvoiceDetail> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        record_payment_in_tx(&mut tx, company_id, invoice_id, recorded_by, &input).await?;
        tx.commit().await?;

        self.get_invoice(company_id, invoice_id).await
    }

    /// Cancel an invoice that has no payments
    pub async fn cancel_invoice(&self, company_id: Uuid, invoice_id: Uuid) -> AppResult<InvoiceDetail> {
        let mut tx = self.db.begin().await?;
        let invoice = lock_invoice(&mut tx, company_id, invoice_id).await?;

        if invoice.amount_paid > Decimal::ZERO {
            return Err(AppError::validation(
                "invoice_id",
                "Cannot cancel an invoice that has payments",
            ));
        }
        let next = invoice.status.cancel()?;

        sqlx::query("UPDATE invoices SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(next.as_str())
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;

        if invoice.status == InvoiceStatus::Issued {
            adjust_balance(&mut tx, company_id, invoice.customer_id, -invoice.total_amount).await?;
        }

        // Claims against a cancelled invoice can no longer be verified
        sqlx::query(
            r#"
            UPDATE payment_verifications
            SET status = 'rejected', rejection_reason = 'Invoice cancelled', updated_at = NOW()
            WHERE invoice_id = $1 AND status = 'pending'
            "#,
        )
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%invoice_id, "Invoice cancelled");

        self.get_invoice(company_id, invoice_id).await
    }
}
