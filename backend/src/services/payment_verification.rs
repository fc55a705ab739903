//! Payment verification: customers' claimed bank transfers, confirmed by staff

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{parse_status, InvoiceStatus, PaymentMethod, PaymentVerification, VerificationStatus};
use crate::services::invoice::{lock_invoice, record_payment_in_tx, RecordPaymentInput};
use shared::{PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct PaymentVerificationService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct VerificationRow {
    id: Uuid,
    company_id: Uuid,
    invoice_id: Uuid,
    amount: Decimal,
    bank_name: String,
    reference: String,
    transferred_at: DateTime<Utc>,
    proof_url: Option<String>,
    notes: Option<String>,
    status: String,
    rejection_reason: Option<String>,
    invoice_payment_id: Option<Uuid>,
    submitted_by: Option<Uuid>,
    verified_by: Option<Uuid>,
    verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VerificationRow> for PaymentVerification {
    type Error = AppError;

    fn try_from(row: VerificationRow) -> AppResult<Self> {
        Ok(PaymentVerification {
            status: parse_status(
                "payment_verifications.status",
                &row.status,
                VerificationStatus::from_str,
            )?,
            id: row.id,
            company_id: row.company_id,
            invoice_id: row.invoice_id,
            amount: row.amount,
            bank_name: row.bank_name,
            reference: row.reference,
            transferred_at: row.transferred_at,
            proof_url: row.proof_url,
            notes: row.notes,
            rejection_reason: row.rejection_reason,
            invoice_payment_id: row.invoice_payment_id,
            submitted_by: row.submitted_by,
            verified_by: row.verified_by,
            verified_at: row.verified_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VerificationQuery {
    pub status: Option<VerificationStatus>,
    pub invoice_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitVerificationInput {
    pub invoice_id: Uuid,
    #[validate(custom = "shared::check_payment_amount")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 100, message = "Bank name is required"))]
    pub bank_name: String,
    #[validate(length(min = 1, max = 100, message = "Transfer reference is required"))]
    pub reference: String,
    pub transferred_at: DateTime<Utc>,
    #[validate(url(message = "Proof must be a URL"))]
    pub proof_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RejectVerificationInput {
    #[validate(length(min = 1, max = 500, message = "A rejection reason is required"))]
    pub reason: String,
}

const VERIFICATION_COLUMNS: &str = "id, company_id, invoice_id, amount, bank_name, reference, \
     transferred_at, proof_url, notes, status, rejection_reason, invoice_payment_id, \
     submitted_by, verified_by, verified_at, created_at, updated_at";

/// The invoice payment recorded when a claim is verified
fn payment_for(verification: &PaymentVerification) -> RecordPaymentInput {
    RecordPaymentInput {
        amount: verification.amount,
        method: PaymentMethod::BankTransfer,
        reference: Some(verification.reference.clone()),
        paid_at: Some(verification.transferred_at),
        notes: Some(format!("Verified transfer from {}", verification.bank_name)),
    }
}

async fn lock_verification(
    conn: &mut PgConnection,
    company_id: Uuid,
    verification_id: Uuid,
) -> AppResult<PaymentVerification> {
    sqlx::query_as::<_, VerificationRow>(&format!(
        "SELECT {VERIFICATION_COLUMNS} FROM payment_verifications \
         WHERE id = $1 AND company_id = $2 FOR UPDATE"
    ))
    .bind(verification_id)
    .bind(company_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Payment verification".to_string()))?
    .try_into()
}

impl PaymentVerificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        query: VerificationQuery,
    ) -> AppResult<PaginatedResponse<PaymentVerification>> {
        let page = Pagination::from_query(query.page, query.per_page);
        let status = query.status.map(|s| s.as_str());

        let filter = r#"
            WHERE company_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR invoice_id = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM payment_verifications {filter}"
        ))
        .bind(company_id)
        .bind(status)
        .bind(query.invoice_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, VerificationRow>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM payment_verifications {filter} \
             ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(company_id)
        .bind(status)
        .bind(query.invoice_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(PaymentVerification::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PaginatedResponse::new(data, &page, total as u64))
    }

    pub async fn get(&self, company_id: Uuid, verification_id: Uuid) -> AppResult<PaymentVerification> {
        sqlx::query_as::<_, VerificationRow>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM payment_verifications WHERE id = $1 AND company_id = $2"
        ))
        .bind(verification_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment verification".to_string()))?
        .try_into()
    }

    /// Record a claimed transfer as pending
    pub async fn submit(
        &self,
        company_id: Uuid,
        submitted_by: Uuid,
        input: SubmitVerificationInput,
    ) -> AppResult<PaymentVerification> {
        input.validate()?;

        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM invoices WHERE id = $1 AND company_id = $2",
        )
        .bind(input.invoice_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        parse_status("invoices.status", &status, InvoiceStatus::from_str)?
            .ensure_accepts_payment()?;

        let verification: PaymentVerification = sqlx::query_as::<_, VerificationRow>(&format!(
            "INSERT INTO payment_verifications \
             (company_id, invoice_id, amount, bank_name, reference, transferred_at, proof_url, notes, submitted_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {VERIFICATION_COLUMNS}"
        ))
        .bind(company_id)
        .bind(input.invoice_id)
        .bind(input.amount)
        .bind(&input.bank_name)
        .bind(&input.reference)
        .bind(input.transferred_at)
        .bind(&input.proof_url)
        .bind(&input.notes)
        .bind(submitted_by)
        .fetch_one(&self.db)
        .await?
        .try_into()?;

        tracing::info!(
            verification_id = %verification.id,
            invoice_id = %verification.invoice_id,
            amount = %verification.amount,
            "Payment verification submitted"
        );

        Ok(verification)
    }

    /// Confirm a claim and turn it into an invoice payment, atomically
    pub async fn verify(
        &self,
        company_id: Uuid,
        verification_id: Uuid,
        verified_by: Uuid,
    ) -> AppResult<PaymentVerification> {
        // invoice_id is fixed at submission; lock the invoice before the
        // claim, in the same order cancellation takes them
        let invoice_id = self.get(company_id, verification_id).await?.invoice_id;

        let mut tx = self.db.begin().await?;

        lock_invoice(&mut tx, company_id, invoice_id).await?;
        let verification = lock_verification(&mut tx, company_id, verification_id).await?;
        let next = verification.status.verify()?;

        let payment_id = record_payment_in_tx(
            &mut tx,
            company_id,
            verification.invoice_id,
            verified_by,
            &payment_for(&verification),
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE payment_verifications
            SET status = $1, invoice_payment_id = $2, verified_by = $3, verified_at = NOW(), updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(next.as_str())
        .bind(payment_id)
        .bind(verified_by)
        .bind(verification_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%verification_id, %payment_id, %verified_by, "Payment verified");

        self.get(company_id, verification_id).await
    }

    pub async fn reject(
        &self,
        company_id: Uuid,
        verification_id: Uuid,
        verified_by: Uuid,
        input: RejectVerificationInput,
    ) -> AppResult<PaymentVerification> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let verification = lock_verification(&mut tx, company_id, verification_id).await?;
        let next = verification.status.reject()?;

        sqlx::query(
            r#"
            UPDATE payment_verifications
            SET status = $1, rejection_reason = $2, verified_by = $3, verified_at = NOW(), updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(next.as_str())
        .bind(input.reason.trim())
        .bind(verified_by)
        .bind(verification_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%verification_id, %verified_by, "Payment verification rejected");

        self.get(company_id, verification_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn claim() -> PaymentVerification {
        PaymentVerification {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            amount: dec!(1250.00),
            bank_name: "City Bank".into(),
            reference: "TRX-889123".into(),
            transferred_at: Utc::now(),
            proof_url: None,
            notes: None,
            status: VerificationStatus::Pending,
            rejection_reason: None,
            invoice_payment_id: None,
            submitted_by: None,
            verified_by: None,
            verified_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn verified_claim_becomes_bank_transfer_payment() {
        let verification = claim();
        let payment = payment_for(&verification);
        assert_eq!(payment.amount, dec!(1250.00));
        assert_eq!(payment.method, PaymentMethod::BankTransfer);
        assert_eq!(payment.reference.as_deref(), Some("TRX-889123"));
        assert_eq!(payment.paid_at, Some(verification.transferred_at));
    }

    #[test]
    fn reject_needs_a_reason() {
        let input = RejectVerificationInput { reason: String::new() };
        assert!(input.validate().is_err());
    }

    #[test]
    fn submit_rejects_sub_cent_amounts() {
        let input = SubmitVerificationInput {
            invoice_id: Uuid::new_v4(),
            amount: dec!(10.001),
            bank_name: "City Bank".into(),
            reference: "X1".into(),
            transferred_at: Utc::now(),
            proof_url: Some("https://files.example.com/slip.png".into()),
            notes: None,
        };
        assert!(input.validate().unwrap_err().field_errors().contains_key("amount"));
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL"]
    async fn verify_racing_cancel_settles_one_way() {
        use crate::services::invoice::InvoiceService;
        use crate::services::test_support;

        let Some(pool) = test_support::pool().await else {
            return;
        };

        for round in 0..20 {
            let tenant = test_support::tenant(&pool).await;
            let number = format!("INV-2026-{:05}", round + 1);
            let invoice_id = test_support::invoice(&pool, &tenant, &number, "issued", dec!(100)).await;
            let claim_id = test_support::pending_claim(&pool, &tenant, invoice_id, dec!(100)).await;

            let verifications = PaymentVerificationService::new(pool.clone());
            let invoices = InvoiceService::new(pool.clone());
            let (verified, cancelled) = tokio::join!(
                verifications.verify(tenant.company_id, claim_id, tenant.user_id),
                invoices.cancel_invoice(tenant.company_id, invoice_id),
            );

            assert!(!matches!(verified, Err(AppError::DatabaseError(_))), "{verified:?}");
            assert!(!matches!(cancelled, Err(AppError::DatabaseError(_))), "{cancelled:?}");
            assert_ne!(verified.is_ok(), cancelled.is_ok());
        }
    }
}
