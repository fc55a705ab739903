//! Postgres fixtures for service tests that need a real database.
//!
//! Tests using these are `#[ignore]`d and skip themselves unless
//! `TEST_DATABASE_URL` points at a disposable database.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Migrated pool on `TEST_DATABASE_URL`, or `None` when it is not set
pub async fn pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPool::connect(&url).await.expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

/// A fresh company with one user and one customer
pub struct Tenant {
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub customer_id: Uuid,
}

pub async fn tenant(pool: &PgPool) -> Tenant {
    let tag = Uuid::new_v4().simple().to_string();
    let code = format!("T{}", &tag[..8]).to_uppercase();

    let company_id: Uuid = sqlx::query_scalar(
        "INSERT INTO companies (name, company_code) VALUES ($1, $2) RETURNING id",
    )
    .bind(format!("Press {}", code))
    .bind(&code)
    .fetch_one(pool)
    .await
    .expect("insert company");

    let role_id: Uuid = sqlx::query_scalar(
        "INSERT INTO roles (company_id, name, is_system_role) VALUES ($1, 'owner', TRUE) RETURNING id",
    )
    .bind(company_id)
    .fetch_one(pool)
    .await
    .expect("insert role");

    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (company_id, role_id, email, password_hash, name) \
         VALUES ($1, $2, $3, 'x', 'Owner') RETURNING id",
    )
    .bind(company_id)
    .bind(role_id)
    .bind(format!("{}@example.test", tag))
    .fetch_one(pool)
    .await
    .expect("insert user");

    let customer_id: Uuid = sqlx::query_scalar(
        "INSERT INTO customers (company_id, name) VALUES ($1, 'Corner Cafe') RETURNING id",
    )
    .bind(company_id)
    .fetch_one(pool)
    .await
    .expect("insert customer");

    Tenant {
        company_id,
        user_id,
        customer_id,
    }
}

/// Insert an unpaid invoice with the given status and total
pub async fn invoice(pool: &PgPool, tenant: &Tenant, number: &str, status: &str, total: Decimal) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO invoices (company_id, customer_id, invoice_number, status, \
         subtotal, delivery_total, tax_total, total_amount, issued_at) \
         VALUES ($1, $2, $3, $4, $5, 0, 0, $5, CASE WHEN $4 = 'draft' THEN NULL ELSE NOW() END) \
         RETURNING id",
    )
    .bind(tenant.company_id)
    .bind(tenant.customer_id)
    .bind(number)
    .bind(status)
    .bind(total)
    .fetch_one(pool)
    .await
    .expect("insert invoice")
}

/// Insert a pending transfer claim against an invoice
pub async fn pending_claim(pool: &PgPool, tenant: &Tenant, invoice_id: Uuid, amount: Decimal) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO payment_verifications \
         (company_id, invoice_id, amount, bank_name, reference, transferred_at, submitted_by) \
         VALUES ($1, $2, $3, 'City Bank', 'TRX-1', NOW(), $4) RETURNING id",
    )
    .bind(tenant.company_id)
    .bind(invoice_id)
    .bind(amount)
    .bind(tenant.user_id)
    .fetch_one(pool)
    .await
    .expect("insert verification")
}
