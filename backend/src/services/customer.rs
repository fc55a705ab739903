//! Customer management and outstanding balances

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::Customer;
use shared::{PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    company_id: Uuid,
    branch_id: Option<Uuid>,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    balance: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            company_id: row.company_id,
            branch_id: row.branch_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            balance: row.balance,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Query parameters for listing customers
#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub branch_id: Option<Uuid>,
    pub include_inactive: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub name: String,
    pub branch_id: Option<Uuid>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(custom = "shared::check_phone")]
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCustomerInput {
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub name: Option<String>,
    pub branch_id: Option<Uuid>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(custom = "shared::check_phone")]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

const CUSTOMER_COLUMNS: &str = "id, company_id, branch_id, name, email, phone, address, \
     balance, is_active, created_at, updated_at";

/// Move a customer's outstanding balance by `delta` inside the caller's transaction
pub async fn adjust_balance(
    conn: &mut PgConnection,
    company_id: Uuid,
    customer_id: Uuid,
    delta: Decimal,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET balance = balance + $1, updated_at = NOW()
        WHERE id = $2 AND company_id = $3
        "#,
    )
    .bind(delta)
    .bind(customer_id)
    .bind(company_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Customer".to_string()));
    }

    tracing::debug!(%customer_id, %delta, "Customer balance adjusted");
    Ok(())
}

impl CustomerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Customers of a company, filtered by name/email search, paginated
    pub async fn list_customers(
        &self,
        company_id: Uuid,
        query: CustomerQuery,
    ) -> AppResult<PaginatedResponse<Customer>> {
        let page = Pagination::from_query(query.page, query.per_page);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let include_inactive = query.include_inactive.unwrap_or(false);

        let filter = r#"
            WHERE company_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2)
              AND ($3::uuid IS NULL OR branch_id = $3)
              AND ($4 OR is_active = true)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM customers {filter}"))
            .bind(company_id)
            .bind(&search)
            .bind(query.branch_id)
            .bind(include_inactive)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers {filter} ORDER BY name ASC LIMIT $5 OFFSET $6"
        ))
        .bind(company_id)
        .bind(&search)
        .bind(query.branch_id)
        .bind(include_inactive)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows.into_iter().map(Customer::from).collect();
        Ok(PaginatedResponse::new(data, &page, total as u64))
    }

    pub async fn get_customer(&self, company_id: Uuid, customer_id: Uuid) -> AppResult<Customer> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1 AND company_id = $2"
        ))
        .bind(customer_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

        Ok(row.into())
    }

    async fn ensure_branch(&self, company_id: Uuid, branch_id: Option<Uuid>) -> AppResult<()> {
        let Some(branch_id) = branch_id else {
            return Ok(());
        };

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1 AND company_id = $2)",
        )
        .bind(branch_id)
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::validation("branch_id", "Branch does not belong to this company"));
        }
        Ok(())
    }

    pub async fn create_customer(
        &self,
        company_id: Uuid,
        input: CreateCustomerInput,
    ) -> AppResult<Customer> {
        input.validate()?;
        self.ensure_branch(company_id, input.branch_id).await?;

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "INSERT INTO customers (company_id, branch_id, name, email, phone, address) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(company_id)
        .bind(input.branch_id)
        .bind(input.name.trim())
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%company_id, customer_id = %row.id, "Customer created");

        Ok(row.into())
    }

    /// Update contact details; the balance only moves through invoices and payments
    pub async fn update_customer(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> AppResult<Customer> {
        input.validate()?;
        self.ensure_branch(company_id, input.branch_id).await?;
        let existing = self.get_customer(company_id, customer_id).await?;

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "UPDATE customers SET name = $1, branch_id = $2, email = $3, phone = $4, \
             address = $5, is_active = $6, updated_at = NOW() \
             WHERE id = $7 AND company_id = $8 RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(input.name.unwrap_or(existing.name))
        .bind(input.branch_id.or(existing.branch_id))
        .bind(input.email.or(existing.email))
        .bind(input.phone.or(existing.phone))
        .bind(input.address.or(existing.address))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(customer_id)
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    pub async fn deactivate_customer(&self, company_id: Uuid, customer_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE customers SET is_active = false, updated_at = NOW() WHERE id = $1 AND company_id = $2",
        )
        .bind(customer_id)
        .bind(company_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Customer".to_string()));
        }

        tracing::info!(%company_id, %customer_id, "Customer deactivated");
        Ok(())
    }
}
