//! Company profile and branch management

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{Branch, Company};

#[derive(Clone)]
pub struct CompanyService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    company_code: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            id: row.id,
            name: row.name,
            company_code: row.company_code,
            email: row.email,
            phone: row.phone,
            address: row.address,
            currency: row.currency,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BranchRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    code: String,
    address: Option<String>,
    phone: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BranchRow> for Branch {
    fn from(row: BranchRow) -> Self {
        Branch {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            code: row.code,
            address: row.address,
            phone: row.phone,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for updating the company profile; the company code is immutable
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyInput {
    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(custom = "shared::check_phone")]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter ISO code"))]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBranchInput {
    #[validate(length(min = 1, max = 200, message = "Branch name is required"))]
    pub name: String,
    #[validate(custom = "shared::check_company_code")]
    pub code: String,
    pub address: Option<String>,
    #[validate(custom = "shared::check_phone")]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBranchInput {
    #[validate(length(min = 1, max = 200, message = "Branch name is required"))]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(custom = "shared::check_phone")]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

const BRANCH_COLUMNS: &str =
    "id, company_id, name, code, address, phone, is_active, created_at, updated_at";

impl CompanyService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_company(&self, company_id: Uuid) -> AppResult<Company> {
        let row = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, name, company_code, email, phone, address, currency, created_at, updated_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company".to_string()))?;

        Ok(row.into())
    }

    pub async fn update_company(
        &self,
        company_id: Uuid,
        input: UpdateCompanyInput,
    ) -> AppResult<Company> {
        input.validate()?;
        let existing = self.get_company(company_id).await?;

        sqlx::query(
            r#"
            UPDATE companies
            SET name = $1, email = $2, phone = $3, address = $4, currency = $5, updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(input.name.unwrap_or(existing.name))
        .bind(input.email.or(existing.email))
        .bind(input.phone.or(existing.phone))
        .bind(input.address.or(existing.address))
        .bind(input.currency.map(|c| c.to_uppercase()).unwrap_or(existing.currency))
        .bind(company_id)
        .execute(&self.db)
        .await?;

        self.get_company(company_id).await
    }

    /// Branches of a company, active ones first
    pub async fn list_branches(&self, company_id: Uuid) -> AppResult<Vec<Branch>> {
        let rows = sqlx::query_as::<_, BranchRow>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE company_id = $1 \
             ORDER BY is_active DESC, name ASC"
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Branch::from).collect())
    }

    pub async fn get_branch(&self, company_id: Uuid, branch_id: Uuid) -> AppResult<Branch> {
        let row = sqlx::query_as::<_, BranchRow>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE id = $1 AND company_id = $2"
        ))
        .bind(branch_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch".to_string()))?;

        Ok(row.into())
    }

    pub async fn create_branch(
        &self,
        company_id: Uuid,
        input: CreateBranchInput,
    ) -> AppResult<Branch> {
        input.validate()?;

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM branches WHERE company_id = $1 AND code = $2)",
        )
        .bind(company_id)
        .bind(&input.code)
        .fetch_one(&self.db)
        .await?;

        if taken {
            return Err(AppError::conflict("branch", "Branch code already exists"));
        }

        let row = sqlx::query_as::<_, BranchRow>(&format!(
            "INSERT INTO branches (company_id, name, code, address, phone) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {BRANCH_COLUMNS}"
        ))
        .bind(company_id)
        .bind(&input.name)
        .bind(&input.code)
        .bind(&input.address)
        .bind(&input.phone)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%company_id, branch_id = %row.id, "Branch created");

        Ok(row.into())
    }

    pub async fn update_branch(
        &self,
        company_id: Uuid,
        branch_id: Uuid,
        input: UpdateBranchInput,
    ) -> AppResult<Branch> {
        input.validate()?;
        let existing = self.get_branch(company_id, branch_id).await?;

        let row = sqlx::query_as::<_, BranchRow>(&format!(
            "UPDATE branches SET name = $1, address = $2, phone = $3, is_active = $4, \
             updated_at = NOW() WHERE id = $5 AND company_id = $6 RETURNING {BRANCH_COLUMNS}"
        ))
        .bind(input.name.unwrap_or(existing.name))
        .bind(input.address.or(existing.address))
        .bind(input.phone.or(existing.phone))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(branch_id)
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Deactivate a branch; branch rows stay because invoices reference them
    pub async fn deactivate_branch(&self, company_id: Uuid, branch_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE branches SET is_active = false, updated_at = NOW() WHERE id = $1 AND company_id = $2",
        )
        .bind(branch_id)
        .bind(company_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Branch".to_string()));
        }

        tracing::info!(%company_id, %branch_id, "Branch deactivated");
        Ok(())
    }
}
