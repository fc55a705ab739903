//! Staff account management within a company

use bcrypt::{hash, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// User as returned by the API (no password hash)
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub company_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub role_id: Uuid,
    pub role_name: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(custom = "shared::check_password")]
    pub password: String,
    pub role_id: Uuid,
    pub branch_id: Option<Uuid>,
    #[validate(custom = "shared::check_phone")]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: Option<String>,
    pub role_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    #[validate(custom = "shared::check_phone")]
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

const USER_COLUMNS: &str = r#"
    u.id, u.company_id, u.branch_id, u.role_id, r.name AS role_name, u.email, u.name,
    u.phone, u.is_active, u.last_login_at, u.created_at
"#;

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_users(&self, company_id: Uuid) -> AppResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(&format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id \
             WHERE u.company_id = $1 ORDER BY u.name"
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    pub async fn get_user(&self, company_id: Uuid, user_id: Uuid) -> AppResult<UserSummary> {
        sqlx::query_as::<_, UserSummary>(&format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id \
             WHERE u.company_id = $1 AND u.id = $2"
        ))
        .bind(company_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    async fn ensure_role_in_company(&self, company_id: Uuid, role_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1 AND company_id = $2)",
        )
        .bind(role_id)
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::validation("role_id", "Role does not belong to this company"));
        }
        Ok(())
    }

    async fn ensure_branch_in_company(&self, company_id: Uuid, branch_id: Uuid) -> AppResult<()> {
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

    pub async fn create_user(
        &self,
        company_id: Uuid,
        input: CreateUserInput,
    ) -> AppResult<UserSummary> {
        input.validate()?;
        self.ensure_role_in_company(company_id, input.role_id).await?;
        if let Some(branch_id) = input.branch_id {
            self.ensure_branch_in_company(company_id, branch_id).await?;
        }

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(&input.email)
        .fetch_one(&self.db)
        .await?;

        if taken {
            return Err(AppError::conflict("user", "Email is already registered"));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (company_id, branch_id, role_id, email, password_hash, name, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(input.branch_id)
        .bind(input.role_id)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.name)
        .bind(&input.phone)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%company_id, %user_id, "User created");

        self.get_user(company_id, user_id).await
    }

    pub async fn update_user(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        acting_user_id: Uuid,
        input: UpdateUserInput,
    ) -> AppResult<UserSummary> {
        input.validate()?;
        let existing = self.get_user(company_id, user_id).await?;

        if user_id == acting_user_id && input.is_active == Some(false) {
            return Err(AppError::validation("is_active", "You cannot deactivate your own account"));
        }
        if let Some(role_id) = input.role_id {
            self.ensure_role_in_company(company_id, role_id).await?;
        }
        if let Some(branch_id) = input.branch_id {
            self.ensure_branch_in_company(company_id, branch_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE users
            SET name = $1, role_id = $2, branch_id = $3, phone = $4, is_active = $5, updated_at = NOW()
            WHERE id = $6 AND company_id = $7
            "#,
        )
        .bind(input.name.unwrap_or(existing.name))
        .bind(input.role_id.unwrap_or(existing.role_id))
        .bind(input.branch_id.or(existing.branch_id))
        .bind(input.phone.or(existing.phone))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(user_id)
        .bind(company_id)
        .execute(&self.db)
        .await?;

        // A deactivated account must not keep refreshing its session
        if input.is_active == Some(false) {
            sqlx::query(
                "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
            )
            .bind(user_id)
            .execute(&self.db)
            .await?;
        }

        self.get_user(company_id, user_id).await
    }
}
