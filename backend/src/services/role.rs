//! Role management service for custom roles and permissions

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::default_roles;

/// Role service for managing custom roles
#[derive(Clone)]
pub struct RoleService {
    db: PgPool,
}

/// Role information
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_system_role: bool,
}

/// Permission information
#[derive(Debug, Serialize, Clone, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

/// Input for creating a custom role
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleInput {
    #[validate(length(min = 1, max = 50, message = "Role name must be 1-50 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permission_ids: Vec<Uuid>,
}

/// Input for updating a role
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleInput {
    #[validate(length(min = 1, max = 50, message = "Role name must be 1-50 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub permission_ids: Option<Vec<Uuid>>,
}

/// Role with its permissions
#[derive(Debug, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

fn is_reserved_name(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    default_roles().iter().any(|(reserved, _)| *reserved == name)
}

impl RoleService {
    /// Create a new RoleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get all roles for a company
    pub async fn get_roles(&self, company_id: Uuid) -> AppResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, company_id, name, description, is_system_role
            FROM roles
            WHERE company_id = $1
            ORDER BY is_system_role DESC, name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    async fn find_role(&self, company_id: Uuid, role_id: Uuid) -> AppResult<Role> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT id, company_id, name, description, is_system_role
            FROM roles
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(role_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Role".to_string()))
    }

    /// Get a role by ID with its permissions
    pub async fn get_role_with_permissions(
        &self,
        company_id: Uuid,
        role_id: Uuid,
    ) -> AppResult<RoleWithPermissions> {
        let role = self.find_role(company_id, role_id).await?;

        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.resource, p.action, p.description
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.resource, p.action
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(RoleWithPermissions { role, permissions })
    }

    /// Get all available permissions
    pub async fn get_all_permissions(&self) -> AppResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT id, resource, action, description
            FROM permissions
            ORDER BY resource, action
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    async fn ensure_permissions_exist(&self, permission_ids: &[Uuid]) -> AppResult<()> {
        if permission_ids.is_empty() {
            return Ok(());
        }

        let valid_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM permissions WHERE id = ANY($1)",
        )
        .bind(permission_ids)
        .fetch_one(&self.db)
        .await?;

        if valid_count != permission_ids.len() as i64 {
            return Err(AppError::validation(
                "permission_ids",
                "One or more permission IDs are invalid",
            ));
        }

        Ok(())
    }

    async fn ensure_unique_name(
        &self,
        company_id: Uuid,
        name: &str,
        exclude: Option<Uuid>,
    ) -> AppResult<()> {
        if is_reserved_name(name) {
            return Err(AppError::validation("name", "Cannot use reserved role name"));
        }

        let duplicate = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM roles
            WHERE company_id = $1 AND LOWER(name) = LOWER($2)
              AND ($3::uuid IS NULL OR id != $3)
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        if duplicate > 0 {
            return Err(AppError::conflict("role", "Role with this name already exists"));
        }

        Ok(())
    }

    /// Create a custom role
    pub async fn create_role(
        &self,
        company_id: Uuid,
        input: CreateRoleInput,
    ) -> AppResult<RoleWithPermissions> {
        input.validate()?;
        self.ensure_unique_name(company_id, &input.name, None).await?;
        self.ensure_permissions_exist(&input.permission_ids).await?;

        let mut tx = self.db.begin().await?;

        let role_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO roles (company_id, name, description, is_system_role)
            VALUES ($1, $2, $3, false)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await?;

        for permission_id in &input.permission_ids {
            sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
                .bind(role_id)
                .bind(permission_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(%company_id, %role_id, "Role created");

        self.get_role_with_permissions(company_id, role_id).await
    }

    /// Update a role; system roles only accept permission changes
    pub async fn update_role(
        &self,
        company_id: Uuid,
        role_id: Uuid,
        input: UpdateRoleInput,
    ) -> AppResult<RoleWithPermissions> {
        input.validate()?;
        let existing = self.find_role(company_id, role_id).await?;

        if existing.is_system_role && input.name.is_some() {
            return Err(AppError::validation("name", "Cannot rename system roles"));
        }

        if let Some(ref name) = input.name {
            self.ensure_unique_name(company_id, name, Some(role_id)).await?;
        }

        if let Some(ref permission_ids) = input.permission_ids {
            self.ensure_permissions_exist(permission_ids).await?;
        }

        let mut tx = self.db.begin().await?;

        if !existing.is_system_role {
            let name = input
                .name
                .map(|n| n.trim().to_string())
                .unwrap_or(existing.name);
            let description = input.description.or(existing.description);

            sqlx::query("UPDATE roles SET name = $1, description = $2 WHERE id = $3")
                .bind(&name)
                .bind(&description)
                .bind(role_id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(permission_ids) = input.permission_ids {
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
                .bind(role_id)
                .execute(&mut *tx)
                .await?;

            for permission_id in &permission_ids {
                sqlx::query(
                    "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)",
                )
                .bind(role_id)
                .bind(permission_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        self.get_role_with_permissions(company_id, role_id).await
    }

    /// Delete a custom role (system roles cannot be deleted)
    pub async fn delete_role(&self, company_id: Uuid, role_id: Uuid) -> AppResult<()> {
        let role = self.find_role(company_id, role_id).await?;

        if role.is_system_role {
            return Err(AppError::validation("role_id", "Cannot delete system roles"));
        }

        let user_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role_id = $1")
            .bind(role_id)
            .fetch_one(&self.db)
            .await?;

        if user_count > 0 {
            return Err(AppError::validation(
                "role_id",
                format!("Cannot delete role: {} users are assigned to it", user_count),
            ));
        }

        // role_permissions rows go with the role (ON DELETE CASCADE)
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(&self.db)
            .await?;

        tracing::info!(%company_id, %role_id, "Role deleted");

        Ok(())
    }
}
