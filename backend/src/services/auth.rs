//! Authentication service for company registration, login, and token management

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use shared::{default_roles, DEFAULT_STAGE_TEMPLATES};

type HmacSha256 = Hmac<Sha256>;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for registering a new company with owner account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterCompanyInput {
    #[validate(length(min = 1, max = 200, message = "Company name is required"))]
    pub company_name: String,
    #[validate(custom = "shared::check_company_code")]
    pub company_code: String,
    #[validate(length(min = 1, max = 200, message = "Owner name is required"))]
    pub owner_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(custom = "shared::check_password")]
    pub password: String,
    #[validate(custom = "shared::check_phone")]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter ISO code"))]
    pub currency: Option<String>,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub company_id: String,
    pub role_id: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    company_id: Uuid,
    role_id: Uuid,
    password_hash: String,
    is_active: bool,
}

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected access token: {}", e);
        AppError::InvalidToken
    })
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register a new company with its default roles, stage templates and owner account
    pub async fn register_company(
        &self,
        input: RegisterCompanyInput,
        default_currency: &str,
    ) -> AppResult<RegisterResponse> {
        input.validate()?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM companies WHERE company_code = $1",
        )
        .bind(&input.company_code)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::conflict("company", "Company code already exists"));
        }

        let email_taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(&input.email)
        .fetch_one(&self.db)
        .await?;

        if email_taken > 0 {
            return Err(AppError::conflict("user", "Email is already registered"));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let currency = input
            .currency
            .as_deref()
            .unwrap_or(default_currency)
            .to_uppercase();

        let mut tx = self.db.begin().await?;

        let company_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO companies (name, company_code, email, phone, address, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&input.company_name)
        .bind(&input.company_code)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&currency)
        .fetch_one(&mut *tx)
        .await?;

        let mut owner_role_id = None;
        for (name, permissions) in default_roles() {
            let role_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO roles (company_id, name, is_system_role)
                VALUES ($1, $2, true)
                RETURNING id
                "#,
            )
            .bind(company_id)
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

            let keys: Vec<String> = permissions.iter().flat_map(|p| p.keys()).collect();
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                SELECT $1, id FROM permissions
                WHERE CONCAT(resource, ':', action) = ANY($2)
                "#,
            )
            .bind(role_id)
            .bind(&keys)
            .execute(&mut *tx)
            .await?;

            if name == "owner" {
                owner_role_id = Some(role_id);
            }
        }

        let owner_role_id = owner_role_id
            .ok_or_else(|| AppError::Internal("Default roles do not include owner".into()))?;

        for (index, (name, requires_approval)) in DEFAULT_STAGE_TEMPLATES.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO production_stage_templates (company_id, name, sort_order, requires_approval)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(company_id)
            .bind(name)
            .bind((index as i32 + 1) * 10)
            .bind(requires_approval)
            .execute(&mut *tx)
            .await?;
        }

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (company_id, role_id, email, password_hash, name, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(owner_role_id)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.owner_name)
        .bind(&input.phone)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%company_id, code = %input.company_code, "Company registered");

        let permissions = self.get_user_permissions(user_id).await?;
        let tokens = self.generate_tokens(user_id, company_id, owner_role_id, &permissions)?;
        self.store_refresh_token(user_id, &tokens.refresh_token).await?;

        Ok(RegisterResponse {
            company_id,
            user_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
        })
    }

    /// Authenticate user with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.company_id, u.role_id, u.password_hash, u.is_active
            FROM users u
            WHERE LOWER(u.email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".into()));
        }

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        let permissions = self.get_user_permissions(user.id).await?;
        let tokens = self.generate_tokens(user.id, user.company_id, user.role_id, &permissions)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(tokens)
    }

    /// Exchange a refresh token for a new token pair; the old refresh token is revoked
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = self.hash_token(refresh_token)?;

        let (user_id, company_id, role_id) = sqlx::query_as::<_, (Uuid, Uuid, Uuid)>(
            r#"
            SELECT rt.user_id, u.company_id, u.role_id
            FROM refresh_tokens rt
            JOIN users u ON u.id = rt.user_id
            WHERE rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".into()))?;

        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.db)
            .await?;

        let permissions = self.get_user_permissions(user_id).await?;
        let tokens = self.generate_tokens(user_id, company_id, role_id, &permissions)?;
        self.store_refresh_token(user_id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    /// Get user permissions from database
    async fn get_user_permissions(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        let permissions = sqlx::query_scalar::<_, String>(
            r#"
            SELECT CONCAT(p.resource, ':', p.action)
            FROM users u
            JOIN role_permissions rp ON rp.role_id = u.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// Generate access and refresh tokens
    fn generate_tokens(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        role_id: Uuid,
        permissions: &[String],
    ) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let access_claims = Claims {
            sub: user_id.to_string(),
            company_id: company_id.to_string(),
            role_id: role_id.to_string(),
            permissions: permissions.to_vec(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            refresh_token: Self::new_refresh_token(),
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Opaque refresh token: 32 random bytes, URL-safe base64
    fn new_refresh_token() -> String {
        let mut bytes = [0u8; 32];
        bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
        bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Store refresh token digest in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let token_hash = self.hash_token(token)?;
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// HMAC-SHA256 digest of a refresh token, keyed by the JWT secret
    fn hash_token(&self, token: &str) -> AppResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.jwt_secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid HMAC key: {}", e)))?;
        mac.update(token.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> AuthService {
        AuthService {
            db: PgPool::connect_lazy("postgres://localhost/unused").unwrap(),
            jwt_secret: secret.to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 3600,
        }
    }

    #[tokio::test]
    async fn access_token_round_trips_claims() {
        let svc = service("test-secret-test-secret-test-secret");
        let (user, company, role) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let tokens = svc
            .generate_tokens(user, company, role, &["invoice:view".to_string()])
            .unwrap();

        let claims = decode_access_token(&tokens.access_token, &svc.jwt_secret).unwrap();
        assert_eq!(claims.sub, user.to_string());
        assert_eq!(claims.company_id, company.to_string());
        assert_eq!(claims.permissions, vec!["invoice:view"]);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(tokens.token_type, "Bearer");
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let svc = service("secret-one-secret-one-secret-one");
        let tokens = svc
            .generate_tokens(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), &[])
            .unwrap();

        assert!(matches!(
            decode_access_token(&tokens.access_token, "secret-two"),
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn refresh_digest_is_keyed_and_stable() {
        let a = service("key-a");
        let b = service("key-b");
        let token = AuthService::new_refresh_token();

        assert_eq!(a.hash_token(&token).unwrap(), a.hash_token(&token).unwrap());
        assert_ne!(a.hash_token(&token).unwrap(), b.hash_token(&token).unwrap());
        assert_ne!(a.hash_token(&token).unwrap(), token);
    }

    #[test]
    fn refresh_tokens_are_unique() {
        let first = AuthService::new_refresh_token();
        let second = AuthService::new_refresh_token();
        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
    }

    #[test]
    fn registration_input_is_validated() {
        let input = RegisterCompanyInput {
            company_name: "Acme Print".into(),
            company_code: "acme".into(),
            owner_name: "Sam".into(),
            email: "sam@acme.test".into(),
            password: "long-enough".into(),
            phone: None,
            address: None,
            currency: None,
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("company_code"));
    }
}
