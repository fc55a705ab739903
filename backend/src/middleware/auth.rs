//! Authentication middleware
//!
//! JWT authentication and permission checks for protected routes

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::{permission_key, Action, Resource};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::decode_access_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role_id: Uuid,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        let permission = permission_key(resource, action);
        self.permissions.iter().any(|p| *p == permission)
    }

    /// Fail with 403 unless the user holds `resource:action`
    pub fn require(&self, resource: Resource, action: Action) -> AppResult<()> {
        if self.has_permission(resource, action) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.user_id,
                "Permission denied: requires {}",
                permission_key(resource, action)
            );
            Err(AppError::InsufficientPermissions)
        }
    }
}

/// Authentication middleware that validates JWT tokens
///
/// Verifies the bearer token with the configured secret and inserts an
/// [`AuthUser`] into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("Missing or invalid Authorization header".into())
                .into_response();
        }
    };

    let auth_user = match authenticate(token, &state.config.jwt.secret) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

fn authenticate(token: &str, secret: &str) -> AppResult<AuthUser> {
    let claims = decode_access_token(token, secret)?;

    let parse = |value: &str| Uuid::parse_str(value).map_err(|_| AppError::InvalidToken);

    Ok(AuthUser {
        user_id: parse(&claims.sub)?,
        company_id: parse(&claims.company_id)?,
        role_id: parse(&claims.role_id)?,
        permissions: claims.permissions,
    })
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(permissions: &[&str]) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn permission_lookup_uses_resource_action_keys() {
        let u = user(&["invoice:view", "payment_verification:verify"]);
        assert!(u.has_permission(Resource::Invoice, Action::View));
        assert!(u.has_permission(Resource::PaymentVerification, Action::Verify));
        assert!(!u.has_permission(Resource::Invoice, Action::Delete));
    }

    #[test]
    fn require_maps_to_insufficient_permissions() {
        let u = user(&["product:view"]);
        assert!(u.require(Resource::Product, Action::View).is_ok());
        assert!(matches!(
            u.require(Resource::Product, Action::Edit),
            Err(AppError::InsufficientPermissions)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(authenticate("not-a-jwt", "secret").is_err());
    }
}
