use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{validate_jwt, AuthError};
use crate::database::models::{Role, User};
use crate::error::ApiError;

/// The caller, loaded fresh from the database for every protected request
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }

    /// 403 unless the caller holds one of `roles`
    pub fn authorize(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role()) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "User role [{}] is not authorized to access this route",
                self.role()
            )))
        }
    }

    /// 403 unless the caller owns the resource or is an admin
    pub fn ensure_owner(&self, owner_id: Uuid) -> Result<(), ApiError> {
        if self.id() == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not authorized to commit this action."))
        }
    }
}

/// Bearer-token middleware: validates the JWT, loads the user and injects `AuthUser`
pub async fn require_auth(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers)?;
    let claims = validate_jwt(token)?;

    let user = User::find_by_id(&state.pool, claims.user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MissingToken)?;

    match header.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MissingToken),
    }
}
