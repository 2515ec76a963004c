use axum::{
    extract::{rejection::JsonRejection, Path},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::app::AppState;
use crate::auth::{generate_jwt, hash_password, hash_reset_token, verify_password, AuthError, ResetToken};
use crate::config::CONFIG;
use crate::database::models::user::{validate_login, validate_password};
use crate::database::models::{NewUser, User, UserChanges};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::Email;

use super::body;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

impl TokenResponse {
    fn for_user(user: &User) -> Result<Self, ApiError> {
        Ok(Self {
            token: generate_jwt(user.id)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

/// POST /api/v1/auth/register
pub async fn register(
    Extension(state): Extension<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let user = body(payload)?.validate(false)?;
    let hash = hash_password(&user.password).await?;
    let user = User::insert(&state.pool, &user, &hash).await?;

    info!("Registered user {} as {}", user.id, user.role);
    Ok(ApiResponse::created(TokenResponse::for_user(&user)?))
}

/// POST /api/v1/auth/login
pub async fn login(
    Extension(state): Extension<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let request = body(payload)?;
    validate_login(request.email.as_deref(), request.password.as_deref())?;

    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();

    let user = User::find_by_email(&state.pool, &email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(&password, &user.password).await? {
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(ApiResponse::success(TokenResponse::for_user(&user)?))
}

/// GET /api/v1/auth/logout - tokens are stateless, nothing to revoke
pub async fn logout() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({})))
}

/// GET /api/v1/auth/me
pub async fn me(Extension(auth): Extension<AuthUser>) -> ApiResult<User> {
    Ok(ApiResponse::success(auth.0))
}

/// PUT /api/v1/auth/updateinfo - name and email only
pub async fn update_info(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<UserChanges>, JsonRejection>,
) -> ApiResult<User> {
    let changes = body(payload)?.validate(false)?;
    let user = User::update(&state.pool, auth.id(), &changes)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("User", auth.id()))?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/v1/auth/updatepassword
pub async fn update_password(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let request = body(payload)?;
    validate_password(request.new_password.as_deref())?;

    let current = request.current_password.unwrap_or_default();
    if !verify_password(&current, &auth.0.password).await? {
        return Err(ApiError::unauthorized("Password is incorrect"));
    }

    let hash = hash_password(request.new_password.as_deref().unwrap_or_default()).await?;
    User::set_password(&state.pool, auth.id(), &hash).await?;
    Ok(ApiResponse::success(TokenResponse::for_user(&auth.0)?))
}

/// POST /api/v1/auth/forgotpassword
///
/// Stores the digest of a fresh reset token and mails the raw token as a link.
/// When the mail cannot be sent the token is cleared again.
pub async fn forgot_password(
    Extension(state): Extension<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let request = body(payload)?;
    let email = request.email.unwrap_or_default();

    let user = User::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("There is no user with that email"))?;

    let token = ResetToken::generate();
    User::set_reset_token(&state.pool, user.id, Some((&token.hashed, token.expires_at))).await?;

    let reset_url = format!("{}/api/v1/auth/resetpassword/{}", CONFIG.api.public_url, token.raw);
    let message = Email {
        to: user.email.clone(),
        subject: "Password reset token".to_string(),
        text: format!(
            "You are receiving this email because you (or someone else) has requested the reset of a password.\n\
             Please make a PUT request to:\n\n{}",
            reset_url
        ),
    };

    if let Err(e) = state.mailer.send(message).await {
        User::set_reset_token(&state.pool, user.id, None).await?;
        return Err(e.into());
    }

    Ok(ApiResponse::success(json!("Email sent")))
}

/// PUT /api/v1/auth/resetpassword/:resettoken
pub async fn reset_password(
    Extension(state): Extension<AppState>,
    Path(reset_token): Path<String>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let request = body(payload)?;
    validate_password(request.password.as_deref())?;

    let user = User::find_by_reset_token(&state.pool, &hash_reset_token(&reset_token), Utc::now())
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid token"))?;

    let hash = hash_password(request.password.as_deref().unwrap_or_default()).await?;
    User::set_password(&state.pool, user.id, &hash).await?;

    info!("Password reset for user {}", user.id);
    Ok(ApiResponse::success(TokenResponse::for_user(&user)?))
}
