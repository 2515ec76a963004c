use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::app::AppState;
use crate::auth::hash_password;
use crate::database::models::{Bootcamp, NewUser, Role, User, UserChanges};
use crate::database::DatabaseError;
use crate::error::{parse_id, ApiError};
use crate::filter::{advanced_results, ListEnvelope, ListOptions, QueryParams};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

use super::{body, fetch_document};

const ADMIN: [Role; 1] = [Role::Admin];

/// GET /api/v1/users
pub async fn list(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListEnvelope>, ApiError> {
    auth.authorize(&ADMIN)?;
    let params = QueryParams::parse(query.as_deref().unwrap_or_default());
    let envelope = advanced_results(&state.users(), &params, None, &ListOptions::default()).await?;
    Ok(Json(envelope))
}

/// GET /api/v1/users/:id
pub async fn show(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    auth.authorize(&ADMIN)?;
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(fetch_document(&state.users(), id, None).await?))
}

/// POST /api/v1/users - admins may create other admins
pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<User> {
    auth.authorize(&ADMIN)?;
    let user = body(payload)?.validate(true)?;
    let hash = hash_password(&user.password).await?;
    let user = User::insert(&state.pool, &user, &hash).await?;

    info!("Admin {} created user {}", auth.id(), user.id);
    Ok(ApiResponse::created(user))
}

/// PUT /api/v1/users/:id
pub async fn update(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UserChanges>, JsonRejection>,
) -> ApiResult<User> {
    auth.authorize(&ADMIN)?;
    let id = parse_id(&id)?;
    let changes = body(payload)?.validate(true)?;
    let user = User::update(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| ApiError::resource_not_found("User", id))?;
    Ok(ApiResponse::success(user))
}

/// DELETE /api/v1/users/:id - takes the user's bootcamps, courses and reviews along
pub async fn delete(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    auth.authorize(&ADMIN)?;
    let id = parse_id(&id)?;

    let mut tx = state.pool.begin().await.map_err(DatabaseError::from)?;
    let touched = Bootcamp::ids_reviewed_or_taught_by(&mut *tx, id).await?;
    if !User::delete(&mut *tx, id).await? {
        return Err(ApiError::resource_not_found("User", id));
    }
    for bootcamp_id in touched {
        Bootcamp::refresh_average_cost(&mut *tx, bootcamp_id).await?;
        Bootcamp::refresh_average_rating(&mut *tx, bootcamp_id).await?;
    }
    tx.commit().await.map_err(DatabaseError::from)?;

    info!("Admin {} deleted user {}", auth.id(), id);
    Ok(ApiResponse::success(json!({})))
}
